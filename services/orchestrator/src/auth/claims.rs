//! Claim-name configuration and extraction of identity claims.
//!
//! # Purpose
//! Turns a verified JWT claim set into [`TokenClaims`], honoring the claim
//! names configured for non-standard identity providers.
//!
//! # Key invariants
//! - Only string-typed standard claims are copied; other types are ignored.
//! - Groups, roles and scope accept either an array of strings or a single
//!   whitespace-delimited string; both normalize to the same set.
//! - `scopes` is derived from `scope` only when it was not populated directly.
use koda_authz::TokenClaims;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Claim keys holding groups, roles and scope. Immutable after startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsConfig {
    pub groups_claim: String,
    pub roles_claim: String,
    pub scope_claim: String,
}

impl Default for ClaimsConfig {
    fn default() -> Self {
        Self {
            groups_claim: "groups".to_string(),
            roles_claim: "roles".to_string(),
            scope_claim: "scope".to_string(),
        }
    }
}

pub fn extract_claims(raw: &Value, config: &ClaimsConfig) -> TokenClaims {
    let mut claims = TokenClaims {
        subject: string_claim(raw, "sub").unwrap_or_default(),
        name: string_claim(raw, "name"),
        username: string_claim(raw, "preferred_username"),
        email: string_claim(raw, "email"),
        issuer: string_claim(raw, "iss"),
        audience: audience_claim(raw),
        expires_at: numeric_claim(raw, "exp"),
        issued_at: numeric_claim(raw, "iat"),
        not_before: numeric_claim(raw, "nbf"),
        ..TokenClaims::default()
    };

    if let Some(groups) = string_set_claim(raw, &config.groups_claim) {
        claims.groups = groups;
    }
    if let Some(roles) = string_set_claim(raw, &config.roles_claim) {
        claims.roles = roles;
    }
    match raw.get(&config.scope_claim) {
        Some(Value::String(scope)) => claims.scope = Some(scope.clone()),
        Some(Value::Array(_)) => {
            if let Some(scopes) = string_set_claim(raw, &config.scope_claim) {
                claims.scopes = scopes;
            }
        }
        _ => {}
    }

    if claims.scopes.is_empty()
        && let Some(scope) = &claims.scope
    {
        claims.scopes = split_whitespace(scope);
    }
    claims
}

pub fn string_claim(raw: &Value, name: &str) -> Option<String> {
    raw.get(name)
        .and_then(Value::as_str)
        .map(|value| value.to_string())
}

/// Normalize an array-of-strings or whitespace-delimited string claim.
pub fn string_set_claim(raw: &Value, name: &str) -> Option<BTreeSet<String>> {
    match raw.get(name)? {
        Value::Array(values) => Some(
            values
                .iter()
                .filter_map(|item| item.as_str().map(|value| value.to_string()))
                .collect(),
        ),
        Value::String(value) => Some(split_whitespace(value)),
        _ => None,
    }
}

fn split_whitespace(value: &str) -> BTreeSet<String> {
    value.split_whitespace().map(str::to_string).collect()
}

fn audience_claim(raw: &Value) -> Vec<String> {
    match raw.get("aud") {
        Some(Value::String(aud)) => vec![aud.clone()],
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|item| item.as_str().map(|value| value.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

fn numeric_claim(raw: &Value, name: &str) -> Option<i64> {
    let value = raw.get(name)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|secs| secs as i64))
}

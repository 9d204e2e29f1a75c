//! Verified identity payload and the per-request auth context.
//!
//! # Key invariants
//! - `TokenClaims` is built once by the token verifier and never mutated.
//! - An `AuthContext` carrying claims always has a non-empty subject; the
//!   constructor refuses anything else.
use crate::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub groups: BTreeSet<String>,
    pub roles: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub scopes: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    pub audience: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<i64>,
}

impl TokenClaims {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }
}

/// Identity attached to exactly one request.
///
/// Built by the orchestrator's auth context builder and read by the
/// authorization engine. Anonymous contexts never carry claims.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub role: Role,
    pub claims: Option<TokenClaims>,
    pub is_expired: bool,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Anonymous context for a caller whose credential was valid but expired.
    pub fn expired() -> Self {
        Self {
            role: Role::Anonymous,
            claims: None,
            is_expired: true,
        }
    }

    /// Authenticated user context; `None` when the subject is empty.
    pub fn user(claims: TokenClaims) -> Option<Self> {
        if claims.subject.is_empty() {
            return None;
        }
        Some(Self {
            role: Role::User,
            claims: Some(claims),
            is_expired: false,
        })
    }

    pub fn is_anonymous(&self) -> bool {
        self.claims.is_none()
    }

    pub fn subject(&self) -> Option<&str> {
        self.claims.as_ref().map(|claims| claims.subject.as_str())
    }
}

//! Per-request identity construction from the `Authorization` header.
//!
//! # Purpose
//! Turn whatever credential a caller presents into an [`AuthContext`]. This
//! boundary is total: malformed headers and failed verification degrade to an
//! anonymous context and the cause is only logged.
//!
//! # Key invariants
//! - Exactly `<scheme> <token>` separated by a single space; the scheme matches
//!   `Bearer` case-insensitively.
//! - An expired token yields [`AuthContext::expired`]; every other failure
//!   yields [`AuthContext::anonymous`].
//! - Header values and tokens are never logged.
use crate::auth::claims::ClaimsConfig;
use crate::auth::oidc::{TokenVerifier, VerifyError};
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use koda_authz::AuthContext;
use std::sync::Arc;

/// Identity provider settings the builder verifies against.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub client_id: String,
    pub issuer: String,
    pub claims: ClaimsConfig,
}

#[derive(Clone)]
pub struct AuthContextBuilder {
    verifier: Arc<TokenVerifier>,
    settings: Arc<AuthSettings>,
}

impl AuthContextBuilder {
    pub fn new(verifier: TokenVerifier, settings: AuthSettings) -> Self {
        Self {
            verifier: Arc::new(verifier),
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Build the identity context for one request. Never fails.
    pub async fn build(&self, authorization: &str) -> AuthContext {
        let context = self.resolve(authorization).await;
        metrics::counter!("koda_auth_contexts_total", "outcome" => outcome(&context)).increment(1);
        context
    }

    async fn resolve(&self, authorization: &str) -> AuthContext {
        if authorization.is_empty() {
            return AuthContext::anonymous();
        }
        let Some(token) = parse_bearer(authorization) else {
            tracing::warn!(
                client_id = %self.settings.client_id,
                "authorization header is not a bearer credential"
            );
            return AuthContext::anonymous();
        };

        let claims = match self
            .verifier
            .verify(token, &self.settings.issuer, &self.settings.claims)
            .await
        {
            Ok(claims) => claims,
            Err(VerifyError::TokenExpired) => {
                tracing::info!(client_id = %self.settings.client_id, "bearer token expired");
                return AuthContext::expired();
            }
            Err(err) => {
                tracing::warn!(
                    client_id = %self.settings.client_id,
                    error = %err,
                    "bearer token rejected"
                );
                return AuthContext::anonymous();
            }
        };

        match AuthContext::user(claims) {
            Some(context) => context,
            None => {
                tracing::warn!(client_id = %self.settings.client_id, "verified token has empty subject");
                AuthContext::anonymous()
            }
        }
    }
}

/// Split `<scheme> <token>` and return the token when the scheme is `Bearer`.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');
    let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    if !scheme.eq_ignore_ascii_case("Bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

fn outcome(context: &AuthContext) -> &'static str {
    if context.is_expired {
        "expired"
    } else if context.is_anonymous() {
        "anonymous"
    } else {
        "user"
    }
}

/// Read the `Authorization` header; absent or non-UTF-8 values read as empty.
pub fn authorization_header(headers: &HeaderMap) -> String {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return String::new();
    };
    match value.to_str() {
        Ok(value) => value.to_string(),
        Err(_) => {
            tracing::warn!("authorization header is not valid UTF-8");
            String::new()
        }
    }
}

/// Attach an [`AuthContext`] to the request extensions before routing on.
pub async fn attach_auth_context(
    State(builder): State<AuthContextBuilder>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = authorization_header(request.headers());
    let context = builder.build(&header).await;
    request.extensions_mut().insert(context);
    next.run(request).await
}

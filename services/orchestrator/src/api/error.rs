//! API error envelope and helpers.
//!
//! # Purpose and responsibility
//! Renders rejected requests as a GraphQL-style error envelope with a stable
//! `extensions.code` and a generic message.
//!
//! # Key invariants and assumptions
//! - `status` matches the semantics of the code: 401 for missing or expired
//!   credentials, 403 for denied fields, 500 for execution failures.
//! - Messages never name the denied field or the caller's role.
use crate::api::types::{ErrorEntry, ErrorExtensions, ErrorResponse};
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use koda_authz::{ErrorCode, Rejection};

/// Structured API error returned by handlers.
///
/// # Example
/// ```rust
/// use axum::http::StatusCode;
/// use koda_authz::Decision;
/// use orchestrator::api::error::api_rejection;
///
/// let rejection = Decision::Forbidden.rejection().expect("rejected");
/// let err = api_rejection(rejection);
/// assert_eq!(err.status, StatusCode::FORBIDDEN);
/// ```
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            data: None,
            errors: vec![ErrorEntry {
                message: message.to_string(),
                extensions: ErrorExtensions {
                    code: code.to_string(),
                },
            }],
        },
    }
}

/// Translate an authorization rejection into its boundary-facing error.
pub fn api_rejection(rejection: Rejection) -> ApiError {
    let status = match rejection.code {
        ErrorCode::Unauthorized | ErrorCode::TokenExpired => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
    };
    api_error(status, rejection.code.as_str(), rejection.message)
}

/// Build a 500 error; details stay in the server log.
pub fn api_internal(message: &str, err: &anyhow::Error) -> ApiError {
    tracing::error!(error = ?err, "query execution failed");
    api_internal_message(message)
}

pub fn api_internal_message(message: &str) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR", message)
}

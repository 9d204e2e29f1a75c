//! Authorization outcomes and their boundary-facing translation.
//!
//! Rejection messages are deliberately generic; which field or role caused a
//! denial is logged server-side only.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Allow,
    Unauthenticated,
    Forbidden,
    Expired,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Unauthenticated => "unauthenticated",
            Decision::Forbidden => "forbidden",
            Decision::Expired => "expired",
        }
    }

    /// Boundary error for a rejected request; `None` hands off to execution.
    pub fn rejection(self) -> Option<Rejection> {
        match self {
            Decision::Allow => None,
            Decision::Unauthenticated => Some(Rejection {
                code: ErrorCode::Unauthorized,
                message: "Unauthorized",
            }),
            Decision::Forbidden => Some(Rejection {
                code: ErrorCode::Forbidden,
                message: "Forbidden",
            }),
            Decision::Expired => Some(Rejection {
                code: ErrorCode::TokenExpired,
                message: "Token Expired",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    TokenExpired,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub code: ErrorCode,
    pub message: &'static str,
}

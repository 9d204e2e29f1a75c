use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    #[error("invalid role specified: {0}")]
    InvalidRole(String),
}

pub type AuthzResult<T> = Result<T, AuthzError>;

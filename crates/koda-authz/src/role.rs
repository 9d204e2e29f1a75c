//! Ranked trust levels for callers and field requirements.
//!
//! # Key invariants
//! - Ranks are dense and start at zero; new roles are appended with a higher
//!   rank so the comparison contract stays `held >= required`.
//! - Wire names are matched case-sensitively.
use crate::{AuthzError, AuthzResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Role {
    #[default]
    Anonymous = 0,
    User = 1,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Anonymous, Role::User];

    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Returns true when a caller holding `self` satisfies `required`.
    pub fn is_authorized(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Anonymous => "ANONYMOUS",
            Role::User => "USER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AuthzError;

    fn from_str(value: &str) -> AuthzResult<Self> {
        match value {
            "ANONYMOUS" => Ok(Role::Anonymous),
            "USER" => Ok(Role::User),
            other => Err(AuthzError::InvalidRole(other.to_string())),
        }
    }
}

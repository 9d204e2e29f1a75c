//! Koda authn/authz primitives shared by the gateway services.
//!
//! # Purpose
//! Centralizes the role model, the per-request identity context, and the
//! field-level authorization engine that runs over a parsed query before any
//! resolver executes.
//!
//! # How it fits
//! The orchestrator verifies bearer tokens and builds an [`AuthContext`] per
//! request; the query endpoint then calls [`authorize`] with that context and
//! the requested [`QueryField`] tree, and translates any rejection with
//! [`Decision::rejection`].
//!
//! # Key invariants
//! - [`Role`] is a total order; a caller satisfies a requirement iff its rank
//!   is greater than or equal to the required rank.
//! - [`AuthContext::role`] is never absent; anonymous is the fallback.
//! - Every non-public field must be reachable from an annotated ancestor;
//!   there is no implicit public default.
//!
//! # Examples
//! ```rust
//! use koda_authz::{AuthContext, Decision, QueryField, authorize};
//!
//! let tree = vec![QueryField::new("widgets").requires(["USER"]).child(QueryField::new("id"))];
//! assert_eq!(authorize(Some(&AuthContext::anonymous()), &tree), Decision::Forbidden);
//! ```
//!
//! # Common pitfalls
//! - Passing `None` as the context means "no identity layer ran", which is
//!   `Unauthenticated`, not anonymous.

mod claims;
mod decision;
mod engine;
mod errors;
mod field;
mod role;

pub use claims::{AuthContext, TokenClaims};
pub use decision::{Decision, ErrorCode, Rejection};
pub use engine::{PUBLIC_FIELDS, authorize, evaluate_selection, is_public_field};
pub use errors::{AuthzError, AuthzResult};
pub use field::QueryField;
pub use role::Role;

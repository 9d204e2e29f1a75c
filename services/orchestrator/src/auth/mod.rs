//! Caller identity for the orchestrator.
//!
//! # Purpose
//! Groups key discovery, bearer token verification, claim extraction and the
//! per-request auth context middleware.
pub mod claims;
pub mod context;
pub mod jwks;
pub mod keys;
pub mod oidc;

#[cfg(test)]
pub(crate) mod test_support;

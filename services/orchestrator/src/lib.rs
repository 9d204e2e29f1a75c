//! Orchestrator service library crate.
//!
//! # Purpose
//! Exposes the query gateway: caller identity from OIDC bearer tokens,
//! field-level authorization of parsed queries, configuration and
//! observability wiring, for use by the binary and tests.
//!
//! # Notes
//! Authorization rules live in `koda-authz`; this crate owns everything that
//! touches the network.
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod executor;
pub mod observability;

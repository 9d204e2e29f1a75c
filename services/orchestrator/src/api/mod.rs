//! Orchestrator HTTP API module.
//!
//! # Purpose
//! Exposes the query endpoint, health check and the shared error envelope.
pub mod error;
pub mod query;
pub mod system;
pub mod types;

//! Execution hand-off after authorization.
//!
//! # Purpose
//! Defines the seam between the authorization pipeline and whatever resolves
//! field values. Executors only ever see requests that were already allowed.
use crate::api::types::QueryRequest;
use async_trait::async_trait;
use koda_authz::AuthContext;
use serde_json::{Map, Value};

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Resolve an authorized request into its `data` payload.
    async fn execute(&self, ctx: &AuthContext, request: &QueryRequest) -> anyhow::Result<Value>;
}

/// Executor with no resolvers attached; every root field resolves to `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullExecutor;

#[async_trait]
impl QueryExecutor for NullExecutor {
    async fn execute(&self, _ctx: &AuthContext, request: &QueryRequest) -> anyhow::Result<Value> {
        let data: Map<String, Value> = request
            .selection
            .iter()
            .map(|field| (field.name.clone(), Value::Null))
            .collect();
        Ok(Value::Object(data))
    }
}

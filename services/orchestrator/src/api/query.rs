//! Query endpoint handler.
//!
//! # Purpose
//! Runs the two-phase pipeline for a parsed query: the whole selection tree is
//! authorized first, and only an allowed request reaches the executor.
//!
//! # Security considerations
//! - Requests routed without the auth middleware carry no context and are
//!   rejected as unauthenticated.
//! - Rejections use generic messages; the denied field is only logged.
use crate::api::error::{ApiError, api_internal, api_rejection};
use crate::api::types::{QueryRequest, QueryResponse};
use crate::app::AppState;
use axum::extract::State;
use axum::{Extension, Json};
use koda_authz::{AuthContext, authorize};

pub async fn execute_query(
    State(state): State<AppState>,
    context: Option<Extension<AuthContext>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let context = context.map(|Extension(context)| context);

    let decision = authorize(context.as_ref(), &request.selection);
    metrics::counter!("koda_authz_decisions_total", "decision" => decision.as_str()).increment(1);
    if let Some(rejection) = decision.rejection() {
        return Err(api_rejection(rejection));
    }

    let context = context.unwrap_or_default();
    let data = state
        .executor
        .execute(&context, &request)
        .await
        .map_err(|err| api_internal("query execution failed", &err))?;
    tracing::debug!(
        operation = request.operation_name.as_deref().unwrap_or("anonymous"),
        role = %context.role,
        "query executed"
    );
    Ok(Json(QueryResponse { data }))
}

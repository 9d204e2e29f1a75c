//! Health check handler.
use crate::api::types::HealthStatus;
use axum::Json;

/// Liveness check; needs no credentials and performs no I/O.
pub(crate) async fn healthz() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
    })
}

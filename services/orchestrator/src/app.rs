//! Orchestrator HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! Only `/graphql` sits behind the auth context middleware; the health check
//! is routed outside it.
use crate::api;
use crate::auth::context::{AuthContextBuilder, attach_auth_context};
use crate::executor::QueryExecutor;
use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<dyn QueryExecutor>,
    pub auth: AuthContextBuilder,
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/graphql", axum::routing::post(api::query::execute_query))
        .route_layer(axum::middleware::from_fn_with_state(
            state.auth.clone(),
            attach_auth_context,
        ));

    Router::new()
        .route("/healthz", axum::routing::get(api::system::healthz))
        .merge(protected)
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version()
                )
            },
        ))
        .with_state(state)
}

/// CORS policy for browser clients; credentials are allowed, so origins are
/// matched exactly and `*` mirrors the request origin.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_origin = if allowed_origins.iter().any(|origin| origin == "*") {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}

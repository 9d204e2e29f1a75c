//! Koda orchestrator HTTP service entry point.
//!
//! # Purpose
//! Wires configuration, key resolution, token verification and the query
//! router, then serves the API and the metrics endpoint until shutdown.
//!
//! # Notes
//! The `build_state` helper keeps wiring testable and minimizes main setup logic.
use anyhow::Context;
use orchestrator::app::{AppState, build_router, cors_layer};
use orchestrator::auth::context::{AuthContextBuilder, AuthSettings};
use orchestrator::auth::keys::{CachedKeyResolver, HttpKeyResolver, KeyResolver, OidcDiscovery};
use orchestrator::auth::oidc::{TokenVerifier, VerifierOptions};
use orchestrator::config::OrchestratorConfig;
use orchestrator::executor::NullExecutor;
use orchestrator::observability;
use std::future::Future;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = OrchestratorConfig::from_env_or_yaml().context("orchestrator config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    })
    .await
}

async fn run_with_shutdown<F>(config: OrchestratorConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("koda-orchestrator")?;
    let state = build_state(&config)?;
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state).layer(cors_layer(&config.allowed_origins));

    let addr = config.bind_addr;
    tracing::info!(%addr, issuer = %config.oidc.issuer, "orchestrator listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

fn build_state(config: &OrchestratorConfig) -> anyhow::Result<AppState> {
    let oidc = &config.oidc;
    let discovery = OidcDiscovery::new(oidc.http_timeout).context("build oidc http client")?;
    let resolver: Arc<dyn KeyResolver> = if oidc.cache_ttl.is_zero() {
        Arc::new(HttpKeyResolver::new(discovery))
    } else {
        Arc::new(CachedKeyResolver::new(
            discovery,
            oidc.cache_ttl,
            oidc.cache_ttl,
        ))
    };
    let verifier = TokenVerifier::new(
        resolver,
        VerifierOptions {
            clock_skew_seconds: oidc.clock_skew_secs,
            audiences: oidc
                .verify_audience
                .then(|| vec![oidc.client_id.clone()]),
        },
    );
    let auth = AuthContextBuilder::new(
        verifier,
        AuthSettings {
            client_id: oidc.client_id.clone(),
            issuer: oidc.issuer.clone(),
            claims: oidc.claims.clone(),
        },
    );

    Ok(AppState {
        executor: Arc::new(NullExecutor),
        auth,
    })
}

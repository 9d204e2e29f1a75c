use crate::auth::claims::ClaimsConfig;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_CLOCK_SKEW_SECS: u64 = 60;

// Orchestrator configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub allowed_origins: Vec<String>,
    pub oidc: OidcConfig,
}

#[derive(Debug, Clone)]
pub struct OidcConfig {
    pub issuer: String,
    pub client_id: String,
    pub claims: ClaimsConfig,
    pub http_timeout: Duration,
    /// Zero disables discovery and key set caching.
    pub cache_ttl: Duration,
    pub clock_skew_secs: u64,
    pub verify_audience: bool,
}

#[derive(Debug, Deserialize)]
struct OrchestratorConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    allowed_origins: Option<Vec<String>>,
    oidc_issuer: Option<String>,
    oidc_client_id: Option<String>,
    groups_claim: Option<String>,
    roles_claim: Option<String>,
    scope_claim: Option<String>,
    http_timeout_secs: Option<u64>,
    cache_ttl_secs: Option<u64>,
    clock_skew_secs: Option<u64>,
    verify_audience: Option<bool>,
}

impl OrchestratorConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self::read_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::read_env()?;
        if let Ok(path) = std::env::var("KODA_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read KODA_CONFIG: {path}"))?;
            let override_cfg: OrchestratorConfigOverride = serde_yaml::from_str(&contents)
                .with_context(|| "parse orchestrator config yaml")?;
            config.apply(override_cfg)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn read_env() -> Result<Self> {
        let bind_addr = std::env::var("KODA_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse KODA_BIND")?;
        let metrics_bind = std::env::var("KODA_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:9090".to_string())
            .parse()
            .with_context(|| "parse KODA_METRICS_BIND")?;
        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map(|value| split_origins(&value))
            .unwrap_or_else(|_| vec!["http://localhost:5173".to_string()]);

        let defaults = ClaimsConfig::default();
        let claims = ClaimsConfig {
            groups_claim: non_empty_env("OIDC_GROUPS_CLAIM").unwrap_or(defaults.groups_claim),
            roles_claim: non_empty_env("OIDC_ROLES_CLAIM").unwrap_or(defaults.roles_claim),
            scope_claim: non_empty_env("OIDC_SCOPE_CLAIM").unwrap_or(defaults.scope_claim),
        };
        let http_timeout_secs = std::env::var("OIDC_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        let cache_ttl_secs = std::env::var("OIDC_CACHE_TTL_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);
        let clock_skew_secs = std::env::var("OIDC_CLOCK_SKEW_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_CLOCK_SKEW_SECS);
        let verify_audience = std::env::var("OIDC_VERIFY_AUDIENCE")
            .ok()
            .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            bind_addr,
            metrics_bind,
            allowed_origins,
            oidc: OidcConfig {
                issuer: std::env::var("OIDC_ISSUER").unwrap_or_default(),
                client_id: std::env::var("OIDC_CLIENT_ID").unwrap_or_default(),
                claims,
                http_timeout: Duration::from_secs(http_timeout_secs),
                cache_ttl: Duration::from_secs(cache_ttl_secs),
                clock_skew_secs,
                verify_audience,
            },
        })
    }

    fn apply(&mut self, override_cfg: OrchestratorConfigOverride) -> Result<()> {
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.allowed_origins {
            self.allowed_origins = value;
        }
        if let Some(value) = override_cfg.oidc_issuer {
            self.oidc.issuer = value;
        }
        if let Some(value) = override_cfg.oidc_client_id {
            self.oidc.client_id = value;
        }
        if let Some(value) = override_cfg.groups_claim {
            self.oidc.claims.groups_claim = value;
        }
        if let Some(value) = override_cfg.roles_claim {
            self.oidc.claims.roles_claim = value;
        }
        if let Some(value) = override_cfg.scope_claim {
            self.oidc.claims.scope_claim = value;
        }
        if let Some(value) = override_cfg.http_timeout_secs
            && value > 0
        {
            self.oidc.http_timeout = Duration::from_secs(value);
        }
        if let Some(value) = override_cfg.cache_ttl_secs {
            self.oidc.cache_ttl = Duration::from_secs(value);
        }
        if let Some(value) = override_cfg.clock_skew_secs {
            self.oidc.clock_skew_secs = value;
        }
        if let Some(value) = override_cfg.verify_audience {
            self.oidc.verify_audience = value;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.oidc.issuer.trim().is_empty() {
            bail!("OIDC_ISSUER is required");
        }
        if self.oidc.client_id.trim().is_empty() {
            bail!("OIDC_CLIENT_ID is required");
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn split_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

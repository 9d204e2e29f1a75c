//! Issuer key material resolution: discovery, key-set fetch, key lookup.
//!
//! # Purpose
//! Turn an issuer URL and a token `kid` into a verification key by walking the
//! issuer's OIDC discovery document to its published key set.
//!
//! # Architectural role
//! [`KeyResolver`] is the seam the token verifier depends on. Two resolvers
//! ship here:
//! - [`HttpKeyResolver`] fetches discovery and the key set on every call.
//! - [`CachedKeyResolver`] keeps both documents per issuer with a TTL and fills
//!   each cache entry at most once per miss.
//!
//! # Key invariants
//! - The discovery URL is `<issuer>/.well-known/openid-configuration` with any
//!   trailing slash on the issuer removed.
//! - Every fetch is bounded by the HTTP client's timeout.
//! - Failures are not retried within a call; callers fail fast.
//!
//! # Concurrency model
//! Caches live in `DashMap`s. Fills are serialized per cache key with an async
//! mutex; waiters re-check the cache after acquiring it, so an expiry under
//! load triggers one upstream fetch, not one per request.
use crate::auth::jwks::KeySet;
use async_trait::async_trait;
use dashmap::DashMap;
use jsonwebtoken::DecodingKey;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("discovery document unavailable: {0}")]
    DiscoveryUnavailable(String),
    #[error("discovery document has no jwks_uri")]
    DiscoveryMalformed,
    #[error("key set unavailable: {0}")]
    KeySetUnavailable(String),
    #[error("no key found for kid {0}")]
    KeyNotFound(String),
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),
    #[error("invalid key material: {0}")]
    KeyMaterialInvalid(String),
}

/// Resolves the verification key an issuer published under `kid`.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    async fn resolve(&self, issuer: &str, kid: &str) -> Result<DecodingKey, KeyError>;
}

pub fn discovery_url(issuer: &str) -> String {
    format!(
        "{}/.well-known/openid-configuration",
        issuer.trim_end_matches('/')
    )
}

/// HTTP access to an issuer's discovery document and key set.
#[derive(Debug, Clone)]
pub struct OidcDiscovery {
    client: reqwest::Client,
}

impl OidcDiscovery {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub async fn jwks_uri(&self, issuer: &str) -> Result<String, KeyError> {
        let url = discovery_url(issuer);
        let document: Value = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| KeyError::DiscoveryUnavailable(err.to_string()))?
            .json()
            .await
            .map_err(|err| KeyError::DiscoveryUnavailable(err.to_string()))?;
        document
            .get("jwks_uri")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(KeyError::DiscoveryMalformed)
    }

    pub async fn key_set(&self, jwks_uri: &str) -> Result<KeySet, KeyError> {
        self.client
            .get(jwks_uri)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| KeyError::KeySetUnavailable(err.to_string()))?
            .json()
            .await
            .map_err(|err| KeyError::KeySetUnavailable(err.to_string()))
    }
}

/// Uncached resolver: two sequential fetches per verification.
#[derive(Debug, Clone)]
pub struct HttpKeyResolver {
    discovery: OidcDiscovery,
}

impl HttpKeyResolver {
    pub fn new(discovery: OidcDiscovery) -> Self {
        Self { discovery }
    }
}

#[async_trait]
impl KeyResolver for HttpKeyResolver {
    async fn resolve(&self, issuer: &str, kid: &str) -> Result<DecodingKey, KeyError> {
        let jwks_uri = self.discovery.jwks_uri(issuer).await?;
        let key_set = self.discovery.key_set(&jwks_uri).await?;
        key_set.select(kid)?.decoding_key()
    }
}

#[derive(Debug, Clone)]
struct CachedDiscovery {
    jwks_uri: String,
    fetched_at: Instant,
}

#[derive(Debug, Clone)]
struct CachedKeySet {
    key_set: KeySet,
    fetched_at: Instant,
}

/// TTL-cached resolver with single-flight fills per issuer and key-set URI.
#[derive(Debug, Clone)]
pub struct CachedKeyResolver {
    discovery: OidcDiscovery,
    discovery_cache: Arc<DashMap<String, CachedDiscovery>>,
    key_set_cache: Arc<DashMap<String, CachedKeySet>>,
    fill_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    discovery_ttl: Duration,
    key_set_ttl: Duration,
}

impl CachedKeyResolver {
    pub fn new(discovery: OidcDiscovery, discovery_ttl: Duration, key_set_ttl: Duration) -> Self {
        Self {
            discovery,
            discovery_cache: Arc::new(DashMap::new()),
            key_set_cache: Arc::new(DashMap::new()),
            fill_locks: Arc::new(DashMap::new()),
            discovery_ttl,
            key_set_ttl,
        }
    }

    async fn jwks_uri(&self, issuer: &str) -> Result<String, KeyError> {
        if let Some(uri) = self.cached_jwks_uri(issuer) {
            return Ok(uri);
        }
        let lock = self.fill_lock(format!("discovery:{issuer}"));
        let _guard = lock.lock().await;
        if let Some(uri) = self.cached_jwks_uri(issuer) {
            return Ok(uri);
        }

        let jwks_uri = self.discovery.jwks_uri(issuer).await?;
        self.discovery_cache.insert(
            issuer.to_string(),
            CachedDiscovery {
                jwks_uri: jwks_uri.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(jwks_uri)
    }

    /// Fetch the key set, or reuse a fresh entry. With `force`, only an entry
    /// filled after this call started counts as fresh.
    async fn key_set(&self, jwks_uri: &str, force: bool) -> Result<KeySet, KeyError> {
        let requested_at = Instant::now();
        if !force && let Some(key_set) = self.cached_key_set(jwks_uri, None) {
            return Ok(key_set);
        }
        let lock = self.fill_lock(format!("jwks:{jwks_uri}"));
        let _guard = lock.lock().await;
        let newer_than = force.then_some(requested_at);
        if let Some(key_set) = self.cached_key_set(jwks_uri, newer_than) {
            return Ok(key_set);
        }

        tracing::debug!(jwks_uri, "fetching issuer key set");
        let key_set = self.discovery.key_set(jwks_uri).await?;
        self.key_set_cache.insert(
            jwks_uri.to_string(),
            CachedKeySet {
                key_set: key_set.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(key_set)
    }

    fn cached_jwks_uri(&self, issuer: &str) -> Option<String> {
        let entry = self.discovery_cache.get(issuer)?;
        (entry.fetched_at.elapsed() < self.discovery_ttl).then(|| entry.jwks_uri.clone())
    }

    fn cached_key_set(&self, jwks_uri: &str, newer_than: Option<Instant>) -> Option<KeySet> {
        let entry = self.key_set_cache.get(jwks_uri)?;
        if entry.fetched_at.elapsed() >= self.key_set_ttl {
            return None;
        }
        if let Some(threshold) = newer_than
            && entry.fetched_at < threshold
        {
            return None;
        }
        Some(entry.key_set.clone())
    }

    fn fill_lock(&self, key: String) -> Arc<Mutex<()>> {
        self.fill_locks.entry(key).or_default().value().clone()
    }
}

#[async_trait]
impl KeyResolver for CachedKeyResolver {
    async fn resolve(&self, issuer: &str, kid: &str) -> Result<DecodingKey, KeyError> {
        let jwks_uri = self.jwks_uri(issuer).await?;
        let key_set = self.key_set(&jwks_uri, false).await?;
        match key_set.select(kid) {
            Ok(jwk) => jwk.decoding_key(),
            Err(KeyError::KeyNotFound(_)) => {
                // The issuer may have rotated keys since the set was cached.
                let refreshed = self.key_set(&jwks_uri, true).await?;
                refreshed.select(kid)?.decoding_key()
            }
            Err(err) => Err(err),
        }
    }
}

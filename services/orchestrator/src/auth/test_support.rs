//! Shared RSA and issuer fixtures for unit tests.
use axum::routing::get;
use axum::{Json, Router};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, RwLock};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct TestKey {
    pub public: RsaPublicKey,
    pub pem: String,
}

pub fn test_key() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("key");
        let pem = private.to_pkcs1_pem(Default::default()).expect("pem");
        TestKey {
            public: RsaPublicKey::from(&private),
            pem: pem.as_str().to_string(),
        }
    })
}

pub fn mint_token(alg: Algorithm, kid: Option<&str>, claims: &Value) -> String {
    let mut header = Header::new(alg);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(test_key().pem.as_bytes()).expect("encoding key");
    jsonwebtoken::encode(&header, claims, &key).expect("token")
}

/// Local issuer serving a discovery document and key set with hit counters.
pub struct OidcServer {
    pub issuer: String,
    pub discovery_hits: Arc<AtomicUsize>,
    pub jwks_hits: Arc<AtomicUsize>,
    discovery: Arc<RwLock<Option<Value>>>,
    key_set: Arc<RwLock<Value>>,
    _handle: JoinHandle<()>,
}

impl OidcServer {
    pub fn set_key_set(&self, key_set: Value) {
        *self.key_set.write().expect("lock") = key_set;
    }

    pub fn set_discovery(&self, document: Value) {
        *self.discovery.write().expect("lock") = Some(document);
    }

    pub fn restore_discovery(&self) {
        *self.discovery.write().expect("lock") = None;
    }
}

pub async fn spawn_oidc_server(key_set: Value) -> OidcServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let issuer = format!("http://{addr}");
    let default_discovery = json!({"issuer": issuer, "jwks_uri": format!("{issuer}/jwks")});

    let discovery_hits = Arc::new(AtomicUsize::new(0));
    let jwks_hits = Arc::new(AtomicUsize::new(0));
    let discovery = Arc::new(RwLock::new(None::<Value>));
    let key_set = Arc::new(RwLock::new(key_set));

    let app = Router::new()
        .route(
            "/.well-known/openid-configuration",
            get({
                let hits = discovery_hits.clone();
                let discovery = discovery.clone();
                move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let body = discovery
                        .read()
                        .expect("lock")
                        .clone()
                        .unwrap_or_else(|| default_discovery.clone());
                    async move { Json(body) }
                }
            }),
        )
        .route(
            "/jwks",
            get({
                let hits = jwks_hits.clone();
                let key_set = key_set.clone();
                move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let body = key_set.read().expect("lock").clone();
                    async move { Json(body) }
                }
            }),
        );
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });

    OidcServer {
        issuer,
        discovery_hits,
        jwks_hits,
        discovery,
        key_set,
        _handle: handle,
    }
}

#![allow(dead_code)]

use axum::routing::get;
use axum::{Json, Router};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use orchestrator::app::AppState;
use orchestrator::auth::claims::ClaimsConfig;
use orchestrator::auth::context::{AuthContextBuilder, AuthSettings};
use orchestrator::auth::jwks::{Jwk, KeySet};
use orchestrator::auth::keys::{CachedKeyResolver, OidcDiscovery};
use orchestrator::auth::oidc::{TokenVerifier, VerifierOptions};
use orchestrator::executor::NullExecutor;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{Value, json};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

pub const KID: &str = "kid-1";
pub const CLIENT_ID: &str = "koda";

struct SigningKey {
    public: RsaPublicKey,
    pem: String,
}

fn signing_key() -> &'static SigningKey {
    static KEY: OnceLock<SigningKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("key");
        let pem = private.to_pkcs1_pem(Default::default()).expect("pem");
        SigningKey {
            public: RsaPublicKey::from(&private),
            pem: pem.as_str().to_string(),
        }
    })
}

pub fn key_set(kid: &str) -> Value {
    serde_json::to_value(KeySet {
        keys: vec![Jwk::from_rsa(kid, &signing_key().public)],
    })
    .expect("key set")
}

pub fn mint(alg: Algorithm, kid: Option<&str>, claims: &Value) -> String {
    let mut header = Header::new(alg);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(signing_key().pem.as_bytes()).expect("encoding key");
    jsonwebtoken::encode(&header, claims, &key).expect("token")
}

pub fn user_claims(issuer: &str, subject: &str) -> Value {
    let now = chrono::Utc::now().timestamp();
    json!({
        "iss": issuer,
        "aud": CLIENT_ID,
        "sub": subject,
        "preferred_username": "jdoe",
        "groups": "engineering ops",
        "iat": now,
        "exp": now + 300
    })
}

/// Serve discovery and key set documents on an ephemeral local port.
pub async fn spawn_issuer(key_set: Value) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let issuer = format!("http://{}", listener.local_addr().expect("addr"));
    let discovery = json!({"issuer": issuer, "jwks_uri": format!("{issuer}/jwks")});
    let app = Router::new()
        .route(
            "/.well-known/openid-configuration",
            get(move || async move { Json(discovery) }),
        )
        .route("/jwks", get(move || async move { Json(key_set) }));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });
    issuer
}

pub fn auth_builder(issuer: &str) -> AuthContextBuilder {
    let discovery = OidcDiscovery::new(Duration::from_secs(2)).expect("client");
    let resolver = CachedKeyResolver::new(
        discovery,
        Duration::from_secs(300),
        Duration::from_secs(300),
    );
    AuthContextBuilder::new(
        TokenVerifier::new(Arc::new(resolver), VerifierOptions::default()),
        AuthSettings {
            client_id: CLIENT_ID.to_string(),
            issuer: issuer.to_string(),
            claims: ClaimsConfig::default(),
        },
    )
}

pub fn app_state(issuer: &str) -> AppState {
    AppState {
        executor: Arc::new(NullExecutor),
        auth: auth_builder(issuer),
    }
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

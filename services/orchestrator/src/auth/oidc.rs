//! OIDC bearer token verification against issuer-published RSA keys.
//!
//! # Purpose
//! Validate inbound access tokens and extract the caller's identity claims
//! using the configured claim-name mapping.
//!
//! # Architectural role
//! Sits between the auth context builder and the [`KeyResolver`]: the builder
//! hands over the raw bearer string, this module decides whether it can be
//! trusted and returns [`TokenClaims`].
//!
//! # Key invariants
//! - Only RSA-family signature schemes (RS256/384/512, PS256/384/512) are
//!   accepted; anything else is rejected before any key lookup.
//! - The header must carry a `kid`.
//! - `exp` is required; `nbf` is honored when present; `iat` may not lie in the
//!   future beyond the configured clock skew.
//! - Claims are read only after signature verification succeeds.
//!
//! # Security model and threat assumptions
//! - Attackers may craft tokens with arbitrary headers; the algorithm allowlist
//!   blocks `none`/HMAC confusion.
//! - An empty subject is not an error here; the builder rejects it.
//!
//! # How to use
//! Construct a [`TokenVerifier`] with a resolver and call
//! [`TokenVerifier::verify`] with the token, issuer and [`ClaimsConfig`].
use crate::auth::claims::{ClaimsConfig, extract_claims};
use crate::auth::keys::{KeyError, KeyResolver};
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use koda_authz::TokenClaims;
use serde_json::Value;
use std::sync::Arc;

/// Errors returned while verifying a bearer token.
///
/// # Security
/// - Variants never carry token contents; they are logged server-side only.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("malformed token: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),
    #[error("unsupported algorithm: {0:?}")]
    UnsupportedAlgorithm(Algorithm),
    #[error("missing key id")]
    MissingKeyId,
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("signature invalid")]
    SignatureInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("token not yet valid")]
    TokenNotYetValid,
    #[error("invalid claim: {0}")]
    InvalidClaim(String),
}

impl VerifyError {
    fn from_jwt(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => VerifyError::TokenExpired,
            ErrorKind::ImmatureSignature => VerifyError::TokenNotYetValid,
            ErrorKind::InvalidSignature => VerifyError::SignatureInvalid,
            ErrorKind::MissingRequiredClaim(claim) => VerifyError::InvalidClaim(claim.clone()),
            ErrorKind::InvalidAudience => VerifyError::InvalidClaim("aud".to_string()),
            _ => VerifyError::Malformed(err),
        }
    }
}

/// Optional checks layered on top of signature and expiry verification.
#[derive(Debug, Clone)]
pub struct VerifierOptions {
    pub clock_skew_seconds: u64,
    /// When set, `aud` must contain one of these values.
    pub audiences: Option<Vec<String>>,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self {
            clock_skew_seconds: 60,
            audiences: None,
        }
    }
}

/// Verifier for issuer-signed bearer tokens.
///
/// # Overview
/// Holds the key resolver and verification options; stateless per call, so a
/// single instance is shared by every request.
///
/// # Examples
/// ```rust
/// use orchestrator::auth::keys::{HttpKeyResolver, OidcDiscovery};
/// use orchestrator::auth::oidc::{TokenVerifier, VerifierOptions};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let discovery = OidcDiscovery::new(Duration::from_secs(5)).expect("client");
/// let verifier = TokenVerifier::new(Arc::new(HttpKeyResolver::new(discovery)), VerifierOptions::default());
/// ```
#[derive(Clone)]
pub struct TokenVerifier {
    resolver: Arc<dyn KeyResolver>,
    options: VerifierOptions,
}

impl TokenVerifier {
    pub fn new(resolver: Arc<dyn KeyResolver>, options: VerifierOptions) -> Self {
        Self { resolver, options }
    }

    /// Verify `token` against keys published by `issuer`.
    ///
    /// # Errors
    /// - `VerifyError::Malformed` if the token cannot be parsed.
    /// - `VerifyError::UnsupportedAlgorithm` for non-RSA algorithms.
    /// - `VerifyError::MissingKeyId` if the header lacks a `kid`.
    /// - `VerifyError::Key` for discovery/key-set/key-lookup failures.
    /// - `VerifyError::SignatureInvalid`, `TokenExpired`, `TokenNotYetValid`,
    ///   or `InvalidClaim` for verification failures.
    pub async fn verify(
        &self,
        token: &str,
        issuer: &str,
        claims_config: &ClaimsConfig,
    ) -> Result<TokenClaims, VerifyError> {
        // Step 1: Inspect the header only; nothing in it is trusted yet.
        let header = decode_header(token).map_err(VerifyError::Malformed)?;
        if !is_rsa_family(header.alg) {
            return Err(VerifyError::UnsupportedAlgorithm(header.alg));
        }
        let kid = header.kid.as_deref().ok_or(VerifyError::MissingKeyId)?;

        // Step 2: Resolve the issuer's key for this kid.
        let decoding_key = self.resolver.resolve(issuer, kid).await?;

        // Step 3: Verify signature and temporal claims with the pinned algorithm.
        let mut validation = Validation::new(header.alg);
        validation.leeway = self.options.clock_skew_seconds;
        validation.validate_nbf = true;
        match &self.options.audiences {
            Some(audiences) => validation.set_audience(audiences),
            None => validation.validate_aud = false,
        }
        let verified =
            decode::<Value>(token, &decoding_key, &validation).map_err(VerifyError::from_jwt)?;
        validate_iat(&verified.claims, self.options.clock_skew_seconds)?;

        // Step 4: Map verified claims into the identity payload.
        Ok(extract_claims(&verified.claims, claims_config))
    }
}

pub fn is_rsa_family(alg: Algorithm) -> bool {
    matches!(
        alg,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
    )
}

fn validate_iat(claims: &Value, leeway_seconds: u64) -> Result<(), VerifyError> {
    let Some(iat) = claims.get("iat") else {
        return Ok(());
    };
    let iat = iat
        .as_i64()
        .or_else(|| iat.as_f64().map(|secs| secs as i64))
        .ok_or_else(|| VerifyError::InvalidClaim("iat".to_string()))?;
    let leeway = i64::try_from(leeway_seconds).unwrap_or(i64::MAX);
    if iat > Utc::now().timestamp().saturating_add(leeway) {
        return Err(VerifyError::InvalidClaim("iat".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwks::{Jwk, KeySet};
    use crate::auth::keys::{HttpKeyResolver, OidcDiscovery};
    use crate::auth::test_support::{mint_token, spawn_oidc_server, test_key};
    use async_trait::async_trait;
    use jsonwebtoken::{DecodingKey, EncodingKey, Header};
    use serde_json::json;
    use std::time::Duration;

    struct StaticResolver(KeySet);

    #[async_trait]
    impl KeyResolver for StaticResolver {
        async fn resolve(&self, _issuer: &str, kid: &str) -> Result<DecodingKey, KeyError> {
            self.0.select(kid)?.decoding_key()
        }
    }

    fn verifier(options: VerifierOptions) -> TokenVerifier {
        let key_set = KeySet {
            keys: vec![Jwk::from_rsa("kid-1", &test_key().public)],
        };
        TokenVerifier::new(Arc::new(StaticResolver(key_set)), options)
    }

    fn claims(extra: Value) -> Value {
        let now = Utc::now().timestamp();
        let mut base = json!({
            "iss": "https://issuer.example",
            "sub": "user-1",
            "name": "Jane Doe",
            "preferred_username": "jdoe",
            "email": "jdoe@example.com",
            "iat": now,
            "exp": now + 300
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            for (key, value) in extra {
                base.insert(key.clone(), value.clone());
            }
        }
        base
    }

    const ISSUER: &str = "https://issuer.example";

    #[tokio::test]
    async fn verifies_rs256_and_extracts_claims() {
        let token = mint_token(
            Algorithm::RS256,
            Some("kid-1"),
            &claims(json!({"groups": "a b", "roles": ["admin"], "scope": "openid email"})),
        );
        let verified = verifier(VerifierOptions::default())
            .verify(&token, ISSUER, &ClaimsConfig::default())
            .await
            .expect("verify");
        assert_eq!(verified.subject, "user-1");
        assert_eq!(verified.name.as_deref(), Some("Jane Doe"));
        assert_eq!(verified.username.as_deref(), Some("jdoe"));
        assert_eq!(verified.email.as_deref(), Some("jdoe@example.com"));
        assert!(verified.in_group("a") && verified.in_group("b"));
        assert!(verified.roles.contains("admin"));
        assert!(verified.has_scope("openid") && verified.has_scope("email"));
        assert_eq!(verified.issuer.as_deref(), Some(ISSUER));
    }

    #[tokio::test]
    async fn verifies_pss_tokens() {
        let token = mint_token(Algorithm::PS256, Some("kid-1"), &claims(json!({})));
        let verified = verifier(VerifierOptions::default())
            .verify(&token, ISSUER, &ClaimsConfig::default())
            .await
            .expect("verify");
        assert_eq!(verified.subject, "user-1");
    }

    #[tokio::test]
    async fn rejects_hmac_tokens_before_key_lookup() {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("kid-1".to_string());
        let token = jsonwebtoken::encode(
            &header,
            &claims(json!({})),
            &EncodingKey::from_secret(b"shared"),
        )
        .expect("token");
        let err = verifier(VerifierOptions::default())
            .verify(&token, ISSUER, &ClaimsConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::UnsupportedAlgorithm(Algorithm::HS256)));
    }

    #[tokio::test]
    async fn requires_key_id() {
        let token = mint_token(Algorithm::RS256, None, &claims(json!({})));
        let err = verifier(VerifierOptions::default())
            .verify(&token, ISSUER, &ClaimsConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::MissingKeyId));
    }

    #[tokio::test]
    async fn unknown_kid_propagates_key_error() {
        let token = mint_token(Algorithm::RS256, Some("kid-x"), &claims(json!({})));
        let err = verifier(VerifierOptions::default())
            .verify(&token, ISSUER, &ClaimsConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::Key(KeyError::KeyNotFound(_))));
    }

    #[tokio::test]
    async fn expired_tokens_are_reported_as_expired() {
        let now = Utc::now().timestamp();
        let token = mint_token(
            Algorithm::RS256,
            Some("kid-1"),
            &claims(json!({"iat": now - 7200, "exp": now - 3600})),
        );
        let err = verifier(VerifierOptions::default())
            .verify(&token, ISSUER, &ClaimsConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::TokenExpired));
    }

    #[tokio::test]
    async fn not_yet_valid_tokens_are_rejected() {
        let now = Utc::now().timestamp();
        let token = mint_token(
            Algorithm::RS256,
            Some("kid-1"),
            &claims(json!({"nbf": now + 3600, "exp": now + 7200})),
        );
        let err = verifier(VerifierOptions::default())
            .verify(&token, ISSUER, &ClaimsConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::TokenNotYetValid));
    }

    #[tokio::test]
    async fn future_iat_is_rejected() {
        let now = Utc::now().timestamp();
        let token = mint_token(
            Algorithm::RS256,
            Some("kid-1"),
            &claims(json!({"iat": now + 3600})),
        );
        let err = verifier(VerifierOptions::default())
            .verify(&token, ISSUER, &ClaimsConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::InvalidClaim(claim) if claim == "iat"));
    }

    #[test]
    fn iat_leeway_saturates_instead_of_overflowing() {
        let now = Utc::now().timestamp();
        assert!(validate_iat(&json!({"iat": now + 3600}), u64::MAX).is_ok());
        assert!(validate_iat(&json!({"iat": i64::MAX}), u64::MAX).is_ok());
        assert!(matches!(
            validate_iat(&json!({"iat": now + 3600}), 60),
            Err(VerifyError::InvalidClaim(claim)) if claim == "iat"
        ));
    }

    #[tokio::test]
    async fn missing_exp_is_rejected() {
        let token = mint_token(Algorithm::RS256, Some("kid-1"), &json!({"sub": "user-1"}));
        let err = verifier(VerifierOptions::default())
            .verify(&token, ISSUER, &ClaimsConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::InvalidClaim(claim) if claim == "exp"));
    }

    #[tokio::test]
    async fn tampered_payload_fails_signature() {
        let token = mint_token(Algorithm::RS256, Some("kid-1"), &claims(json!({})));
        let forged = base64::Engine::encode(
            &base64::engine::general_purpose::URL_SAFE_NO_PAD,
            serde_json::to_vec(&claims(json!({"sub": "admin"}))).expect("json"),
        );
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = &forged;
        let err = verifier(VerifierOptions::default())
            .verify(&parts.join("."), ISSUER, &ClaimsConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::SignatureInvalid));
    }

    #[tokio::test]
    async fn garbage_is_malformed() {
        let err = verifier(VerifierOptions::default())
            .verify("xyz", ISSUER, &ClaimsConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::Malformed(_)));
    }

    #[tokio::test]
    async fn audience_is_ignored_unless_configured() {
        let token = mint_token(Algorithm::RS256, Some("kid-1"), &claims(json!({"aud": "account"})));
        verifier(VerifierOptions::default())
            .verify(&token, ISSUER, &ClaimsConfig::default())
            .await
            .expect("aud not enforced");

        let strict = verifier(VerifierOptions {
            audiences: Some(vec!["koda".to_string()]),
            ..VerifierOptions::default()
        });
        let err = strict
            .verify(&token, ISSUER, &ClaimsConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::InvalidClaim(claim) if claim == "aud"));

        let matching = mint_token(
            Algorithm::RS256,
            Some("kid-1"),
            &claims(json!({"aud": ["account", "koda"]})),
        );
        strict
            .verify(&matching, ISSUER, &ClaimsConfig::default())
            .await
            .expect("aud matches");
    }

    #[tokio::test]
    async fn empty_subject_is_not_a_verifier_error() {
        let token = mint_token(Algorithm::RS256, Some("kid-1"), &claims(json!({"sub": ""})));
        let verified = verifier(VerifierOptions::default())
            .verify(&token, ISSUER, &ClaimsConfig::default())
            .await
            .expect("verify");
        assert!(verified.subject.is_empty());
    }

    #[tokio::test]
    async fn verifies_through_discovery() {
        let key_set = serde_json::to_value(KeySet {
            keys: vec![Jwk::from_rsa("kid-1", &test_key().public)],
        })
        .expect("json");
        let server = spawn_oidc_server(key_set).await;
        let discovery = OidcDiscovery::new(Duration::from_secs(2)).expect("client");
        let verifier = TokenVerifier::new(
            Arc::new(HttpKeyResolver::new(discovery)),
            VerifierOptions::default(),
        );
        let token = mint_token(Algorithm::RS256, Some("kid-1"), &claims(json!({})));
        let verified = verifier
            .verify(&token, &server.issuer, &ClaimsConfig::default())
            .await
            .expect("verify");
        assert_eq!(verified.subject, "user-1");
    }
}

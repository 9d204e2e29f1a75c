//! Key set documents and RSA key reconstruction.
//!
//! # Purpose
//! Models the `{ "keys": [...] }` document an issuer publishes and rebuilds
//! verification keys from its base64url modulus/exponent pairs.
//!
//! # Key invariants
//! - Only `kty = "RSA"` entries are usable; other types fail with
//!   [`KeyError::UnsupportedKeyType`] once selected.
//! - `n` and `e` are unsigned big-endian integers of arbitrary width.
//! - Entries with missing members still parse so one odd key (for example an
//!   EC key without `n`/`e`) does not poison the whole set.
use crate::auth::keys::KeyError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::DecodingKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};

/// Issuers may publish keys wider than the `rsa` crate's 4096-bit default.
const MAX_MODULUS_BITS: usize = 16_384;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(default)]
    pub kty: String,
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    #[serde(default)]
    pub kid: String,
    #[serde(default)]
    pub n: String,
    #[serde(default)]
    pub e: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

impl KeySet {
    /// Linear scan for `kid`; the first match decides.
    pub fn select(&self, kid: &str) -> Result<&Jwk, KeyError> {
        let jwk = self
            .keys
            .iter()
            .find(|key| key.kid == kid)
            .ok_or_else(|| KeyError::KeyNotFound(kid.to_string()))?;
        if jwk.kty != "RSA" {
            return Err(KeyError::UnsupportedKeyType(jwk.kty.clone()));
        }
        Ok(jwk)
    }
}

impl Jwk {
    pub fn rsa_public_key(&self) -> Result<RsaPublicKey, KeyError> {
        let n = decode_unsigned("n", &self.n)?;
        let e = decode_unsigned("e", &self.e)?;
        RsaPublicKey::new_with_max_size(n, e, MAX_MODULUS_BITS)
            .map_err(|err| KeyError::KeyMaterialInvalid(err.to_string()))
    }

    pub fn decoding_key(&self) -> Result<DecodingKey, KeyError> {
        let public_key = self.rsa_public_key()?;
        Ok(DecodingKey::from_rsa_raw_components(
            &public_key.n().to_bytes_be(),
            &public_key.e().to_bytes_be(),
        ))
    }

    /// Build an RSA entry from an existing public key.
    pub fn from_rsa(kid: impl Into<String>, key: &RsaPublicKey) -> Self {
        Self {
            kty: "RSA".to_string(),
            key_use: Some("sig".to_string()),
            kid: kid.into(),
            n: URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()),
        }
    }
}

fn decode_unsigned(component: &str, encoded: &str) -> Result<BigUint, KeyError> {
    // Some issuers pad their base64url output; the value itself is unpadded.
    let trimmed = encoded.trim_end_matches('=');
    if trimmed.is_empty() {
        return Err(KeyError::KeyMaterialInvalid(format!("empty {component}")));
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|err| KeyError::KeyMaterialInvalid(format!("{component}: {err}")))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

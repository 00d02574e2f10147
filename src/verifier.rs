//! Signed-token verification: RS256 signatures checked against the provider JWKS.
//!
//! # Verification flow
//!
//! 1. Decode the JWT header (no verification) to extract `alg` and `kid`.
//! 2. Reject any algorithm other than RS256.
//! 3. Resolve the `kid` in the key set (cached; refreshed once on unknown `kid`).
//! 4. Verify the signature and claims: `aud` must contain the client id, `exp`
//!    must be in the future, `nbf` (when present) in the past, and `iss` must
//!    match when an issuer is configured.
//! 5. Return every claim of the token, unmodified, as [`VerifiedClaims`].
//!
//! Nonce binding is the caller's job: this module surfaces the `nonce` claim
//! and offers [`VerifiedClaims::nonce_matches`], but holds no session state.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{
    Algorithm, DecodingKey, Validation,
    jwk::{AlgorithmParameters, JwkSet},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::VerificationError;
use crate::jwks::KeySetSource;
use crate::Result;

/// Decoded, signature-checked claim set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerifiedClaims(Map<String, Value>);

impl VerifiedClaims {
    /// Look up a claim by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// `sub` claim
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.get_str("sub")
    }

    /// `iss` claim
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.get_str("iss")
    }

    /// `aud` claim, whether it was sent as a string or an array.
    #[must_use]
    pub fn audience(&self) -> Vec<&str> {
        match self.0.get("aud") {
            Some(Value::String(s)) => vec![s.as_str()],
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// `exp` claim (Unix seconds)
    #[must_use]
    pub fn expires_at(&self) -> Option<u64> {
        self.0.get("exp").and_then(Value::as_u64)
    }

    /// `nonce` claim
    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.get_str("nonce")
    }

    /// `acr` claim
    #[must_use]
    pub fn acr(&self) -> Option<&str> {
        self.get_str("acr")
    }

    /// Compare the `nonce` claim with the value stored for this login, in constant time.
    #[must_use]
    pub fn nonce_matches(&self, expected: &str) -> bool {
        self.nonce()
            .is_some_and(|nonce| bool::from(nonce.as_bytes().ct_eq(expected.as_bytes())))
    }

    /// All claims.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into the underlying claim map.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// RS256 token verifier bound to one audience and one key set.
pub struct TokenVerifier {
    keys: Arc<dyn KeySetSource>,
    audience: String,
    issuer: Option<String>,
    leeway: Duration,
}

impl TokenVerifier {
    /// Create a verifier that accepts tokens addressed to `audience`.
    #[must_use]
    pub fn new(keys: Arc<dyn KeySetSource>, audience: impl Into<String>) -> Self {
        Self {
            keys,
            audience: audience.into(),
            issuer: None,
            leeway: Duration::ZERO,
        }
    }

    /// Also require the `iss` claim to equal `issuer`.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Clock-skew tolerance for `exp` and `nbf`.
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Verify a compact-serialized JWS and return its claims.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError`] for any failed check and
    /// [`TransportError`](crate::TransportError) if the key set cannot be fetched.
    pub async fn verify(&self, token: &str) -> Result<VerifiedClaims> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| VerificationError::Malformed(e.to_string()))?;

        if header.alg != Algorithm::RS256 {
            return Err(VerificationError::UnsupportedAlgorithm(format!("{:?}", header.alg)).into());
        }

        let kid = header.kid.as_deref().ok_or(VerificationError::MissingKeyId)?;
        let decoding_key = self.find_decoding_key(kid).await?;

        let token_data = jsonwebtoken::decode::<Map<String, Value>>(
            token,
            &decoding_key,
            &self.validation(),
        )
        .map_err(VerificationError::from)?;

        debug!(kid = %kid, "Token signature and claims verified");
        Ok(VerifiedClaims(token_data.claims))
    }

    /// Find a decoding key by `kid`, refreshing the key set if not found.
    async fn find_decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        let jwks = self.keys.key_set(false).await?;
        if let Some(key) = find_key_in_jwks(&jwks, kid)? {
            return Ok(key);
        }

        // Unknown kid: the provider may have rotated keys. Refresh once and retry.
        debug!(kid = %kid, "Key not found in cached JWKS, refreshing");
        let jwks = self.keys.key_set(true).await?;
        find_key_in_jwks(&jwks, kid)?
            .ok_or_else(|| VerificationError::KeyNotFound(kid.to_string()).into())
    }

    fn validation(&self) -> Validation {
        let mut v = Validation::new(Algorithm::RS256);
        v.leeway = self.leeway.as_secs();
        v.validate_nbf = true;
        v.set_audience(&[self.audience.as_str()]);
        v.set_required_spec_claims(&["exp", "aud"]);
        if let Some(issuer) = &self.issuer {
            v.set_issuer(&[issuer.as_str()]);
        }
        v
    }
}

/// Find a JWK by `kid` and convert it to an RSA `DecodingKey`.
fn find_key_in_jwks(
    jwks: &JwkSet,
    kid: &str,
) -> std::result::Result<Option<DecodingKey>, VerificationError> {
    let Some(jwk) = jwks.find(kid) else {
        return Ok(None);
    };

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map(Some)
            .map_err(|_| VerificationError::UnsupportedKey(kid.to_string())),
        _ => Err(VerificationError::UnsupportedKey(kid.to_string())),
    }
}

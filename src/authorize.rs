//! Authorization requests
//!
//! Per-login values (ACR levels, nonce, state, redirect URI) and the random
//! generators for nonce and state. The caller persists `nonce` and `state`
//! across the redirect round-trip; nothing here is stored.

use url::Url;

use crate::AcrValue;

/// Random bytes drawn for each nonce/state value.
pub const RANDOM_BYTES: usize = 64;

/// Generate a random nonce: 64 CSPRNG bytes, hex-encoded (128 characters).
#[must_use]
pub fn generate_nonce() -> String {
    random_hex()
}

/// Generate a random state: 64 CSPRNG bytes, hex-encoded (128 characters).
#[must_use]
pub fn generate_state() -> String {
    random_hex()
}

fn random_hex() -> String {
    let bytes: [u8; RANDOM_BYTES] = rand::random();
    hex::encode(bytes)
}

/// Optional overrides for [`authorization_url`](crate::FranceConnectClient::authorization_url).
///
/// Anything left unset falls back to a default: `eidas1`, freshly generated
/// nonce and state, and the configured login callback. A supplied value is
/// always used as given, even when empty.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationOptions {
    /// Requested assurance levels
    pub acr_values: Option<Vec<AcrValue>>,
    /// Nonce to bind into the ID token
    pub nonce: Option<String>,
    /// State to round-trip through the redirect
    pub state: Option<String>,
    /// Redirect URI after login
    pub callback_url: Option<String>,
}

impl AuthorizationOptions {
    /// All defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request these ACR values.
    #[must_use]
    pub fn acr_values(mut self, values: impl IntoIterator<Item = AcrValue>) -> Self {
        self.acr_values = Some(values.into_iter().collect());
        self
    }

    /// Use this nonce instead of generating one.
    #[must_use]
    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Use this state instead of generating one.
    #[must_use]
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Redirect here instead of the configured login callback.
    #[must_use]
    pub fn callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }
}

/// A ready-to-redirect authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Authorization endpoint URL with the full query string
    pub url: Url,
    /// Nonce sent; compare it with the ID token's `nonce` claim
    pub nonce: String,
    /// State sent; compare it with the callback's `state` parameter
    pub state: String,
    /// ACR values sent
    pub acr_values: Vec<AcrValue>,
    /// Redirect URI sent
    pub redirect_uri: String,
}

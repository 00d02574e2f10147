//! FranceConnect Client Library
//!
//! OpenID Connect client for the FranceConnect identity provider.
//!
//! # Features
//!
//! - **Authorization URL**: eIDAS ACR levels, random 128-hex-char nonce and state
//! - **Code Exchange**: token endpoint call with RS256 ID-token verification
//! - **User Info**: signed user-info assertions verified like ID tokens
//! - **Logout URL**: end-session redirect with `id_token_hint`
//! - **Discovery**: OpenID configuration document, returned verbatim
//! - **Key Rotation**: cached JWKS, refreshed once when a token names an unknown `kid`
//!
//! # Flow
//!
//! ```text
//! authorization_url() -> user logs in at FranceConnect -> callback with ?code&state
//!   -> exchange_code(code) -> compare claims.nonce with the stored nonce
//!   -> user_info(access_token) -> ... -> logout_url(id_token, state)
//! ```
//!
//! The client holds no session state: persisting `nonce`/`state` between the
//! redirect and the callback, and comparing them, is up to the caller.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authorize;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod jwks;
pub mod verifier;

pub use authorize::{AuthorizationOptions, AuthorizationRequest, generate_nonce, generate_state};
pub use client::{FranceConnectClient, TokenResponse};
pub use config::ClientConfig;
pub use error::{Error, Result, TransportError, VerificationError};
pub use france_connect_core::{AcrValue, Scope, UnknownValue, join};
pub use jwks::{JwksCache, KeySetSource, StaticKeySet};
pub use verifier::{TokenVerifier, VerifiedClaims};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// Library code only emits events; installing a subscriber is left to the
/// binary (or to the embedding application).
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = match format {
        Some("json") => subscriber.with(fmt::layer().json().with_writer(std::io::stderr)).try_init(),
        _ => subscriber.with(fmt::layer().with_writer(std::io::stderr)).try_init(),
    };

    installed.map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}

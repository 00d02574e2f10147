//! Signing key sets: where the verifier gets the provider's public keys.
//!
//! [`KeySetSource`] is the seam between token verification and key retrieval.
//! [`JwksCache`] fetches the provider's published JWKS over HTTP and reuses it
//! for a TTL; [`StaticKeySet`] serves a fixed set (offline verification, tests).
//!
//! A `force_refresh` request bypasses the cache. The verifier issues exactly
//! one forced refresh when a token names a `kid` the cached set does not hold,
//! which is how provider key rotation is picked up before the TTL elapses.
//! [`JwksCache`] honors at most one forced refresh per minimum interval; within
//! it, forced requests are answered from the cache.

use std::time::{Duration, Instant};

use jsonwebtoken::jwk::JwkSet;
use parking_lot::{Mutex, RwLock};
use tracing::debug;
use url::Url;

use crate::client::ensure_success;
use crate::error::TransportError;

/// Default minimum spacing between forced refreshes.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Supplies the JSON Web Key Set used to verify provider signatures.
///
/// Implementations must be `Send + Sync` because the verifier is shared
/// across async tasks.
#[async_trait::async_trait]
pub trait KeySetSource: Send + Sync + 'static {
    /// Return the current key set, bypassing any cache when `force_refresh` is set.
    async fn key_set(&self, force_refresh: bool) -> Result<JwkSet, TransportError>;
}

/// Cached JWKS entry.
struct CachedJwks {
    keys: JwkSet,
    fetched_at: Instant,
}

/// JWKS fetched from the provider and cached for a fixed TTL.
pub struct JwksCache {
    http: reqwest::Client,
    jwks_uri: Url,
    ttl: Duration,
    min_refresh_interval: Duration,
    cached: RwLock<Option<CachedJwks>>,
    last_forced: Mutex<Option<Instant>>,
}

impl JwksCache {
    /// Create a cache for `jwks_uri` using the given HTTP client.
    #[must_use]
    pub fn new(http: reqwest::Client, jwks_uri: Url, ttl: Duration) -> Self {
        Self {
            http,
            jwks_uri,
            ttl,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            cached: RwLock::new(None),
            last_forced: Mutex::new(None),
        }
    }

    /// Set the minimum time between two forced refreshes.
    #[must_use]
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// The endpoint this cache fetches from.
    #[must_use]
    pub fn jwks_uri(&self) -> &Url {
        &self.jwks_uri
    }

    fn fresh(&self) -> Option<JwkSet> {
        let cached = self.cached.read();
        cached
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| c.keys.clone())
    }

    /// Cached keys when a forced refresh happened less than the minimum interval ago.
    fn throttled(&self) -> Option<JwkSet> {
        let mut last_forced = self.last_forced.lock();
        if last_forced.is_some_and(|at| at.elapsed() < self.min_refresh_interval) {
            let keys = self.cached.read().as_ref().map(|c| c.keys.clone());
            if keys.is_some() {
                debug!(url = %self.jwks_uri, "Forced JWKS refresh throttled");
                return keys;
            }
        }
        *last_forced = Some(Instant::now());
        None
    }

    async fn fetch(&self) -> Result<JwkSet, TransportError> {
        debug!(url = %self.jwks_uri, "Fetching JWKS");

        let response = self.http.get(self.jwks_uri.clone()).send().await?;
        let body = ensure_success(&self.jwks_uri, response).await?.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| TransportError::Decode {
            url: self.jwks_uri.to_string(),
            reason: format!("not a JSON Web Key Set: {e}"),
        })
    }
}

#[async_trait::async_trait]
impl KeySetSource for JwksCache {
    async fn key_set(&self, force_refresh: bool) -> Result<JwkSet, TransportError> {
        let reused = if force_refresh {
            self.throttled()
        } else {
            self.fresh()
        };
        if let Some(keys) = reused {
            return Ok(keys);
        }

        let keys = self.fetch().await?;
        debug!(count = keys.keys.len(), "JWKS refreshed");

        *self.cached.write() = Some(CachedJwks {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });

        Ok(keys)
    }
}

/// A fixed key set that never touches the network.
pub struct StaticKeySet {
    keys: JwkSet,
}

impl StaticKeySet {
    /// Wrap an already-parsed key set.
    #[must_use]
    pub fn new(keys: JwkSet) -> Self {
        Self { keys }
    }

    /// Parse a key set from its JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self::new)
    }
}

#[async_trait::async_trait]
impl KeySetSource for StaticKeySet {
    async fn key_set(&self, _force_refresh: bool) -> Result<JwkSet, TransportError> {
        Ok(self.keys.clone())
    }
}

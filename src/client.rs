//! FranceConnect client
//!
//! Orchestrates the authorization-code flow against the provider: builds the
//! authorization and logout redirects, exchanges codes for tokens, fetches
//! user info and the discovery document. Signed tokens go through the
//! [`TokenVerifier`]; HTTP goes through one shared `reqwest::Client` whose
//! timeout, TLS and redirect settings come from [`TransportConfig`].

use std::sync::Arc;

use reqwest::header::ACCEPT;
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::authorize::{
    AuthorizationOptions, AuthorizationRequest, generate_nonce, generate_state,
};
use crate::config::{ClientConfig, Endpoints, TransportConfig};
use crate::error::{TransportError, VerificationError};
use crate::jwks::{JwksCache, KeySetSource};
use crate::verifier::{TokenVerifier, VerifiedClaims};
use crate::{AcrValue, Error, Result};

const APPLICATION_JSON: &str = "application/json";

/// Raw token endpoint reply, passed through unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenResponse(Map<String, Value>);

impl TokenResponse {
    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// `access_token` field
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.get_str("access_token")
    }

    /// `id_token` field
    #[must_use]
    pub fn id_token(&self) -> Option<&str> {
        self.get_str("id_token")
    }

    /// `token_type` field
    #[must_use]
    pub fn token_type(&self) -> Option<&str> {
        self.get_str("token_type")
    }

    /// `expires_in` field (seconds)
    #[must_use]
    pub fn expires_in(&self) -> Option<u64> {
        self.0.get("expires_in").and_then(Value::as_u64)
    }

    /// All fields.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Client for one FranceConnect service-provider registration.
///
/// Cheap to share behind an `Arc`: all state is read-only apart from the
/// key-set cache inside the verifier.
pub struct FranceConnectClient {
    config: ClientConfig,
    client_secret: String,
    endpoints: Endpoints,
    http: Client,
    verifier: TokenVerifier,
}

impl FranceConnectClient {
    /// Create a client with an HTTP transport built from `config.transport`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = build_http_client(&config.transport)?;
        Self::with_http_client(config, http)
    }

    /// Create a client using a caller-supplied HTTP client.
    ///
    /// The key set is fetched from the configured JWKS endpoint with the same client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn with_http_client(config: ClientConfig, http: Client) -> Result<Self> {
        let endpoints = config.resolve_endpoints()?;
        let keys = Arc::new(JwksCache::new(
            http.clone(),
            endpoints.jwks.clone(),
            config.verification.jwks_cache_ttl,
        )
        .with_min_refresh_interval(config.verification.jwks_min_refresh_interval));
        Self::assemble(config, endpoints, http, keys)
    }

    /// Create a client whose verifier takes keys from `keys` instead of the JWKS endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn with_key_source(
        config: ClientConfig,
        http: Client,
        keys: Arc<dyn KeySetSource>,
    ) -> Result<Self> {
        let endpoints = config.resolve_endpoints()?;
        Self::assemble(config, endpoints, http, keys)
    }

    fn assemble(
        config: ClientConfig,
        endpoints: Endpoints,
        http: Client,
        keys: Arc<dyn KeySetSource>,
    ) -> Result<Self> {
        let client_secret = config.resolve_client_secret()?;
        if client_secret.is_empty() {
            return Err(Error::Config("client_secret must not be empty".to_string()));
        }

        if endpoints.token.scheme() != "https" {
            warn!(base_url = %config.base_url, "FranceConnect base URL is not HTTPS");
        }
        if !config.transport.verify_tls {
            warn!("TLS certificate verification is disabled");
        }

        let mut verifier = TokenVerifier::new(keys, config.client_id.clone())
            .with_leeway(config.verification.leeway);
        if let Some(issuer) = &config.verification.issuer {
            verifier = verifier.with_issuer(issuer.clone());
        }

        debug!(client_id = %config.client_id, base_url = %config.base_url, "FranceConnect client ready");

        Ok(Self {
            config,
            client_secret,
            endpoints,
            http,
            verifier,
        })
    }

    /// The configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolved provider endpoints.
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Build the URL to redirect the user to for login.
    ///
    /// Pure construction, no network call.
    #[must_use]
    pub fn authorization_url(&self, options: AuthorizationOptions) -> AuthorizationRequest {
        let acr_values = options
            .acr_values
            .unwrap_or_else(|| vec![AcrValue::default()]);
        let nonce = options.nonce.unwrap_or_else(generate_nonce);
        let state = options.state.unwrap_or_else(generate_state);
        let redirect_uri = options
            .callback_url
            .unwrap_or_else(|| self.config.login_callback_url.clone());

        let mut url = self.endpoints.authorize.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", &crate::join(&self.config.scopes))
            .append_pair("acr_values", &crate::join(&acr_values))
            .append_pair("nonce", &nonce)
            .append_pair("state", &state)
            .append_pair("redirect_uri", &redirect_uri);

        AuthorizationRequest {
            url,
            nonce,
            state,
            acr_values,
            redirect_uri,
        }
    }

    /// Build the end-session URL that logs the user out of FranceConnect.
    ///
    /// Pure construction, no network call. `callback_url` defaults to the
    /// configured logout callback.
    #[must_use]
    pub fn logout_url(&self, id_token: &str, state: &str, callback_url: Option<&str>) -> Url {
        let redirect_uri = callback_url.unwrap_or(&self.config.logout_callback_url);

        let mut url = self.endpoints.end_session.clone();
        url.query_pairs_mut()
            .append_pair("id_token_hint", id_token)
            .append_pair("state", state)
            .append_pair("post_logout_redirect_uri", redirect_uri);
        url
    }

    /// Fetch the provider's OpenID discovery document, verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] on network failure, non-2xx status or a non-JSON body.
    pub async fn provider_configuration(&self) -> Result<Map<String, Value>> {
        let url = &self.endpoints.discovery;
        debug!(url = %url, "Fetching OpenID configuration");

        let response = self
            .http
            .get(url.clone())
            .header(ACCEPT, APPLICATION_JSON)
            .send()
            .await
            .map_err(TransportError::from)?;

        Ok(decode_json(url, ensure_success(url, response).await?).await?)
    }

    /// Exchange an authorization code for tokens and verify the ID token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the token endpoint call fails and
    /// [`Error::Verification`] if the ID token is missing or invalid. No
    /// tokens are returned when verification fails.
    pub async fn exchange_code(&self, code: &str) -> Result<(TokenResponse, VerifiedClaims)> {
        let url = &self.endpoints.token;
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.login_callback_url.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        debug!(url = %url, "Exchanging authorization code");
        let response = self
            .http
            .post(url.clone())
            .header(ACCEPT, APPLICATION_JSON)
            .form(&params)
            .send()
            .await
            .map_err(TransportError::from)?;

        let token: TokenResponse = decode_json(url, ensure_success(url, response).await?).await?;

        let id_token = token.id_token().ok_or(VerificationError::MissingIdToken)?;
        let claims = self.verifier.verify(id_token).await?;

        info!(acr = claims.acr().unwrap_or("-"), "Authorization code exchanged");
        Ok((token, claims))
    }

    /// Fetch the user's identity claims with an access token.
    ///
    /// FranceConnect answers with a signed token rather than a JSON object;
    /// the body is verified like an ID token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the call fails and
    /// [`Error::Verification`] if the signed body is invalid.
    pub async fn user_info(&self, access_token: &str) -> Result<VerifiedClaims> {
        let url = &self.endpoints.userinfo;
        debug!(url = %url, "Fetching user info");

        let response = self
            .http
            .get(url.clone())
            .bearer_auth(access_token)
            .header(ACCEPT, APPLICATION_JSON)
            .send()
            .await
            .map_err(TransportError::from)?;

        let body = ensure_success(url, response)
            .await?
            .text()
            .await
            .map_err(TransportError::from)?;

        self.verifier.verify(body.trim()).await
    }

    /// Verify any provider-signed token (ID token, user-info assertion).
    ///
    /// # Errors
    ///
    /// See [`TokenVerifier::verify`].
    pub async fn verify_token(&self, token: &str) -> Result<VerifiedClaims> {
        self.verifier.verify(token).await
    }
}

/// Build the shared HTTP client from transport settings.
fn build_http_client(transport: &TransportConfig) -> Result<Client> {
    let redirect = if transport.follow_redirects {
        Policy::default()
    } else {
        Policy::none()
    };

    Client::builder()
        .timeout(transport.timeout)
        .danger_accept_invalid_certs(!transport.verify_tls)
        .redirect(redirect)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))
}

/// Turn a non-2xx response into a [`TransportError::Status`].
pub(crate) async fn ensure_success(
    url: &Url,
    response: Response,
) -> std::result::Result<Response, TransportError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Status {
        url: url.to_string(),
        status,
        body,
    })
}

async fn decode_json<T: DeserializeOwned>(
    url: &Url,
    response: Response,
) -> std::result::Result<T, TransportError> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| TransportError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

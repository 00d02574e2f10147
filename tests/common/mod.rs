//! Shared fixtures: an in-process mock FranceConnect provider and token signing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Form, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use jsonwebtoken::{Algorithm, EncodingKey, Header, get_current_timestamp};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use france_connect::{ClientConfig, FranceConnectClient, Scope};

pub const CLIENT_ID: &str = "0fe88d0ab61bbd95e6f8e718d7e4fadb0c721c2ab0f520a506a519643d8f6826";
pub const CLIENT_SECRET: &str = "6a4f704f8241232902b236a9dd06cf2d68c7f9ce40a297a41854615e2b2bc39d";
pub const LOGIN_CALLBACK_URL: &str = "http://localhost:8080/login";
pub const LOGOUT_CALLBACK_URL: &str = "http://localhost:8080/callback";
pub const ISSUER: &str = "https://fcp-low.integ01.dev-franceconnect.fr/api/v2";
pub const KID: &str = "fc-integ-2024";
pub const MOVED_PATH: &str = "/moved";

pub const JWKS: &str = include_str!("../fixtures/jwks.json");
const PROVIDER_KEY: &[u8] = include_bytes!("../fixtures/provider_rsa_key.pem");

/// Canned reply for one endpoint.
#[derive(Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
    pub location: Option<String>,
    pub delay: Duration,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::status(StatusCode::OK, body)
    }

    pub fn json(value: &Value) -> Self {
        Self::ok(value.to_string())
    }

    pub fn status(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            location: None,
            delay: Duration::ZERO,
        }
    }

    /// `307 Temporary Redirect` to `location` (a path on the mock provider).
    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
            ..Self::status(StatusCode::TEMPORARY_REDIRECT, "")
        }
    }

    /// Answer only after `delay`.
    pub fn delayed(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }

    async fn respond(&self) -> Response {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.location {
            Some(location) => (
                self.status,
                [(header::LOCATION, location.clone())],
                self.body.clone(),
            )
                .into_response(),
            None => (self.status, self.body.clone()).into_response(),
        }
    }
}

/// What the mock provider answers on each endpoint.
#[derive(Clone)]
pub struct Routes {
    pub token: Reply,
    pub userinfo: Reply,
    pub discovery: Reply,
    pub jwks: Reply,
    /// Served at [`MOVED_PATH`], a redirect target.
    pub moved: Reply,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            token: Reply::status(StatusCode::NOT_FOUND, ""),
            userinfo: Reply::status(StatusCode::NOT_FOUND, ""),
            discovery: Reply::status(StatusCode::NOT_FOUND, ""),
            jwks: Reply::ok(JWKS),
            moved: Reply::status(StatusCode::NOT_FOUND, ""),
        }
    }
}

/// Requests observed by the mock provider.
#[derive(Default)]
pub struct Recorded {
    pub token_form: Option<HashMap<String, String>>,
    pub token_accept: Option<String>,
    pub userinfo_authorization: Option<String>,
    pub userinfo_accept: Option<String>,
}

struct ProviderState {
    routes: Routes,
    recorded: Mutex<Recorded>,
    jwks_hits: AtomicUsize,
}

/// A FranceConnect stand-in listening on a random local port.
pub struct MockProvider {
    pub base_url: String,
    state: Arc<ProviderState>,
}

impl MockProvider {
    pub async fn start(routes: Routes) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = Arc::new(ProviderState {
            routes,
            recorded: Mutex::new(Recorded::default()),
            jwks_hits: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/api/v2/token", post(token))
            .route("/api/v2/userinfo", get(userinfo))
            .route("/api/v2/jwks", get(jwks))
            .route("/api/v2/.well-known/openid-configuration", get(discovery))
            .route(MOVED_PATH, get(moved))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn recorded(&self) -> parking_lot::MutexGuard<'_, Recorded> {
        self.state.recorded.lock()
    }

    pub fn jwks_hits(&self) -> usize {
        self.state.jwks_hits.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> ClientConfig {
        config_for(&self.base_url)
    }

    pub fn client(&self) -> FranceConnectClient {
        FranceConnectClient::new(self.config()).unwrap()
    }
}

pub fn config_for(base_url: &str) -> ClientConfig {
    ClientConfig::new(
        CLIENT_ID,
        CLIENT_SECRET,
        vec![Scope::OpenId, Scope::Profile],
        LOGIN_CALLBACK_URL,
        LOGOUT_CALLBACK_URL,
        base_url,
    )
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn token(
    State(state): State<Arc<ProviderState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    {
        let mut recorded = state.recorded.lock();
        recorded.token_form = Some(form);
        recorded.token_accept = header_value(&headers, header::ACCEPT);
    }
    state.routes.token.respond().await
}

async fn userinfo(State(state): State<Arc<ProviderState>>, headers: HeaderMap) -> Response {
    {
        let mut recorded = state.recorded.lock();
        recorded.userinfo_authorization = header_value(&headers, header::AUTHORIZATION);
        recorded.userinfo_accept = header_value(&headers, header::ACCEPT);
    }
    state.routes.userinfo.respond().await
}

async fn jwks(State(state): State<Arc<ProviderState>>) -> Response {
    state.jwks_hits.fetch_add(1, Ordering::SeqCst);
    state.routes.jwks.respond().await
}

async fn discovery(State(state): State<Arc<ProviderState>>) -> Response {
    state.routes.discovery.respond().await
}

async fn moved(State(state): State<Arc<ProviderState>>) -> Response {
    state.routes.moved.respond().await
}

/// Sign `claims` with the provider key under `kid`.
pub fn sign_with_kid(kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    jsonwebtoken::encode(&header, claims, &EncodingKey::from_rsa_pem(PROVIDER_KEY).unwrap())
        .unwrap()
}

/// Sign `claims` with the provider key published in the JWKS.
pub fn sign(claims: &Value) -> String {
    sign_with_kid(KID, claims)
}

/// ID-token claims shaped like a real FranceConnect answer.
pub fn id_token_claims(nonce: &str) -> Value {
    let now = get_current_timestamp();
    json!({
        "sub": "b6048e95bb134ec5b1d1e1fa69f287172e91722b9354d637a1bcf2ebb0fd2ef5v1",
        "auth_time": now,
        "acr": "eidas1",
        "nonce": nonce,
        "at_hash": "aGKmlTnMsVazk_FmDo7Vhw",
        "aud": CLIENT_ID,
        "exp": now + 60,
        "iat": now,
        "iss": ISSUER,
    })
}

/// User-info claims for the default test identity.
pub fn user_info_claims() -> Value {
    json!({
        "sub": "1234567890",
        "given_name": "Angela",
        "family_name": "Doe",
        "birthdate": "1990-01-01",
        "aud": CLIENT_ID,
        "iss": ISSUER,
        "exp": get_current_timestamp() + 3600,
    })
}

//! Configuration management

use std::{env, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result, Scope};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "FRANCE_CONNECT_";

/// Client configuration: credentials, provider location and transport settings.
///
/// Built once at startup and shared read-only by every flow operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Client identifier issued by FranceConnect
    pub client_id: String,

    /// Client secret
    /// Supports: literal value or `env:VAR_NAME`
    pub client_secret: String,

    /// Requested scopes, sent space-joined in this order
    pub scopes: Vec<Scope>,

    /// Where the provider redirects after login
    pub login_callback_url: String,

    /// Where the provider redirects after logout
    pub logout_callback_url: String,

    /// Provider base URL, e.g. `https://fcp-low.integ01.dev-franceconnect.fr`
    pub base_url: String,

    /// Endpoint paths, resolved against `base_url`
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// HTTP transport settings
    #[serde(default)]
    pub transport: TransportConfig,

    /// Token verification settings
    #[serde(default)]
    pub verification: VerificationConfig,
}

/// Provider endpoint paths
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Authorization endpoint
    pub authorize: String,
    /// Token endpoint
    pub token: String,
    /// JSON Web Key Set
    pub jwks: String,
    /// User info endpoint
    pub userinfo: String,
    /// End-session (logout) endpoint
    pub end_session: String,
    /// OpenID discovery document
    pub discovery: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            authorize: "/api/v2/authorize".to_string(),
            token: "/api/v2/token".to_string(),
            jwks: "/api/v2/jwks".to_string(),
            userinfo: "/api/v2/userinfo".to_string(),
            end_session: "/api/v2/session/end".to_string(),
            discovery: "/api/v2/.well-known/openid-configuration".to_string(),
        }
    }
}

/// HTTP transport configuration, applied to every request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Verify the provider's TLS certificate
    pub verify_tls: bool,
    /// Follow HTTP redirects
    pub follow_redirects: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            verify_tls: true,
            follow_redirects: true,
        }
    }
}

/// Signed-token verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Clock-skew tolerance applied to `exp` and `nbf`
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,
    /// Expected `iss` claim; not checked when unset
    pub issuer: Option<String>,
    /// How long a fetched key set is reused before it is fetched again
    #[serde(with = "humantime_serde")]
    pub jwks_cache_ttl: Duration,
    /// Minimum time between forced key-set refreshes triggered by unknown `kid`s
    #[serde(with = "humantime_serde")]
    pub jwks_min_refresh_interval: Duration,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            leeway: Duration::ZERO,
            issuer: None,
            jwks_cache_ttl: Duration::from_secs(3600),
            jwks_min_refresh_interval: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Create a configuration with default endpoints, transport and verification settings.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scopes: Vec<Scope>,
        login_callback_url: impl Into<String>,
        logout_callback_url: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scopes,
            login_callback_url: login_callback_url.into(),
            logout_callback_url: logout_callback_url.into(),
            base_url: base_url.into(),
            endpoints: EndpointsConfig::default(),
            transport: TransportConfig::default(),
            verification: VerificationConfig::default(),
        }
    }

    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist, cannot be parsed,
    /// or lacks a required field.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().map_err(|e| Error::Config(e.to_string()))
    }

    /// Resolve the client secret (expand `env:VAR_NAME`)
    ///
    /// # Errors
    ///
    /// Returns an error if the referenced environment variable is not set.
    pub fn resolve_client_secret(&self) -> Result<String> {
        match self.client_secret.strip_prefix("env:") {
            Some(var_name) => env::var(var_name).map_err(|_| {
                Error::Config(format!("client_secret references unset variable {var_name}"))
            }),
            None => Ok(self.client_secret.clone()),
        }
    }

    /// Check the configuration and resolve every endpoint against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error on empty credentials or malformed URLs.
    pub fn resolve_endpoints(&self) -> Result<Endpoints> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Config("client_id must not be empty".to_string()));
        }
        parse_absolute("login_callback_url", &self.login_callback_url)?;
        parse_absolute("logout_callback_url", &self.logout_callback_url)?;

        let base = parse_absolute("base_url", &self.base_url)?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "base_url cannot be used as a base: {}",
                self.base_url
            )));
        }

        let join = |name: &str, path: &str| {
            base.join(path)
                .map_err(|e| Error::Config(format!("Invalid {name} endpoint '{path}': {e}")))
        };

        Ok(Endpoints {
            authorize: join("authorize", &self.endpoints.authorize)?,
            token: join("token", &self.endpoints.token)?,
            jwks: join("jwks", &self.endpoints.jwks)?,
            userinfo: join("userinfo", &self.endpoints.userinfo)?,
            end_session: join("end_session", &self.endpoints.end_session)?,
            discovery: join("discovery", &self.endpoints.discovery)?,
        })
    }
}

fn parse_absolute(name: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value).map_err(|e| Error::Config(format!("Invalid {name} '{value}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::Config(format!(
            "{name} must use http or https, got '{other}'"
        ))),
    }
}

/// Provider endpoints resolved against the base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Authorization endpoint
    pub authorize: Url,
    /// Token endpoint
    pub token: Url,
    /// JSON Web Key Set
    pub jwks: Url,
    /// User info endpoint
    pub userinfo: Url,
    /// End-session endpoint
    pub end_session: Url,
    /// OpenID discovery document
    pub discovery: Url,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    fn sample() -> ClientConfig {
        ClientConfig::new(
            "client",
            "secret",
            vec![Scope::OpenId, Scope::Profile],
            "http://localhost:8080/login",
            "http://localhost:8080/callback",
            "https://fcp-low.integ01.dev-franceconnect.fr",
        )
    }

    #[test]
    fn endpoints_resolve_against_base_url() {
        let endpoints = sample().resolve_endpoints().unwrap();
        assert_eq!(
            endpoints.authorize.as_str(),
            "https://fcp-low.integ01.dev-franceconnect.fr/api/v2/authorize"
        );
        assert_eq!(
            endpoints.discovery.as_str(),
            "https://fcp-low.integ01.dev-franceconnect.fr/api/v2/.well-known/openid-configuration"
        );
        assert_eq!(
            endpoints.end_session.as_str(),
            "https://fcp-low.integ01.dev-franceconnect.fr/api/v2/session/end"
        );
    }

    #[test]
    fn absolute_endpoint_path_replaces_base_path() {
        // GIVEN: a base URL that already has a path
        let mut config = sample();
        config.base_url = "https://provider.example/tenant/".to_string();

        // WHEN: endpoints are resolved
        let endpoints = config.resolve_endpoints().unwrap();

        // THEN: absolute paths win over the base path
        assert_eq!(endpoints.token.as_str(), "https://provider.example/api/v2/token");
    }

    #[test]
    fn rejects_malformed_base_url() {
        let mut config = sample();
        config.base_url = "not a url".to_string();
        assert!(matches!(config.resolve_endpoints(), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_non_http_callback() {
        let mut config = sample();
        config.login_callback_url = "ftp://localhost/login".to_string();
        assert!(matches!(config.resolve_endpoints(), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_empty_client_id() {
        let mut config = sample();
        config.client_id = "  ".to_string();
        assert!(matches!(config.resolve_endpoints(), Err(Error::Config(_))));
    }

    #[test]
    fn literal_secret_is_returned_as_is() {
        assert_eq!(sample().resolve_client_secret().unwrap(), "secret");
    }

    #[test]
    fn env_secret_with_unset_variable_fails() {
        let mut config = sample();
        config.client_secret = "env:FRANCE_CONNECT_TEST_SECRET_THAT_IS_NEVER_SET".to_string();
        assert!(matches!(config.resolve_client_secret(), Err(Error::Config(_))));
    }

    #[test]
    fn load_reads_yaml_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r"
client_id: abc
client_secret: s3cret
scopes: [openid, given_name, family_name]
login_callback_url: http://localhost:8080/login
logout_callback_url: http://localhost:8080/logout
base_url: https://fcp-low.integ01.dev-franceconnect.fr
transport:
  timeout: 3s
  verify_tls: false
verification:
  leeway: 30s
"
        )
        .unwrap();

        let config = ClientConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.client_id, "abc");
        assert_eq!(
            config.scopes,
            vec![Scope::OpenId, Scope::GivenName, Scope::FamilyName]
        );
        assert_eq!(config.transport.timeout, Duration::from_secs(3));
        assert!(!config.transport.verify_tls);
        assert!(config.transport.follow_redirects);
        assert_eq!(config.verification.leeway, Duration::from_secs(30));
        assert_eq!(config.verification.jwks_cache_ttl, Duration::from_secs(3600));
        assert_eq!(
            config.verification.jwks_min_refresh_interval,
            Duration::from_secs(30)
        );
        assert_eq!(config.endpoints.userinfo, "/api/v2/userinfo");
    }

    #[test]
    fn load_rejects_unknown_scope() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r"
client_id: abc
client_secret: s3cret
scopes: [openid, address]
login_callback_url: http://localhost:8080/login
logout_callback_url: http://localhost:8080/logout
base_url: https://fcp-low.integ01.dev-franceconnect.fr
"
        )
        .unwrap();

        assert!(matches!(ClientConfig::load(Some(file.path())), Err(Error::Config(_))));
    }

    #[test]
    fn load_missing_file_is_a_config_error() {
        let err = ClientConfig::load(Some(Path::new("/nonexistent/france-connect.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }
}

//! Error types for the FranceConnect client

use jsonwebtoken::errors::ErrorKind;
use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for the FranceConnect client
pub type Result<T> = std::result::Result<T, Error>;

/// FranceConnect client errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (raised at construction, never at call time)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The provider could not be reached or answered with a non-2xx status
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A signed token failed verification
    #[error(transparent)]
    Verification(#[from] VerificationError),
}

impl Error {
    /// The verification failure, if this is one.
    #[must_use]
    pub fn as_verification(&self) -> Option<&VerificationError> {
        match self {
            Self::Verification(e) => Some(e),
            _ => None,
        }
    }

    /// The transport failure, if this is one.
    #[must_use]
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

/// Network or HTTP-level failure talking to a provider endpoint.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be sent or the body could not be read
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        /// Endpoint that was called
        url: String,
        /// Status returned by the provider
        status: StatusCode,
        /// Response body (may be empty)
        body: String,
    },

    /// The response body was not in the expected format
    #[error("Invalid response from {url}: {reason}")]
    Decode {
        /// Endpoint that was called
        url: String,
        /// What was wrong with the body
        reason: String,
    },
}

impl TransportError {
    /// HTTP status carried by this error, when the provider answered at all.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(e) => e.status(),
            Self::Decode { .. } => None,
        }
    }
}

/// Signed-token verification failures.
///
/// No claims are ever returned for a token that produced one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The token is not a well-formed JWS compact serialization
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// The header names an algorithm other than RS256
    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The header carries no `kid`
    #[error("Token header has no 'kid'")]
    MissingKeyId,

    /// No key with this `kid` in the provider's key set, even after a refresh
    #[error("Signing key not found: {0}")]
    KeyNotFound(String),

    /// The key matching `kid` cannot verify RS256 signatures
    #[error("Signing key {0} is not a usable RSA key")]
    UnsupportedKey(String),

    /// Signature does not match the key
    #[error("Invalid token signature")]
    InvalidSignature,

    /// `aud` does not contain the configured client id
    #[error("Token audience does not match the client id")]
    AudienceMismatch,

    /// `iss` does not match the configured issuer
    #[error("Token issuer does not match the configured issuer")]
    IssuerMismatch,

    /// `exp` is in the past
    #[error("Token has expired")]
    Expired,

    /// `nbf` is in the future
    #[error("Token is not valid yet")]
    NotYetValid,

    /// A mandatory claim is absent
    #[error("Token is missing required claim '{0}'")]
    MissingClaim(String),

    /// The token endpoint reply has no `id_token`
    #[error("Token response has no 'id_token'")]
    MissingIdToken,
}

impl From<jsonwebtoken::errors::Error> for VerificationError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidAudience => Self::AudienceMismatch,
            ErrorKind::InvalidIssuer => Self::IssuerMismatch,
            ErrorKind::MissingRequiredClaim(claim) if claim == "aud" => Self::AudienceMismatch,
            ErrorKind::MissingRequiredClaim(claim) => Self::MissingClaim(claim.clone()),
            ErrorKind::InvalidAlgorithm => Self::UnsupportedAlgorithm("mismatched key".to_string()),
            _ => Self::Malformed(e.to_string()),
        }
    }
}

//! Error types for configuration and request rejection.

use http::StatusCode;
use thiserror::Error;

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML or has the wrong shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required secret is not configured.
    #[error("missing secret '{0}' (set it in [secrets] or via the command line)")]
    MissingSecret(&'static str),

    /// Token algorithm is not an HMAC algorithm we accept.
    #[error("unsupported token algorithm '{0}' (expected HS256, HS384 or HS512)")]
    UnsupportedAlgorithm(String),

    /// No token algorithm configured.
    #[error("at least one token algorithm must be configured")]
    NoAlgorithms,

    /// A configured header name is not a valid HTTP header name.
    #[error("invalid header name '{0}'")]
    InvalidHeaderName(String),

    /// A public-route selector could not be parsed.
    #[error("invalid public route selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Why a request was refused by the gate or the signature guard.
///
/// Terminal for the request; never fatal for the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// No API key header.
    #[error("API_KEY is Required")]
    ApiKeyMissing,

    /// API key header does not match the configured key.
    #[error("Invalid KEY, Check API KEY")]
    ApiKeyInvalid,

    /// No bearer credential in the cookie or header.
    #[error("Authorization token is missing")]
    AuthMissing,

    /// The credential did not verify. Carries the verifier's reason for logs.
    #[error("Invalid token")]
    AuthInvalid(String),

    /// The principal's role is not allowed.
    #[error("Access denied")]
    AuthForbidden,

    /// No signature header.
    #[error("Signature is required")]
    SignatureMissing,

    /// Signature header present but blank.
    #[error("Signature can't be empty or null")]
    SignatureEmpty,

    /// Signature did not match the request.
    #[error("Invalid signature")]
    SignatureInvalid,
}

impl Rejection {
    /// Stable taxonomy code, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::ApiKeyMissing => "API_KEY_MISSING",
            Rejection::ApiKeyInvalid => "API_KEY_INVALID",
            Rejection::AuthMissing => "AUTH_MISSING",
            Rejection::AuthInvalid(_) => "AUTH_INVALID",
            Rejection::AuthForbidden => "AUTH_FORBIDDEN",
            Rejection::SignatureMissing => "SIGNATURE_MISSING",
            Rejection::SignatureEmpty => "SIGNATURE_EMPTY",
            Rejection::SignatureInvalid => "SIGNATURE_INVALID",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::ApiKeyMissing => StatusCode::NOT_FOUND,
            Rejection::ApiKeyInvalid | Rejection::AuthInvalid(_) | Rejection::AuthForbidden => {
                StatusCode::UNAUTHORIZED
            }
            Rejection::AuthMissing
            | Rejection::SignatureMissing
            | Rejection::SignatureEmpty
            | Rejection::SignatureInvalid => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message. Never includes the verifier's reason.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

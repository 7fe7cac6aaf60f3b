//! `ravelin.toml` configuration.

use std::fmt;
use std::path::Path;

use http::HeaderName;
use jsonwebtoken::Algorithm;
use ravelin_telemetry::TelemetryConfig;
use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RavelinConfig {
    pub secrets: SecretsConfig,
    pub auth: AuthConfig,
    pub signing: SigningConfig,
    pub public: PublicConfig,
    pub api_key: ApiKeyConfig,
    pub telemetry: TelemetryConfig,
}

/// Shared secrets. Usually supplied through the environment instead.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// Default HMAC key for request signatures.
    pub app_secret: Option<String>,
    /// HMAC key bearer tokens are signed with.
    pub token_secret: Option<String>,
    /// Key clients present in the API-key header.
    pub api_key: Option<String>,
}

impl fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &Option<String>| s.as_ref().map(|_| "<redacted>");
        f.debug_struct("SecretsConfig")
            .field("app_secret", &redact(&self.app_secret))
            .field("token_secret", &redact(&self.token_secret))
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

/// Bearer credential channel and role policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Header carrying the credential.
    pub header: String,
    /// Cookie field carrying the credential, checked before the header.
    pub cookie: Option<String>,
    /// Scheme tag stripped from the credential (`Bearer`, `JWT`, ...).
    pub scheme: String,
    /// Accepted token algorithms.
    pub algorithms: Vec<String>,
    /// Roles admitted on non-public routes. Empty disables the check.
    pub allowed_roles: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            header: "authorization".to_string(),
            cookie: Some("access_token".to_string()),
            scheme: "Bearer".to_string(),
            algorithms: vec!["HS256".to_string()],
            allowed_roles: Vec::new(),
        }
    }
}

/// Where the signing secret for a request comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretScope {
    /// One process-wide application secret.
    #[default]
    Application,
    /// A claim of the authenticated principal, falling back to the application secret.
    Principal,
}

/// Request-signature settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Header carrying the hex signature.
    pub header: String,
    /// Scheme used to rebuild absolute URLs from the Host header.
    pub scheme: String,
    pub secret_scope: SecretScope,
    /// Claim holding the per-principal secret.
    pub principal_secret_claim: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            header: "x-signature".to_string(),
            scheme: "http".to_string(),
            secret_scope: SecretScope::Application,
            principal_secret_claim: "uid".to_string(),
        }
    }
}

/// Routes exempt from authentication.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PublicConfig {
    /// `METHOD /template` or `* /template`.
    pub routes: Vec<String>,
    /// Handler names.
    pub handlers: Vec<String>,
    /// Handler groups.
    pub groups: Vec<String>,
}

/// Client API-key check, run before the gate.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiKeyConfig {
    pub enabled: bool,
    /// Header carrying the key.
    pub header: String,
}

impl Default for ApiKeyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            header: "api_key".to_string(),
        }
    }
}

impl RavelinConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate config text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: RavelinConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that can be checked without secrets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth.algorithms()?;
        header_name(&self.auth.header)?;
        header_name(&self.signing.header)?;
        header_name(&self.api_key.header)?;
        Ok(())
    }

    pub fn with_app_secret(mut self, secret: Option<String>) -> Self {
        if secret.is_some() {
            self.secrets.app_secret = secret;
        }
        self
    }

    pub fn with_token_secret(mut self, secret: Option<String>) -> Self {
        if secret.is_some() {
            self.secrets.token_secret = secret;
        }
        self
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        if key.is_some() {
            self.secrets.api_key = key;
        }
        self
    }

    pub fn app_secret(&self) -> Result<&str, ConfigError> {
        non_empty(&self.secrets.app_secret).ok_or(ConfigError::MissingSecret("app_secret"))
    }

    pub fn token_secret(&self) -> Result<&str, ConfigError> {
        non_empty(&self.secrets.token_secret).ok_or(ConfigError::MissingSecret("token_secret"))
    }

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        non_empty(&self.secrets.api_key).ok_or(ConfigError::MissingSecret("api_key"))
    }
}

impl AuthConfig {
    /// Parsed token algorithms. Only HMAC algorithms are accepted.
    pub fn algorithms(&self) -> Result<Vec<Algorithm>, ConfigError> {
        if self.algorithms.is_empty() {
            return Err(ConfigError::NoAlgorithms);
        }
        self.algorithms
            .iter()
            .map(|name| match name.to_uppercase().as_str() {
                "HS256" => Ok(Algorithm::HS256),
                "HS384" => Ok(Algorithm::HS384),
                "HS512" => Ok(Algorithm::HS512),
                _ => Err(ConfigError::UnsupportedAlgorithm(name.clone())),
            })
            .collect()
    }
}

/// Parse a configured header name.
pub fn header_name(name: &str) -> Result<HeaderName, ConfigError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ConfigError::InvalidHeaderName(name.to_string()))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

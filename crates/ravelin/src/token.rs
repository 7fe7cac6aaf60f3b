//! Bearer token verification (HMAC-signed JWTs).

use std::collections::HashMap;
use std::fmt;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::AuthConfig;
use crate::error::ConfigError;

/// Claims of an authenticated caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    #[serde(
        default,
        deserialize_with = "scalar_claim",
        skip_serializing_if = "Option::is_none"
    )]
    pub sub: Option<String>,

    /// Caller id; doubles as the per-principal signing secret.
    #[serde(
        default,
        deserialize_with = "scalar_claim",
        skip_serializing_if = "Option::is_none"
    )]
    pub uid: Option<String>,

    #[serde(
        default,
        deserialize_with = "scalar_claim",
        skip_serializing_if = "Option::is_none"
    )]
    pub role: Option<String>,

    /// All other claims.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Strings pass through; numbers and booleans are stringified. Other shapes
/// count as absent.
fn scalar_claim<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| scalar_to_string(&v)))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl Principal {
    /// A claim as a string. Numbers and booleans are stringified.
    pub fn claim(&self, name: &str) -> Option<String> {
        match name {
            "sub" => self.sub.clone(),
            "uid" => self.uid.clone(),
            "role" => self.role.clone(),
            _ => scalar_to_string(self.extra.get(name)?),
        }
    }

    /// Case-insensitive role check. An empty allow-list admits everyone.
    pub fn has_role(&self, allowed: &[String]) -> bool {
        if allowed.is_empty() {
            return true;
        }
        match self.role.as_deref() {
            Some(role) => allowed.iter().any(|a| a.eq_ignore_ascii_case(role)),
            None => false,
        }
    }
}

/// Verifies bearer tokens against a shared secret.
///
/// `exp` and `nbf` are enforced when present; no claim is required.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// `algorithms` must not be empty.
    pub fn new(secret: &[u8], algorithms: &[Algorithm]) -> Self {
        let default_alg = algorithms.first().copied().unwrap_or(Algorithm::HS256);
        let mut validation = Validation::new(default_alg);
        validation.algorithms = algorithms.to_vec();
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn from_config(auth: &AuthConfig, secret: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(secret.as_bytes(), &auth.algorithms()?))
    }

    pub fn verify(&self, token: &str) -> Result<Principal, jsonwebtoken::errors::Error> {
        Ok(decode::<Principal>(token, &self.key, &self.validation)?.claims)
    }
}

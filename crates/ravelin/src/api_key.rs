//! Client API-key guard.
//!
//! Runs ahead of the gate on every request. A request passes only when the
//! API-key header carries the configured key; the key then becomes the
//! request's [`ClientSecret`], the signing secret used when the gate derives
//! no per-principal one.

use std::fmt;

use http::{HeaderName, Request};
use ravelin_telemetry::log_request_rejected;

use crate::config::{header_name, RavelinConfig};
use crate::error::{ConfigError, Rejection};

/// Attached to requests that presented a valid API key.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSecret(pub Vec<u8>);

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(<redacted>)")
    }
}

/// Checks the API-key header against the configured key.
#[derive(Clone)]
pub struct ApiKeyGuard {
    header: HeaderName,
    key: Vec<u8>,
}

impl fmt::Debug for ApiKeyGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyGuard")
            .field("header", &self.header)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl ApiKeyGuard {
    pub fn new(header: HeaderName, key: impl Into<Vec<u8>>) -> Self {
        Self {
            header,
            key: key.into(),
        }
    }

    /// Build from configuration. Requires the `api_key` secret.
    pub fn from_config(config: &RavelinConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            header_name(&config.api_key.header)?,
            config.api_key()?.as_bytes(),
        ))
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Check one request. On success the key is attached as a [`ClientSecret`].
    pub fn check<B>(&self, req: &mut Request<B>) -> Result<(), Rejection> {
        let result = self.verify(req);
        match &result {
            Ok(()) => {
                req.extensions_mut().insert(ClientSecret(self.key.clone()));
            }
            Err(rejection) => {
                log_request_rejected!(
                    method = req.method().as_str(),
                    path = req.uri().path(),
                    kind = rejection.kind(),
                    status = rejection.status().as_u16()
                );
            }
        }
        result
    }

    fn verify<B>(&self, req: &Request<B>) -> Result<(), Rejection> {
        let presented = req
            .headers()
            .get(&self.header)
            .map(|v| v.as_bytes().trim_ascii())
            .filter(|v| !v.is_empty())
            .ok_or(Rejection::ApiKeyMissing)?;

        if fixed_time_eq(presented, &self.key) {
            Ok(())
        } else {
            Err(Rejection::ApiKeyInvalid)
        }
    }
}

/// Byte equality whose timing depends only on the lengths.
fn fixed_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

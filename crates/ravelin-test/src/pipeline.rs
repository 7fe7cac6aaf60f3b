//! TestPipeline: the API-key guard, gate and signature guard wired from
//! fixture files.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use http::Request;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ravelin_lib::{
    Admission, ApiKeyGuard, ConfigError, Gate, RavelinConfig, Rejection, SignatureGuard,
};
use ravelin_routes::{load_tree, Registry, RouteError};
use ravelin_signing::{SigningContext, SigningError};
use serde_json::Value;
use thiserror::Error;

/// Token secret every harness is configured with.
pub const TOKEN_SECRET: &str = "test-token-secret";

/// Application secret every harness is configured with.
pub const APP_SECRET: &str = "test-app-secret";

/// Client API key every harness is configured with.
pub const API_KEY: &str = "test-api-key";

/// Errors from TestPipeline operations.
#[derive(Debug, Error)]
pub enum TestError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("route tree error: {0}")]
    Routes(#[from] RouteError),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),
}

/// Absolute path to the shared test fixtures directory.
pub fn fixtures() -> PathBuf {
    // CARGO_MANIFEST_DIR = .../crates/ravelin-test
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("crates/")
        .parent()
        .expect("workspace root")
        .join("tests/fixtures")
}

/// Gate plus signature guard built from a route tree and a config file.
/// The API-key guard runs first when the config enables it.
pub struct TestPipeline {
    api_key: Option<ApiKeyGuard>,
    gate: Gate,
    guard: SignatureGuard,
}

impl TestPipeline {
    /// Build from fixture file names, injecting the test secrets.
    pub fn from_fixtures(tree: &str, config: &str) -> Result<Self, TestError> {
        let config = RavelinConfig::load(&fixtures().join(config))?
            .with_token_secret(Some(TOKEN_SECRET.to_string()))
            .with_app_secret(Some(APP_SECRET.to_string()))
            .with_api_key(Some(API_KEY.to_string()));
        let registry = Arc::new(Registry::build(&load_tree(&fixtures().join(tree))?));
        let api_key = if config.api_key.enabled {
            Some(ApiKeyGuard::from_config(&config)?)
        } else {
            None
        };

        Ok(Self {
            api_key,
            gate: Gate::from_config(registry, &config)?,
            guard: SignatureGuard::from_config(&config)?,
        })
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Mint an HS256 token with the test token secret.
    pub fn token(&self, claims: Value) -> Result<String, TestError> {
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TOKEN_SECRET.as_bytes()),
        )?)
    }

    /// Sign a request the way a client would.
    pub fn sign(
        &self,
        secret: &str,
        method: &str,
        url: &str,
        body: Option<&Value>,
    ) -> Result<String, TestError> {
        let mut ctx = SigningContext::new(method, url);
        if let Some(body) = body {
            ctx = ctx.with_body(body);
        }
        Ok(ravelin_signing::sign(secret.as_bytes(), &ctx)?)
    }

    /// Run the API-key guard and the gate.
    pub fn authorize(&self, req: &mut Request<Bytes>) -> Result<Admission, Rejection> {
        if let Some(api_key) = &self.api_key {
            api_key.check(req)?;
        }
        self.gate.evaluate(req)
    }

    /// Run the API-key guard and the gate, then the signature guard.
    pub fn authorize_signed(&self, req: &mut Request<Bytes>) -> Result<Admission, Rejection> {
        let admission = self.authorize(req)?;
        self.guard.check(req)?;
        Ok(admission)
    }
}

//! Request-signature guard, run after the gate on signed routes.

use http::{HeaderName, Method, Request};
use ravelin_signing::{SignatureEngine, SigningContext};
use ravelin_telemetry::log_signature_rejected;
use serde_json::Value;

use crate::api_key::ClientSecret;
use crate::config::{header_name, RavelinConfig};
use crate::error::{ConfigError, Rejection};
use crate::gate::AuthContext;

/// Checks the signature header against the live request.
#[derive(Debug, Clone)]
pub struct SignatureGuard {
    engine: SignatureEngine,
    header: HeaderName,
    scheme: String,
}

impl SignatureGuard {
    pub fn new(engine: SignatureEngine, header: HeaderName, scheme: impl Into<String>) -> Self {
        Self {
            engine,
            header,
            scheme: scheme.into(),
        }
    }

    /// Build from configuration. Requires the application secret.
    pub fn from_config(config: &RavelinConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            SignatureEngine::new(config.app_secret()?),
            header_name(&config.signing.header)?,
            config.signing.scheme.clone(),
        ))
    }

    /// Verify the request's signature.
    ///
    /// The secret is the principal's when the gate derived one, then the
    /// client's API key when one was accepted, otherwise the application
    /// secret. GET bodies are never signed.
    pub fn check<B: AsRef<[u8]>>(&self, req: &Request<B>) -> Result<(), Rejection> {
        let result = self.verify(req);
        if let Err(rejection) = &result {
            log_signature_rejected!(
                method = req.method().as_str(),
                path = req.uri().path(),
                kind = rejection.kind()
            );
        }
        result
    }

    fn verify<B: AsRef<[u8]>>(&self, req: &Request<B>) -> Result<(), Rejection> {
        let candidate = req
            .headers()
            .get(&self.header)
            .ok_or(Rejection::SignatureMissing)?
            .to_str()
            .map_err(|_| Rejection::SignatureInvalid)?
            .trim();
        if candidate.is_empty() {
            return Err(Rejection::SignatureEmpty);
        }

        let body = request_body(req)?;
        let url = self.canonical_url(req);
        let mut ctx = SigningContext::new(req.method().as_str(), &url);
        if let Some(body) = &body {
            ctx = ctx.with_body(body);
        }

        let extensions = req.extensions();
        let secret = extensions
            .get::<AuthContext>()
            .and_then(|auth| auth.signing_secret.as_deref())
            .or_else(|| extensions.get::<ClientSecret>().map(|c| c.0.as_slice()));

        match self.engine.verify_with(candidate, secret, &ctx) {
            Ok(true) => Ok(()),
            Ok(false) => Err(Rejection::SignatureInvalid),
            Err(e) => {
                tracing::debug!(error = %e, "signature verification failed");
                Err(Rejection::SignatureInvalid)
            }
        }
    }

    /// The URL the client signed.
    ///
    /// Absolute request URIs are used as-is; otherwise the URL is rebuilt
    /// from the configured scheme and the Host header.
    pub fn canonical_url<B>(&self, req: &Request<B>) -> String {
        let uri = req.uri();
        if uri.scheme().is_some() && uri.authority().is_some() {
            return uri.to_string();
        }

        let path = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());
        match req
            .headers()
            .get(http::header::HOST)
            .and_then(|h| h.to_str().ok())
        {
            Some(host) => format!("{}://{}{}", self.scheme, host, path),
            None => path.to_string(),
        }
    }
}

/// JSON body for non-GET requests. Empty bodies are absent.
fn request_body<B: AsRef<[u8]>>(req: &Request<B>) -> Result<Option<Value>, Rejection> {
    let bytes = req.body().as_ref();
    if req.method() == Method::GET || bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes).map(Some).map_err(|e| {
        tracing::debug!(error = %e, "request body is not JSON");
        Rejection::SignatureInvalid
    })
}

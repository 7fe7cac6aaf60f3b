//! Authorization gate.
//!
//! Per request: resolve the route, admit public routes outright, otherwise
//! require a valid bearer token with an allowed role. Admitted requests
//! carry an [`AuthContext`] in their extensions for later pipeline steps.

use std::sync::Arc;

use http::header::COOKIE;
use http::{HeaderMap, HeaderName, Request};
use ravelin_routes::{Registry, RouteMatch};
use ravelin_telemetry::{log_request_admitted, log_request_rejected};

use crate::config::{header_name, RavelinConfig, SecretScope};
use crate::error::{ConfigError, Rejection};
use crate::public::{PublicMarker, PublicRoutes, RouteKey};
use crate::token::{Principal, TokenVerifier};

/// Attached to admitted, authenticated requests.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub principal: Principal,
    /// Per-principal signing secret, when one was derived.
    pub signing_secret: Option<Vec<u8>>,
}

/// Attached to every request that resolved to a registered route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute {
    pub key: RouteKey,
    /// Raw parameter bindings in template order.
    pub params: Vec<(String, String)>,
}

/// Why a request was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Route is marked public; no credential was checked.
    Public,
    /// A valid token with an allowed role was presented.
    Authenticated,
}

/// Credential channel and role policy.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    pub header: HeaderName,
    pub cookie: Option<String>,
    pub scheme: String,
    pub allowed_roles: Vec<String>,
    pub secret_scope: SecretScope,
    pub principal_secret_claim: String,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            header: http::header::AUTHORIZATION,
            cookie: None,
            scheme: "Bearer".to_string(),
            allowed_roles: Vec::new(),
            secret_scope: SecretScope::Application,
            principal_secret_claim: "uid".to_string(),
        }
    }
}

impl AuthPolicy {
    pub fn from_config(config: &RavelinConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            header: header_name(&config.auth.header)?,
            cookie: config.auth.cookie.clone().filter(|c| !c.is_empty()),
            scheme: config.auth.scheme.clone(),
            allowed_roles: config.auth.allowed_roles.clone(),
            secret_scope: config.signing.secret_scope,
            principal_secret_claim: config.signing.principal_secret_claim.clone(),
        })
    }

    /// Find the bearer credential: cookie field first, then header.
    ///
    /// The scheme tag is stripped when present; blank values count as absent.
    pub fn credential<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        let from_cookie = self
            .cookie
            .as_deref()
            .and_then(|name| cookie_value(headers, name));
        let raw = from_cookie.or_else(|| headers.get(&self.header)?.to_str().ok())?;

        let token = strip_scheme(raw.trim(), &self.scheme).trim();
        (!token.is_empty()).then_some(token)
    }
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.trim().is_empty())
        .map(|(_, value)| value.trim())
}

fn strip_scheme<'a>(value: &'a str, scheme: &str) -> &'a str {
    if scheme.is_empty() {
        return value;
    }
    match value.get(..scheme.len()) {
        Some(prefix)
            if prefix.eq_ignore_ascii_case(scheme)
                && value[scheme.len()..].starts_with(' ') =>
        {
            &value[scheme.len() + 1..]
        }
        Some(prefix) if prefix.eq_ignore_ascii_case(scheme) && value.len() == scheme.len() => "",
        _ => value,
    }
}

/// Admits or rejects requests against a shared, immutable registry.
#[derive(Debug, Clone)]
pub struct Gate {
    registry: Arc<Registry>,
    public: PublicRoutes,
    verifier: TokenVerifier,
    policy: AuthPolicy,
}

impl Gate {
    pub fn new(
        registry: Arc<Registry>,
        public: PublicRoutes,
        verifier: TokenVerifier,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            registry,
            public,
            verifier,
            policy,
        }
    }

    /// Build the gate from configuration. Requires the token secret.
    pub fn from_config(
        registry: Arc<Registry>,
        config: &RavelinConfig,
    ) -> Result<Self, ConfigError> {
        let verifier = TokenVerifier::from_config(&config.auth, config.token_secret()?)?;
        let public = PublicMarker::from_config(&config.public)?.freeze(&registry);
        let policy = AuthPolicy::from_config(config)?;
        Ok(Self::new(registry, public, verifier, policy))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn public_routes(&self) -> &PublicRoutes {
        &self.public
    }

    /// Evaluate one request.
    pub fn evaluate<B>(&self, req: &mut Request<B>) -> Result<Admission, Rejection> {
        let result = self.decide(req);

        let method = req.method().as_str();
        let path = req.uri().path();
        match &result {
            Ok(admission) => {
                log_request_admitted!(method, path, admission = ?admission);
            }
            Err(rejection) => {
                log_request_rejected!(
                    method,
                    path,
                    kind = rejection.kind(),
                    status = rejection.status().as_u16(),
                    reason = %rejection_reason(rejection)
                );
            }
        }
        result
    }

    fn decide<B>(&self, req: &mut Request<B>) -> Result<Admission, Rejection> {
        let matched = match self.registry.lookup(req.uri().path()) {
            RouteMatch::Found { endpoint, params } => Some(MatchedRoute {
                key: RouteKey::new(req.method().as_str(), endpoint.path.clone()),
                params,
            }),
            RouteMatch::NotFound => None,
        };

        let public = matched
            .as_ref()
            .is_some_and(|m| self.public.is_public(&m.key));
        if let Some(matched) = matched {
            req.extensions_mut().insert(matched);
        }
        if public {
            return Ok(Admission::Public);
        }

        let token = self
            .policy
            .credential(req.headers())
            .ok_or(Rejection::AuthMissing)?;
        let principal = self
            .verifier
            .verify(token)
            .map_err(|e| Rejection::AuthInvalid(e.to_string()))?;

        if !principal.has_role(&self.policy.allowed_roles) {
            return Err(Rejection::AuthForbidden);
        }

        let signing_secret = match self.policy.secret_scope {
            SecretScope::Application => None,
            SecretScope::Principal => principal
                .claim(&self.policy.principal_secret_claim)
                .filter(|s| !s.is_empty())
                .map(String::into_bytes),
        };

        req.extensions_mut().insert(AuthContext {
            principal,
            signing_secret,
        });
        Ok(Admission::Authenticated)
    }
}

fn rejection_reason(rejection: &Rejection) -> &str {
    match rejection {
        Rejection::AuthInvalid(reason) => reason,
        _ => "",
    }
}

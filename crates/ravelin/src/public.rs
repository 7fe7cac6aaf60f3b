//! Public-route marking.
//!
//! Routes are marked by explicit selectors at startup, then resolved against
//! the registry into a frozen set of [`RouteKey`]s the gate consults per
//! request.

use std::collections::HashSet;
use std::fmt;

use ravelin_routes::{EndpointKind, HandlerRef, PathTemplate, Registry};

use crate::config::PublicConfig;
use crate::error::ConfigError;

/// Method wildcard in a [`RouteKey`].
pub const ANY_METHOD: &str = ravelin_routes::walker::ANY_METHOD;

/// Stable identity of a route: method plus path template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub method: String,
    pub template: String,
}

impl RouteKey {
    pub fn new(method: &str, template: impl Into<String>) -> Self {
        Self {
            method: method.to_uppercase(),
            template: template.into(),
        }
    }

    /// Key matching every method on `template`.
    pub fn any(template: impl Into<String>) -> Self {
        Self::new(ANY_METHOD, template)
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.template)
    }
}

/// One way of naming routes to mark public.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicSelector {
    /// A template, optionally restricted to one method.
    Route {
        method: Option<String>,
        template: String,
    },
    /// Every method and path whose first handler has this name.
    Handler(String),
    /// Every method and path whose first handler is in this group.
    Group(String),
}

impl PublicSelector {
    /// Parse `GET /health` or `* /auth/login`.
    pub fn route(selector: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        };

        let (method, path) = selector
            .trim()
            .split_once(char::is_whitespace)
            .ok_or_else(|| invalid("expected 'METHOD /path'"))?;
        let path = path.trim();
        if !path.starts_with('/') {
            return Err(invalid("path must start with '/'"));
        }
        if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic() || c == '*') {
            return Err(invalid("method must be a verb or '*'"));
        }

        let template = PathTemplate::parse(path).map_err(|e| invalid(&e.to_string()))?;
        let method = (method != ANY_METHOD).then(|| method.to_uppercase());

        Ok(PublicSelector::Route {
            method,
            template: template.to_string(),
        })
    }

    pub fn handler(name: impl Into<String>) -> Self {
        PublicSelector::Handler(name.into())
    }

    pub fn group(name: impl Into<String>) -> Self {
        PublicSelector::Group(name.into())
    }
}

/// Collects selectors before the registry is available.
#[derive(Debug, Clone, Default)]
pub struct PublicMarker {
    selectors: Vec<PublicSelector>,
}

impl PublicMarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[public]` config table.
    pub fn from_config(config: &PublicConfig) -> Result<Self, ConfigError> {
        let mut marker = Self::new();
        for route in &config.routes {
            marker.mark(PublicSelector::route(route)?);
        }
        for handler in &config.handlers {
            marker.mark(PublicSelector::handler(handler));
        }
        for group in &config.groups {
            marker.mark(PublicSelector::group(group));
        }
        Ok(marker)
    }

    pub fn mark(&mut self, selector: PublicSelector) -> &mut Self {
        self.selectors.push(selector);
        self
    }

    /// Resolve every selector against the registry.
    pub fn freeze(&self, registry: &Registry) -> PublicRoutes {
        let mut keys = HashSet::new();

        for selector in &self.selectors {
            let before = keys.len();
            match selector {
                PublicSelector::Route { method, template } => {
                    if registry.endpoint(template).is_none() {
                        tracing::warn!(route = %template, "public route is not registered");
                    }
                    let method = method.as_deref().unwrap_or(ANY_METHOD);
                    keys.insert(RouteKey::new(method, template.clone()));
                }
                PublicSelector::Handler(name) => {
                    keys.extend(handler_keys(registry, |h| {
                        h.name.as_deref() == Some(name.as_str())
                    }));
                }
                PublicSelector::Group(group) => {
                    keys.extend(handler_keys(registry, |h| {
                        h.group.as_deref() == Some(group.as_str())
                    }));
                }
            }
            if keys.len() == before {
                tracing::debug!(selector = ?selector, "public selector added no routes");
            }
        }

        PublicRoutes { keys }
    }
}

fn handler_keys<'a>(
    registry: &'a Registry,
    matches: impl Fn(&HandlerRef) -> bool + 'a,
) -> impl Iterator<Item = RouteKey> + 'a {
    registry
        .method_handlers()
        .filter(move |(_, _, handler)| matches(*handler))
        .filter(move |(_, path, _)| {
            registry
                .endpoint(path)
                .is_some_and(|e| e.kind == EndpointKind::Route && !e.is_opaque())
        })
        .map(|(method, path, _)| RouteKey::new(method, path))
}

/// Frozen set of public routes.
#[derive(Debug, Clone, Default)]
pub struct PublicRoutes {
    keys: HashSet<RouteKey>,
}

impl PublicRoutes {
    /// True if `key` or its any-method form is marked.
    pub fn is_public(&self, key: &RouteKey) -> bool {
        self.keys.contains(key) || self.keys.contains(&RouteKey::any(key.template.clone()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &RouteKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

//! Endpoint registry and route matcher.
//!
//! Built once at startup from a walked tree; read-only afterwards and shared
//! across request handlers without locking.

use std::collections::HashMap;

use ravelin_telemetry::{log_route_decode_opaque, log_routes_registered};

use crate::layer::{HandlerRef, Layer};
use crate::template::PathTemplate;
use crate::walker::{EndpointKind, EndpointRecord, RouteTable, Walker};

/// A parameterised route in registration order.
#[derive(Debug)]
struct DynamicRoute {
    template: PathTemplate,
    endpoint: usize,
}

/// The result of a route lookup.
#[derive(Debug)]
pub enum RouteMatch<'a> {
    /// Matched an endpoint; `params` holds the bindings in template order.
    Found {
        endpoint: &'a EndpointRecord,
        params: Vec<(String, String)>,
    },
    /// No endpoint accepts the path.
    NotFound,
}

impl RouteMatch<'_> {
    pub fn is_found(&self) -> bool {
        matches!(self, RouteMatch::Found { .. })
    }
}

/// Static and dynamic endpoint indices.
#[derive(Debug, Default)]
pub struct Registry {
    endpoints: Vec<EndpointRecord>,
    /// Exact path to endpoint index.
    static_index: HashMap<String, usize>,
    /// Parameterised templates, earliest registration first.
    dynamic_index: Vec<DynamicRoute>,
    /// Endpoints listed but never matched.
    opaque: Vec<usize>,
    handlers: HashMap<String, HandlerRef>,
    method_handlers: HashMap<(String, String), HandlerRef>,
}

impl Registry {
    /// Walk a routing tree and index every endpoint.
    pub fn build(tree: &[Layer]) -> Self {
        Self::from_table(Walker::walk(tree))
    }

    /// Index the output of a walk.
    pub fn from_table(table: RouteTable) -> Self {
        let mut registry = Registry {
            handlers: table.handlers,
            method_handlers: table.method_handlers,
            ..Registry::default()
        };

        for endpoint in table.endpoints {
            registry.register(endpoint);
        }

        log_routes_registered!(
            endpoints = registry.endpoints.len(),
            static_routes = registry.static_index.len(),
            dynamic_routes = registry.dynamic_index.len(),
            opaque_routes = registry.opaque.len()
        );

        registry
    }

    fn register(&mut self, endpoint: EndpointRecord) {
        let index = self.endpoints.len();

        if endpoint.kind == EndpointKind::Route {
            if endpoint.is_opaque() {
                self.opaque.push(index);
            } else {
                match PathTemplate::parse(&endpoint.path) {
                    Ok(template) if template.has_params() => {
                        self.dynamic_index.push(DynamicRoute {
                            template,
                            endpoint: index,
                        });
                    }
                    Ok(template) => {
                        self.static_index
                            .entry(template.to_string())
                            .or_insert(index);
                    }
                    Err(e) => {
                        log_route_decode_opaque!(path = %endpoint.path, error = %e);
                        self.opaque.push(index);
                    }
                }
            }
        }

        self.endpoints.push(endpoint);
    }

    /// Resolve a request path.
    ///
    /// Exact static lookup first, then dynamic templates in registration
    /// order; the first acceptor wins.
    pub fn lookup(&self, path: &str) -> RouteMatch<'_> {
        let normalized = normalize_path(path);

        if let Some(&index) = self.static_index.get(&normalized) {
            return RouteMatch::Found {
                endpoint: &self.endpoints[index],
                params: Vec::new(),
            };
        }

        let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
        for route in &self.dynamic_index {
            if let Some(params) = route.template.bind(&segments) {
                return RouteMatch::Found {
                    endpoint: &self.endpoints[route.endpoint],
                    params,
                };
            }
        }

        RouteMatch::NotFound
    }

    /// All endpoints in registration order, for diagnostics.
    pub fn endpoints(&self) -> &[EndpointRecord] {
        &self.endpoints
    }

    /// Look up an endpoint by its path template.
    pub fn endpoint(&self, path: &str) -> Option<&EndpointRecord> {
        self.endpoints.iter().find(|e| e.path == path)
    }

    /// First handler registered for a path template.
    pub fn handler_for(&self, path: &str) -> Option<&HandlerRef> {
        self.handlers.get(path)
    }

    /// First handler registered for `method` on a path template.
    ///
    /// `method` is uppercase, or `*` for layers that accept every verb.
    pub fn handler_for_method(&self, method: &str, path: &str) -> Option<&HandlerRef> {
        self.method_handlers
            .get(&(method.to_string(), path.to_string()))
    }

    /// Every `(method, template, handler)` triple, in no particular order.
    pub fn method_handlers(&self) -> impl Iterator<Item = (&str, &str, &HandlerRef)> {
        self.method_handlers
            .iter()
            .map(|((method, path), handler)| (method.as_str(), path.as_str(), handler))
    }

    pub fn static_routes(&self) -> impl Iterator<Item = &EndpointRecord> {
        let mut indices: Vec<usize> = self.static_index.values().copied().collect();
        indices.sort_unstable();
        indices.into_iter().map(move |i| &self.endpoints[i])
    }

    pub fn dynamic_routes(&self) -> impl Iterator<Item = &EndpointRecord> {
        self.dynamic_index
            .iter()
            .map(move |route| &self.endpoints[route.endpoint])
    }

    pub fn opaque_routes(&self) -> impl Iterator<Item = &EndpointRecord> {
        self.opaque.iter().map(move |&i| &self.endpoints[i])
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Normalize a request path: strip trailing slashes, collapse double slashes.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    let mut prev_slash = false;

    for ch in path.chars() {
        if ch == '/' {
            if !prev_slash {
                normalized.push('/');
            }
            prev_slash = true;
        } else {
            normalized.push(ch);
            prev_slash = false;
        }
    }

    // Strip trailing slash (but keep root "/")
    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }

    if normalized.is_empty() {
        "/".to_string()
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{CompiledMatcher, MountLayer, RouteLayer, RoutePath};

    fn route(path: &str, methods: &[&str]) -> Layer {
        Layer::Route(RouteLayer {
            path: Some(RoutePath::Single(path.to_string())),
            matcher: None,
            methods: methods.iter().map(|m| m.to_string()).collect(),
            handlers: vec![HandlerRef::named("handler")],
        })
    }

    fn compiled_route(source: &str, keys: &[&str], methods: &[&str]) -> Layer {
        Layer::Route(RouteLayer {
            path: None,
            matcher: Some(CompiledMatcher::new(source).with_keys(keys.iter().copied())),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            handlers: vec![],
        })
    }

    fn found<'a>(m: RouteMatch<'a>) -> (&'a EndpointRecord, Vec<(String, String)>) {
        match m {
            RouteMatch::Found { endpoint, params } => (endpoint, params),
            RouteMatch::NotFound => panic!("expected Found"),
        }
    }

    // === Normalization tests ===

    #[test]
    fn normalize_strips_trailing_slash() {
        assert_eq!(normalize_path("/users/"), "/users");
    }

    #[test]
    fn normalize_collapses_double_slashes() {
        assert_eq!(normalize_path("/users//123"), "/users/123");
    }

    #[test]
    fn normalize_preserves_root() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
    }

    // === Registration tests ===

    #[test]
    fn indices_are_disjoint_by_param_presence() {
        let registry = Registry::build(&[
            route("/users", &["post"]),
            route("/users/:id", &["get"]),
            route("/health", &["get"]),
        ]);

        let statics: Vec<&str> = registry.static_routes().map(|e| e.path.as_str()).collect();
        let dynamics: Vec<&str> = registry.dynamic_routes().map(|e| e.path.as_str()).collect();
        assert_eq!(statics, vec!["/users", "/health"]);
        assert_eq!(dynamics, vec!["/users/:id"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn opaque_routes_are_listed_but_unmatchable() {
        let registry = Registry::build(&[compiled_route(r"^\/img\/.*\.png$", &[], &["get"])]);

        assert_eq!(registry.endpoints().len(), 1);
        assert_eq!(registry.opaque_routes().count(), 1);
        assert!(!registry.lookup("/img/a.png").is_found());
    }

    #[test]
    fn placeholders_are_listed_but_unmatchable() {
        let registry = Registry::build(&[Layer::Mount(MountLayer {
            name: Some("mounted_app".into()),
            matcher: CompiledMatcher::new(r"^\/legacy\/?(?=\/|$)"),
            stack: None,
        })]);

        assert_eq!(registry.endpoints()[0].path, "/legacy");
        assert!(!registry.lookup("/legacy").is_found());
    }

    // === Matching tests ===

    #[test]
    fn users_scenario() {
        let registry = Registry::build(&[
            compiled_route(r"^\/users\/(?:([^\/]+?))\/?$", &["id"], &["get"]),
            compiled_route(r"^\/users\/?$", &[], &["post"]),
        ]);

        let templates: Vec<&str> = registry.endpoints().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(templates, vec!["/users/:id", "/users"]);

        let (endpoint, params) = found(registry.lookup("/users/42"));
        assert_eq!(endpoint.path, "/users/:id");
        assert_eq!(endpoint.methods, vec!["GET"]);
        assert_eq!(params, vec![("id".to_string(), "42".to_string())]);

        let (endpoint, params) = found(registry.lookup("/users"));
        assert_eq!(endpoint.methods, vec!["POST"]);
        assert!(params.is_empty());

        assert!(!registry.lookup("/users/42/extra").is_found());
    }

    #[test]
    fn static_wins_over_dynamic() {
        let registry = Registry::build(&[
            route("/users/:id", &["get"]),
            route("/users/me", &["get"]),
        ]);

        let (endpoint, params) = found(registry.lookup("/users/me"));
        assert_eq!(endpoint.path, "/users/me");
        assert!(params.is_empty());
    }

    #[test]
    fn earlier_dynamic_registration_wins() {
        let registry = Registry::build(&[
            route("/files/:name", &["get"]),
            route("/:section/:page", &["get"]),
        ]);

        let (endpoint, params) = found(registry.lookup("/files/readme"));
        assert_eq!(endpoint.path, "/files/:name");
        assert_eq!(params, vec![("name".to_string(), "readme".to_string())]);

        let (endpoint, _) = found(registry.lookup("/docs/intro"));
        assert_eq!(endpoint.path, "/:section/:page");
    }

    #[test]
    fn lookup_normalizes_request_path() {
        let registry = Registry::build(&[route("/users/:id", &["get"])]);

        let (_, params) = found(registry.lookup("/users//7/"));
        assert_eq!(params, vec![("id".to_string(), "7".to_string())]);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let registry = Registry::build(&[route("/Users", &["get"])]);
        assert!(registry.lookup("/Users").is_found());
        assert!(!registry.lookup("/users").is_found());
    }

    #[test]
    fn round_trip_substituted_paths_rematch() {
        let registry = Registry::build(&[
            route("/orgs/:org", &["get"]),
            route("/orgs/:org/repos/:repo", &["get"]),
            route("/orgs/:org/repos/:repo/issues/:number", &["get"]),
        ]);

        let values = ["a", "acme-corp", "42", "x_y", "%20", "ü"];
        for endpoint in registry.dynamic_routes() {
            let template = PathTemplate::parse(&endpoint.path).unwrap();
            for value in values {
                let bindings: Vec<(&str, &str)> =
                    template.param_names().map(|name| (name, value)).collect();
                let path = template.render(&bindings).unwrap();

                let (matched, params) = found(registry.lookup(&path));
                assert_eq!(matched.path, endpoint.path, "path {}", path);
                let expected: Vec<(String, String)> = bindings
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                assert_eq!(params, expected);
            }
        }
    }

    #[test]
    fn handler_table_is_exposed() {
        let registry = Registry::build(&[route("/users", &["get"])]);
        assert_eq!(
            registry.handler_for("/users").and_then(|h| h.name.as_deref()),
            Some("handler")
        );
        assert!(registry.handler_for("/nope").is_none());
    }

    #[test]
    fn handler_table_is_per_method() {
        let registry = Registry::build(&[
            Layer::Route(RouteLayer {
                path: Some(RoutePath::Single("/users".into())),
                matcher: None,
                methods: vec!["get".into()],
                handlers: vec![HandlerRef::named("listUsers")],
            }),
            Layer::Route(RouteLayer {
                path: Some(RoutePath::Single("/users".into())),
                matcher: None,
                methods: vec!["post".into()],
                handlers: vec![HandlerRef::named("createUser")],
            }),
        ]);

        let name = |method: &str| {
            registry
                .handler_for_method(method, "/users")
                .and_then(|h| h.name.as_deref())
        };
        assert_eq!(name("GET"), Some("listUsers"));
        assert_eq!(name("POST"), Some("createUser"));
        assert_eq!(name("DELETE"), None);
        assert_eq!(registry.method_handlers().count(), 2);
    }

    #[test]
    fn endpoint_by_path() {
        let registry = Registry::build(&[route("/a", &["get"])]);
        assert!(registry.endpoint("/a").is_some());
        assert!(registry.endpoint("/b").is_none());
    }

    #[test]
    fn empty_registry_matches_nothing() {
        let registry = Registry::build(&[]);
        assert!(registry.is_empty());
        assert!(!registry.lookup("/").is_found());
    }
}

//! Depth-first traversal of the routing tree into endpoint seeds.

use std::collections::HashMap;

use ravelin_telemetry::log_route_decode_opaque;
use serde::Serialize;

use crate::decoder::{decode, is_opaque_path, DecodedPath};
use crate::layer::{HandlerRef, Layer, MountLayer, RouteLayer};
use crate::template::PathTemplate;

/// The framework's synthetic "any verb" marker.
const ALL_VERB: &str = "_all";

/// Method key for handlers of layers that only declared [`ALL_VERB`].
pub const ANY_METHOD: &str = "*";

/// Whether an endpoint came from a route or from a terminal mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    Route,
    /// Terminal mount with no sub-stack, listed for observability only.
    Placeholder,
}

/// One endpoint discovered in the tree. Identity is `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointRecord {
    pub path: String,
    /// Uppercased verbs in first-seen order.
    pub methods: Vec<String>,
    /// Handler names in chain order.
    pub middlewares: Vec<String>,
    pub kind: EndpointKind,
}

impl EndpointRecord {
    pub fn is_opaque(&self) -> bool {
        is_opaque_path(&self.path)
    }
}

/// Everything the walk produced.
#[derive(Debug, Default)]
pub struct RouteTable {
    pub endpoints: Vec<EndpointRecord>,
    /// First handler seen per endpoint path.
    pub handlers: HashMap<String, HandlerRef>,
    /// First handler seen per (method, endpoint path).
    pub method_handlers: HashMap<(String, String), HandlerRef>,
}

/// Walks a routing tree, merging endpoints that resolve to the same path.
#[derive(Debug, Default)]
pub struct Walker {
    table: RouteTable,
    index: HashMap<String, usize>,
}

impl Walker {
    /// Walk a whole tree from its root stack.
    pub fn walk(tree: &[Layer]) -> RouteTable {
        let mut walker = Walker::default();
        walker.walk_stack(tree, "");
        walker.table
    }

    fn walk_stack(&mut self, stack: &[Layer], base: &str) {
        for layer in stack {
            match layer {
                Layer::Route(route) => self.walk_route(route, base),
                Layer::Mount(mount) => self.walk_mount(mount, base),
                Layer::Middleware { name } => {
                    tracing::trace!(
                        middleware = name.as_deref().unwrap_or("anonymous"),
                        base_path = base,
                        "skipping middleware layer"
                    );
                }
            }
        }
    }

    fn walk_route(&mut self, route: &RouteLayer, base: &str) {
        let paths: Vec<String> = match (&route.path, &route.matcher) {
            (Some(path), _) => path.iter().map(str::to_string).collect(),
            (None, Some(matcher)) => match decode(matcher) {
                DecodedPath::Root => vec!["/".to_string()],
                DecodedPath::Template(template) => vec![template.to_string()],
                DecodedPath::Opaque(tag) => {
                    log_route_decode_opaque!(source = %matcher.source, base_path = base);
                    vec![format!("/{}", tag)]
                }
            },
            (None, None) => {
                tracing::debug!(base_path = base, "route layer has no path or matcher");
                return;
            }
        };

        let methods = route_methods(&route.methods);
        let middlewares: Vec<String> = route
            .handlers
            .iter()
            .map(|h| h.display_name().to_string())
            .collect();

        for path in paths {
            let complete = join_path(base, &path);
            let key = self.add(EndpointRecord {
                path: complete,
                methods: methods.clone(),
                middlewares: middlewares.clone(),
                kind: EndpointKind::Route,
            });

            let Some(first) = route.handlers.first() else {
                continue;
            };
            if methods.is_empty() {
                self.table
                    .method_handlers
                    .entry((ANY_METHOD.to_string(), key.clone()))
                    .or_insert_with(|| first.clone());
            }
            for method in &methods {
                self.table
                    .method_handlers
                    .entry((method.clone(), key.clone()))
                    .or_insert_with(|| first.clone());
            }
            self.table
                .handlers
                .entry(key)
                .or_insert_with(|| first.clone());
        }
    }

    fn walk_mount(&mut self, mount: &MountLayer, base: &str) {
        let decoded = decode(&mount.matcher);
        if decoded.is_opaque() {
            log_route_decode_opaque!(source = %mount.matcher.source, base_path = base);
        }
        let next_base = format!("{}{}", base, decoded.fragment());

        match &mount.stack {
            Some(stack) => self.walk_stack(stack, &next_base),
            None => {
                self.add(EndpointRecord {
                    path: next_base,
                    methods: Vec::new(),
                    middlewares: Vec::new(),
                    kind: EndpointKind::Placeholder,
                });
            }
        }
    }

    /// Add or merge an endpoint, returning its canonical path.
    fn add(&mut self, mut record: EndpointRecord) -> String {
        record.path = canonical_path(&record.path);

        if let Some(&i) = self.index.get(&record.path) {
            let existing = &mut self.table.endpoints[i];
            for method in record.methods {
                if !existing.methods.contains(&method) {
                    existing.methods.push(method);
                }
            }
            if record.kind == EndpointKind::Route {
                if existing.kind == EndpointKind::Placeholder {
                    existing.middlewares = record.middlewares;
                }
                existing.kind = EndpointKind::Route;
            }
            return existing.path.clone();
        }

        let path = record.path.clone();
        self.index.insert(path.clone(), self.table.endpoints.len());
        self.table.endpoints.push(record);
        path
    }
}

/// Declared verbs minus the synthetic one, uppercased, deduplicated.
fn route_methods(declared: &[String]) -> Vec<String> {
    let mut methods: Vec<String> = Vec::with_capacity(declared.len());
    for method in declared.iter().filter(|m| m.as_str() != ALL_VERB) {
        let upper = method.to_uppercase();
        if !methods.contains(&upper) {
            methods.push(upper);
        }
    }
    methods
}

/// A route path of `/` under a non-empty base is the base itself.
fn join_path(base: &str, path: &str) -> String {
    if !base.is_empty() && path == "/" {
        base.to_string()
    } else {
        format!("{}{}", base, path)
    }
}

/// Re-render parseable paths so equal templates share one identity.
fn canonical_path(path: &str) -> String {
    if is_opaque_path(path) {
        return path.to_string();
    }
    match PathTemplate::parse(path) {
        Ok(template) => template.to_string(),
        Err(_) => path.to_string(),
    }
}

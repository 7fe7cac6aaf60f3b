//! Model of a host framework's compiled routing tree.
//!
//! Hosts export their tree once at boot (JSON or YAML). Each node is a
//! tagged [`Layer`]; the walker pattern-matches on the tag and consults
//! [`Capabilities`] instead of probing node shapes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RouteError;

/// One node of the routing tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layer {
    /// A concrete route declaring verbs and a handler chain.
    Route(RouteLayer),
    /// A sub-router or mounted application.
    Mount(MountLayer),
    /// Plain middleware with no route and no sub-stack.
    Middleware {
        #[serde(default)]
        name: Option<String>,
    },
}

/// What a node offers to the walker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub has_route: bool,
    pub has_sub_stack: bool,
    pub has_matcher: bool,
}

impl Layer {
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Layer::Route(route) => Capabilities {
                has_route: true,
                has_sub_stack: false,
                has_matcher: route.matcher.is_some(),
            },
            Layer::Mount(mount) => Capabilities {
                has_route: false,
                has_sub_stack: mount.stack.is_some(),
                has_matcher: true,
            },
            Layer::Middleware { .. } => Capabilities::default(),
        }
    }
}

/// A concrete route layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteLayer {
    /// Declared literal path(s). Takes precedence over `matcher`.
    #[serde(default)]
    pub path: Option<RoutePath>,

    /// Compiled matcher, used when no literal path was retained.
    #[serde(default)]
    pub matcher: Option<CompiledMatcher>,

    /// Declared verbs, any case. May include the synthetic `_all`.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Ordered handler chain.
    #[serde(default)]
    pub handlers: Vec<HandlerRef>,
}

/// A route's literal path: one string or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoutePath {
    Single(String),
    Many(Vec<String>),
}

impl RoutePath {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let paths: &[String] = match self {
            RoutePath::Single(path) => std::slice::from_ref(path),
            RoutePath::Many(paths) => paths,
        };
        paths.iter().map(String::as_str)
    }
}

/// A mount point (sub-router, bound dispatch, mounted app).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountLayer {
    /// Framework-assigned layer name, e.g. `router`.
    #[serde(default)]
    pub name: Option<String>,

    /// Compiled mount matcher.
    pub matcher: CompiledMatcher,

    /// Nested layers. `None` marks a terminal mount.
    #[serde(default)]
    pub stack: Option<Vec<Layer>>,
}

/// A compiled path matcher: regex source plus ordered parameter keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledMatcher {
    /// Regex source, bare or in `/source/flags` form.
    pub source: String,

    #[serde(default)]
    pub keys: Vec<ParamKey>,

    /// Framework marker for the root matcher.
    #[serde(default)]
    pub fast_slash: bool,
}

impl CompiledMatcher {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_keys<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = names
            .into_iter()
            .map(|name| ParamKey {
                name: name.into(),
                optional: false,
            })
            .collect();
        self
    }
}

/// A parameter key as recorded by the framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawParamKey")]
pub struct ParamKey {
    pub name: String,
    pub optional: bool,
}

/// Keys appear either as bare names or as `{name, optional}` objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawParamKey {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        optional: bool,
    },
}

impl From<RawParamKey> for ParamKey {
    fn from(raw: RawParamKey) -> Self {
        match raw {
            RawParamKey::Name(name) => ParamKey {
                name,
                optional: false,
            },
            RawParamKey::Full { name, optional } => ParamKey { name, optional },
        }
    }
}

/// A reference to a handler in a route's chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerRef {
    /// Function name; `None` for inline handlers.
    #[serde(default)]
    pub name: Option<String>,

    /// Handler group, e.g. the controller the handler belongs to.
    #[serde(default)]
    pub group: Option<String>,
}

impl HandlerRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            group: None,
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Display name, `anonymous` for inline handlers.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "anonymous",
        }
    }
}

/// Load a route tree dump. Format is chosen by extension (`.json`, `.yaml`, `.yml`).
pub fn load_tree(path: &Path) -> Result<Vec<Layer>, RouteError> {
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(serde_json::from_str(&content)?),
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
        other => Err(RouteError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

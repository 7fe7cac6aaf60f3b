//! Reconstructs path templates from compiled matchers.
//!
//! The framework keeps no source string for a mounted path, only the regex it
//! compiled and the ordered parameter keys. Decoding strips the anchoring
//! decorations, substitutes `:name` for each parameter group left to right,
//! then extracts the literal path. Anything else degrades to an opaque
//! `<complex:…>` tag; decoding never fails.

use std::sync::OnceLock;

use regex_lite::Regex;

use crate::layer::CompiledMatcher;
use crate::template::{PathTemplate, Segment};

/// Source of the framework's root "matches everything" matcher.
pub const ROOT_SENTINEL: &str = r"^\/?(?=\/|$)";

/// Marker for a single-segment parameter group.
const PARAM_GROUP: &str = r"(?:([^\/]+?))";

/// Prefix of opaque path fragments.
pub const OPAQUE_PREFIX: &str = "<complex:";

/// Outcome of decoding a compiled matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedPath {
    /// The root matcher: contributes nothing to the base path.
    Root,
    /// A recognised template.
    Template(PathTemplate),
    /// Unrecognised shape, embedding the raw source.
    Opaque(String),
}

impl DecodedPath {
    /// Path fragment to append to a base path.
    pub fn fragment(&self) -> String {
        match self {
            DecodedPath::Root => String::new(),
            DecodedPath::Template(template) if template.is_root() => String::new(),
            DecodedPath::Template(template) => template.to_string(),
            DecodedPath::Opaque(tag) => format!("/{}", tag),
        }
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, DecodedPath::Opaque(_))
    }
}

/// Returns true if a path contains an opaque fragment.
pub fn is_opaque_path(path: &str) -> bool {
    path.contains(OPAQUE_PREFIX)
}

/// Decode a compiled matcher into a path template.
pub fn decode(matcher: &CompiledMatcher) -> DecodedPath {
    let source = strip_delimiters(&matcher.source);

    if matcher.fast_slash || source == ROOT_SENTINEL {
        return DecodedPath::Root;
    }

    let Some(body) = source.strip_prefix('^') else {
        return opaque(matcher);
    };
    let body = strip_end_decorations(body);

    let Some(substituted) = substitute_params(body, matcher) else {
        return opaque(matcher);
    };

    let Some(captures) = literal_pattern().captures(&substituted) else {
        return opaque(matcher);
    };
    let literal = captures.get(1).map(|m| m.as_str()).unwrap_or_default();

    match PathTemplate::parse(&unescape(literal)) {
        Ok(template) if !binds_every_key(&template, matcher) => opaque(matcher),
        Ok(template) if template.is_root() => DecodedPath::Root,
        Ok(template) => DecodedPath::Template(template),
        Err(_) => opaque(matcher),
    }
}

/// Every key must surface as a whole `:name` segment. A parameter glued to
/// literal text (`/user-:id`) cannot be matched positionally.
fn binds_every_key(template: &PathTemplate, matcher: &CompiledMatcher) -> bool {
    let literal_colon = template
        .segments()
        .iter()
        .any(|s| matches!(s, Segment::Literal(text) if text.contains(':')));
    !literal_colon && template.param_names().count() == matcher.keys.len()
}

fn opaque(matcher: &CompiledMatcher) -> DecodedPath {
    DecodedPath::Opaque(format!("{}{}>", OPAQUE_PREFIX, matcher.source))
}

/// Accept `RegExp#toString` form (`/^\/a\/?$/i`) as well as a bare source.
fn strip_delimiters(source: &str) -> &str {
    if let Some(inner) = source.strip_prefix('/') {
        if let Some(end) = inner.rfind('/') {
            let flags = &inner[end + 1..];
            if flags.chars().all(|c| c.is_ascii_alphabetic()) {
                return &inner[..end];
            }
        }
    }
    source
}

/// Strip the end anchor (`(?=\/|$)` or `$`) and the optional trailing slash.
fn strip_end_decorations(body: &str) -> &str {
    let body = body
        .strip_suffix(r"(?=\/|$)")
        .or_else(|| body.strip_suffix('$'))
        .unwrap_or(body);
    body.strip_suffix(r"\/?").unwrap_or(body)
}

/// Replace parameter groups left to right with `:name`.
///
/// Every key must be consumed by exactly one group, and optional keys are
/// not representable as plain templates.
fn substitute_params(body: &str, matcher: &CompiledMatcher) -> Option<String> {
    let mut keys = matcher.keys.iter();
    let mut out = String::with_capacity(body.len());
    let mut rest = body;

    while let Some(pos) = rest.find(PARAM_GROUP) {
        let key = keys.next()?;
        if key.optional {
            return None;
        }
        out.push_str(&rest[..pos]);
        out.push(':');
        out.push_str(&key.name);
        rest = &rest[pos + PARAM_GROUP.len()..];
    }
    out.push_str(rest);

    if keys.next().is_some() {
        return None;
    }
    Some(out)
}

/// `\/`-separated segments of plain characters, escaped `.`/`-`, or `:name`.
fn literal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^((?:\\/(?:[A-Za-z0-9_~-]|\\[.\-]|:[A-Za-z0-9_]+)*)*)$")
            .expect("literal pattern compiles")
    })
}

fn unescape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

//! Path templates such as `/users/:id/orders/:orderId`.

use std::collections::HashSet;
use std::fmt;

use crate::error::RouteError;

/// A single template segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches the segment text exactly.
    Literal(String),
    /// Binds one non-empty request segment under this name.
    Param(String),
}

/// An ordered list of literal and named-parameter segments.
///
/// Parameter names are unique within one template. The empty template is the
/// root and renders as `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTemplate {
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// The root template (`/`).
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a template string. Empty segments (`//`, trailing `/`) are ignored.
    pub fn parse(template: &str) -> Result<Self, RouteError> {
        let mut segments = Vec::new();
        let mut seen = HashSet::new();

        for raw in template.split('/').filter(|s| !s.is_empty()) {
            let segment = match raw.strip_prefix(':') {
                Some(name) => {
                    if !is_param_name(name) {
                        return Err(RouteError::InvalidSegment {
                            template: template.to_string(),
                            segment: raw.to_string(),
                        });
                    }
                    if !seen.insert(name) {
                        return Err(RouteError::DuplicateParam {
                            template: template.to_string(),
                            name: name.to_string(),
                        });
                    }
                    Segment::Param(name.to_string())
                }
                None => Segment::Literal(raw.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns true if any segment is a named parameter.
    pub fn has_params(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Param(_)))
    }

    /// Parameter names in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Bind request segments positionally against this template.
    ///
    /// Segment counts must agree, literals must be equal, and every parameter
    /// binds exactly one non-empty segment.
    pub fn bind(&self, segments: &[&str]) -> Option<Vec<(String, String)>> {
        if segments.len() != self.segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (template_segment, actual) in self.segments.iter().zip(segments) {
            match template_segment {
                Segment::Literal(literal) => {
                    if literal != actual {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if actual.is_empty() {
                        return None;
                    }
                    params.push((name.clone(), actual.to_string()));
                }
            }
        }
        Some(params)
    }

    /// Substitute concrete values for every parameter.
    ///
    /// Returns `None` if a parameter has no value.
    pub fn render(&self, values: &[(&str, &str)]) -> Option<String> {
        if self.is_root() {
            return Some("/".to_string());
        }

        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Literal(literal) => path.push_str(literal),
                Segment::Param(name) => {
                    let (_, value) = values.iter().find(|(k, _)| k == name)?;
                    path.push_str(value);
                }
            }
        }
        Some(path)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => write!(f, "/{}", literal)?,
                Segment::Param(name) => write!(f, "/:{}", name)?,
            }
        }
        Ok(())
    }
}

fn is_param_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_literal_and_params() {
        let template = PathTemplate::parse("/users/:userId/orders/:orderId").unwrap();
        assert_eq!(
            template.segments(),
            &[
                Segment::Literal("users".into()),
                Segment::Param("userId".into()),
                Segment::Literal("orders".into()),
                Segment::Param("orderId".into()),
            ]
        );
        assert!(template.has_params());
        assert_eq!(
            template.param_names().collect::<Vec<_>>(),
            vec!["userId", "orderId"]
        );
    }

    #[test]
    fn display_round_trips_the_source() {
        for source in ["/", "/users", "/users/:id", "/a/:b/c/:d"] {
            assert_eq!(PathTemplate::parse(source).unwrap().to_string(), source);
        }
    }

    #[test]
    fn empty_and_slash_are_root() {
        assert!(PathTemplate::parse("").unwrap().is_root());
        assert!(PathTemplate::parse("/").unwrap().is_root());
        assert_eq!(PathTemplate::root().to_string(), "/");
    }

    #[test]
    fn duplicate_param_is_rejected() {
        let err = PathTemplate::parse("/users/:id/friends/:id").unwrap_err();
        assert!(matches!(err, RouteError::DuplicateParam { ref name, .. } if name == "id"));
    }

    #[test]
    fn bare_colon_is_rejected() {
        assert!(matches!(
            PathTemplate::parse("/users/:"),
            Err(RouteError::InvalidSegment { .. })
        ));
    }

    #[test]
    fn bind_extracts_params() {
        let template = PathTemplate::parse("/users/:id").unwrap();
        assert_eq!(
            template.bind(&["users", "42"]),
            Some(vec![("id".to_string(), "42".to_string())])
        );
        assert_eq!(template.bind(&["users", "42", "extra"]), None);
        assert_eq!(template.bind(&["posts", "42"]), None);
    }

    #[test]
    fn render_then_bind_returns_same_values() {
        let template = PathTemplate::parse("/orgs/:org/repos/:repo").unwrap();
        let path = template
            .render(&[("org", "acme"), ("repo", "rocket")])
            .unwrap();
        assert_eq!(path, "/orgs/acme/repos/rocket");

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        assert_eq!(
            template.bind(&segments),
            Some(vec![
                ("org".to_string(), "acme".to_string()),
                ("repo".to_string(), "rocket".to_string()),
            ])
        );
    }

    #[test]
    fn render_missing_value_is_none() {
        let template = PathTemplate::parse("/users/:id").unwrap();
        assert_eq!(template.render(&[]), None);
    }
}

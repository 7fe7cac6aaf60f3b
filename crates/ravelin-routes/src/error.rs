use thiserror::Error;

/// Errors produced while loading route trees or parsing templates.
#[derive(Debug, Error)]
pub enum RouteError {
    /// A template declares the same parameter twice.
    #[error("duplicate parameter ':{name}' in template '{template}'")]
    DuplicateParam { template: String, name: String },

    /// A template segment is not a literal or a `:name` parameter.
    #[error("invalid segment '{segment}' in template '{template}'")]
    InvalidSegment { template: String, segment: String },

    /// Route tree dump has an extension we don't know how to read.
    #[error("unsupported route tree format: {0}")]
    UnsupportedFormat(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

//! Startup endpoint listing.

use ravelin_routes::{EndpointKind, EndpointRecord, Registry};

/// One line per endpoint: methods, path, then the handler chain.
pub fn render_text(registry: &Registry) -> String {
    let width = registry
        .endpoints()
        .iter()
        .map(|e| methods_label(e).len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for endpoint in registry.endpoints() {
        out.push_str(&format!(
            "{:<width$}  {}",
            methods_label(endpoint),
            endpoint.path,
            width = width
        ));
        if !endpoint.middlewares.is_empty() {
            out.push_str(&format!("  [{}]", endpoint.middlewares.join(", ")));
        }
        if endpoint.is_opaque() {
            out.push_str("  (unmatched)");
        }
        out.push('\n');
    }
    out
}

/// The registry as a JSON array of endpoint records.
pub fn render_json(registry: &Registry) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(registry.endpoints())
}

fn methods_label(endpoint: &EndpointRecord) -> String {
    match endpoint.kind {
        EndpointKind::Placeholder => "(mounted)".to_string(),
        EndpointKind::Route if endpoint.methods.is_empty() => "-".to_string(),
        EndpointKind::Route => endpoint.methods.join(","),
    }
}

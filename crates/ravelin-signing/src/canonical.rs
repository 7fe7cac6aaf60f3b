//! Deterministic string form of a request: `METHOD&url&body`.
//!
//! Signer and verifier must agree bit-for-bit, so every step is fixed:
//! query tokens are sorted whole, object keys are sorted recursively and
//! everything is run through one strict percent-encoder.

use serde_json::{Map, Value};

use crate::SigningError;

/// The parts of a request covered by a signature.
#[derive(Debug, Clone, Copy)]
pub struct SigningContext<'a> {
    /// HTTP method, any case.
    pub method: &'a str,
    /// Full request URL including any query string.
    pub url: &'a str,
    /// JSON body. Ignored for GET; `null` counts as absent.
    pub body: Option<&'a Value>,
}

impl<'a> SigningContext<'a> {
    pub fn new(method: &'a str, url: &'a str) -> Self {
        Self {
            method,
            url,
            body: None,
        }
    }

    pub fn with_body(mut self, body: &'a Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Serialize a request into its canonical signing string.
pub fn canonical_string(ctx: &SigningContext<'_>) -> Result<String, SigningError> {
    let mut tokens = Vec::with_capacity(3);
    tokens.push(ctx.method.to_uppercase());
    tokens.push(canonical_url(ctx.url));

    if !ctx.method.eq_ignore_ascii_case("GET") {
        if let Some(body) = ctx.body.filter(|b| !b.is_null()) {
            tokens.push(canonical_body(body)?);
        }
    }

    Ok(tokens.join("&"))
}

/// Sort query tokens as whole `key=value` strings, then encode the URL.
pub fn canonical_url(url: &str) -> String {
    match url.split_once('?') {
        Some((base, query)) => {
            // Anything after a second `?` is not part of the query.
            let query = query.split('?').next().unwrap_or_default();
            let mut params: Vec<&str> = query.split('&').collect();
            params.sort_unstable();
            strict_encode(&format!("{}?{}", base, params.join("&")))
        }
        None => strict_encode(url),
    }
}

/// Compact JSON with keys sorted at every depth, then encoded.
pub fn canonical_body(body: &Value) -> Result<String, SigningError> {
    let sorted = sort_value(body);
    Ok(strict_encode(&serde_json::to_string(&sorted)?))
}

/// Rebuild a value with object keys in ascending byte order.
///
/// Arrays keep their element order; scalars pass through.
pub fn sort_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(sort_value).collect()),
        Value::Object(object) => {
            let mut entries: Vec<(&String, &Value)> = object.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            let mut sorted = Map::with_capacity(entries.len());
            for (key, value) in entries {
                sorted.insert(key.clone(), sort_value(value));
            }
            Value::Object(sorted)
        }
        scalar => scalar.clone(),
    }
}

/// Percent-encode everything except unreserved characters (`A-Z a-z 0-9 - _ . ~`).
///
/// `! ' ( ) *` are encoded too, so the output matches a strict
/// `encodeURIComponent` on every client.
pub fn strict_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

//! CLI regression tests for the `ravelin` binary.
//!
//! These tests invoke the binary as a subprocess to catch regressions in flag
//! names, exit codes and output formats that the library tests can't see.
//!
//! Run with: `cargo test -p ravelin-test`
//! Requires the `ravelin` binary to be built first (`cargo build -p ravelin`).

use assert_cmd::Command;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::{json, Value};

use crate::pipeline::{fixtures, API_KEY, APP_SECRET, TOKEN_SECRET};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Returns an assert_cmd Command wrapping the `ravelin` binary.
fn ravelin() -> Command {
    // cargo_bin is deprecated for custom build-dir setups; fine for standard workspace use.
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("ravelin")
        .expect("ravelin binary not found, run `cargo build -p ravelin` first");
    cmd.env_remove("RAVELIN_APP_SECRET")
        .env_remove("RAVELIN_TOKEN_SECRET")
        .env_remove("RAVELIN_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn token(claims: Value) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TOKEN_SECRET.as_bytes()),
    )
    .unwrap()
}

/// `authorize` against routes.json with ravelin.toml and both secrets set.
fn authorize(method: &str, path: &str) -> Command {
    let mut cmd = ravelin();
    cmd.arg("--config")
        .arg(fixtures().join("ravelin.toml"))
        .args(["authorize", "--tree"])
        .arg(fixtures().join("routes.json"))
        .args(["--method", method, "--path", path])
        .env("RAVELIN_TOKEN_SECRET", TOKEN_SECRET)
        .env("RAVELIN_APP_SECRET", APP_SECRET);
    cmd
}

fn signature_for(method: &str, url: &str, body: Option<&str>) -> String {
    let mut cmd = ravelin();
    cmd.args(["sign", "--method", method, "--url", url])
        .env("RAVELIN_APP_SECRET", APP_SECRET);
    if let Some(body) = body {
        cmd.args(["--body", body]);
    }
    let output = cmd.output().unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

// ---------------------------------------------------------------------------
// ravelin routes
// ---------------------------------------------------------------------------

#[test]
fn routes_lists_mounted_paths() {
    ravelin()
        .args(["routes", "--tree"])
        .arg(fixtures().join("routes.json"))
        .assert()
        .success()
        .stdout(contains("/admin/stats"))
        .stdout(contains("/users/:id"))
        .stdout(contains("GET,DELETE"))
        .stdout(contains("(mounted)"))
        .stdout(contains("/legacy"))
        .stdout(contains("(unmatched)"));
}

#[test]
fn routes_json_output() {
    let output = ravelin()
        .args(["routes", "--format", "json", "--tree"])
        .arg(fixtures().join("routes.json"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let endpoints: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    let paths: Vec<&str> = endpoints
        .iter()
        .filter_map(|e| e["path"].as_str())
        .collect();
    assert!(paths.contains(&"/admin/stats"));
    assert!(!paths.contains(&"/stats"));
    assert_eq!(
        endpoints.iter().find(|e| e["path"] == "/users").unwrap()["methods"],
        json!(["GET", "POST"])
    );
}

#[test]
fn routes_yaml_tree() {
    ravelin()
        .args(["routes", "--tree"])
        .arg(fixtures().join("routes.yaml"))
        .assert()
        .success()
        .stdout(contains("/orgs/:org/repos/:repo"));
}

#[test]
fn routes_unknown_format_exits_one() {
    ravelin()
        .args(["routes", "--format", "xml", "--tree"])
        .arg(fixtures().join("routes.json"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("unknown format"));
}

#[test]
fn routes_missing_tree_exits_one() {
    ravelin()
        .args(["routes", "--tree", "this-file-does-not-exist.json"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("failed to load route tree"));
}

// ---------------------------------------------------------------------------
// ravelin match
// ---------------------------------------------------------------------------

#[test]
fn match_binds_params() {
    ravelin()
        .args(["match", "--path", "/users/42", "--tree"])
        .arg(fixtures().join("routes.json"))
        .assert()
        .success()
        .stdout(contains(r#""template":"/users/:id""#))
        .stdout(contains(r#""id":"42""#));
}

#[test]
fn match_extra_segment_exits_one() {
    ravelin()
        .args(["match", "--path", "/users/42/extra", "--tree"])
        .arg(fixtures().join("routes.json"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("no route matches"));
}

#[test]
fn match_unaccepted_method_exits_one() {
    ravelin()
        .args(["match", "--path", "/users/42", "--method", "put", "--tree"])
        .arg(fixtures().join("routes.json"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("does not accept PUT"));
}

// ---------------------------------------------------------------------------
// ravelin sign / verify
// ---------------------------------------------------------------------------

#[test]
fn sign_prints_hex_signature() {
    let signature = signature_for("get", "https://api.example.com/users?b=2&a=1", None);
    assert_eq!(signature.len(), 128);
    assert!(signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn sign_is_insensitive_to_query_and_key_order() {
    let a = signature_for(
        "POST",
        "https://api.example.com/users?b=2&a=1",
        Some(r#"{"name":"Ada","tags":["x","y"]}"#),
    );
    let b = signature_for(
        "POST",
        "https://api.example.com/users?a=1&b=2",
        Some(r#"{"tags":["x","y"],"name":"Ada"}"#),
    );
    assert_eq!(a, b);
}

#[test]
fn sign_without_secret_exits_one() {
    ravelin()
        .args(["sign", "--method", "GET", "--url", "https://api.example.com/"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("error:"));
}

#[test]
fn verify_round_trip() {
    let url = "https://api.example.com/users?page=2";
    let signature = signature_for("GET", url, None);

    ravelin()
        .args(["verify", "--method", "GET", "--url", url, "--signature", &signature])
        .env("RAVELIN_APP_SECRET", APP_SECRET)
        .assert()
        .success()
        .stdout(contains("valid"));
}

#[test]
fn verify_tampered_url_prints_invalid() {
    let signature = signature_for("GET", "https://api.example.com/users?page=2", None);

    ravelin()
        .args([
            "verify",
            "--method",
            "GET",
            "--url",
            "https://api.example.com/users?page=3",
            "--signature",
            &signature,
        ])
        .env("RAVELIN_APP_SECRET", APP_SECRET)
        .assert()
        .failure()
        .code(1)
        .stdout(contains("invalid"));
}

#[test]
fn verify_with_principal_secret() {
    let url = "https://api.example.com/auth/me";
    let signature = String::from_utf8(
        ravelin()
            .args(["sign", "--method", "GET", "--url", url, "--secret", "client-42"])
            .env("RAVELIN_APP_SECRET", APP_SECRET)
            .output()
            .unwrap()
            .stdout,
    )
    .unwrap();
    let signature = signature.trim();

    ravelin()
        .args(["verify", "--method", "GET", "--url", url, "--signature", signature])
        .env("RAVELIN_APP_SECRET", APP_SECRET)
        .assert()
        .failure()
        .stdout(contains("invalid"));

    ravelin()
        .args([
            "verify",
            "--method",
            "GET",
            "--url",
            url,
            "--signature",
            signature,
            "--secret",
            "client-42",
        ])
        .env("RAVELIN_APP_SECRET", APP_SECRET)
        .assert()
        .success();
}

// ---------------------------------------------------------------------------
// ravelin authorize
// ---------------------------------------------------------------------------

#[test]
fn authorize_public_route() {
    authorize("GET", "/health")
        .assert()
        .success()
        .stdout(contains(r#""admitted":true"#))
        .stdout(contains(r#""admission":"public""#))
        .stdout(contains("GET /health"));
}

#[test]
fn authorize_public_handler() {
    authorize("POST", "/auth/login")
        .assert()
        .success()
        .stdout(contains(r#""admission":"public""#));
}

#[test]
fn authorize_missing_token() {
    authorize("GET", "/users")
        .assert()
        .failure()
        .code(1)
        .stdout(contains(r#""kind":"AUTH_MISSING""#))
        .stdout(contains(r#""status":400"#))
        .stdout(contains("Authorization token is missing"));
}

#[test]
fn authorize_invalid_token_hides_reason() {
    authorize("GET", "/users")
        .args(["--header", "Authorization: Bearer not.a.token"])
        .assert()
        .failure()
        .code(1)
        .stdout(contains(r#""kind":"AUTH_INVALID""#))
        .stdout(contains(r#""status":401"#))
        .stdout(contains("Invalid token"))
        .stdout(contains("InvalidToken").not());
}

#[test]
fn authorize_forbidden_role() {
    let header = format!("Authorization: Bearer {}", token(json!({"role": "GUEST"})));
    authorize("GET", "/users")
        .args(["--header", &header])
        .assert()
        .failure()
        .code(1)
        .stdout(contains(r#""kind":"AUTH_FORBIDDEN""#))
        .stdout(contains("Access denied"));
}

#[test]
fn authorize_valid_token() {
    let header = format!(
        "Authorization: Bearer {}",
        token(json!({"sub": "u1", "role": "user"}))
    );
    authorize("DELETE", "/users/7")
        .args(["--header", &header])
        .assert()
        .success()
        .stdout(contains(r#""admission":"authenticated""#))
        .stdout(contains("DELETE /users/:id"))
        .stdout(contains(r#""sub":"u1""#));
}

#[test]
fn authorize_token_from_cookie() {
    let cookie = format!("access_token={}", token(json!({"role": "ADMIN"})));
    authorize("GET", "/admin/stats")
        .args(["--cookie", &cookie])
        .assert()
        .success();
}

#[test]
fn authorize_without_token_secret_exits_one() {
    ravelin()
        .arg("--config")
        .arg(fixtures().join("ravelin.toml"))
        .args(["authorize", "--method", "GET", "--path", "/health", "--tree"])
        .arg(fixtures().join("routes.json"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("error:"))
        .stdout(contains("admitted").not());
}

#[test]
fn authorize_checks_signature() {
    let body = r#"{"name":"Ada"}"#;
    let signature = signature_for("POST", "https://api.example.com/users?x=1", Some(body));
    let auth = format!("Authorization: Bearer {}", token(json!({"role": "USER"})));

    authorize("POST", "/users?x=1")
        .args(["--header", &auth])
        .args(["--header", "Host: api.example.com"])
        .args(["--header", &format!("X-Signature: {}", signature)])
        .args(["--body", body, "--check-signature"])
        .assert()
        .success();

    authorize("POST", "/users?x=2")
        .args(["--header", &auth])
        .args(["--header", "Host: api.example.com"])
        .args(["--header", &format!("X-Signature: {}", signature)])
        .args(["--body", body, "--check-signature"])
        .assert()
        .failure()
        .stdout(contains(r#""kind":"SIGNATURE_INVALID""#));
}

#[test]
fn authorize_missing_signature() {
    authorize("GET", "/health")
        .arg("--check-signature")
        .assert()
        .failure()
        .code(1)
        .stdout(contains(r#""kind":"SIGNATURE_MISSING""#))
        .stdout(contains("Signature is required"));
}

#[test]
fn authorize_requires_api_key_when_enabled() {
    let api_key_authorize = || {
        let mut cmd = ravelin();
        cmd.arg("--config")
            .arg(fixtures().join("ravelin-api-key.toml"))
            .args(["authorize", "--tree"])
            .arg(fixtures().join("routes.json"))
            .args(["--method", "GET", "--path", "/health"])
            .env("RAVELIN_TOKEN_SECRET", TOKEN_SECRET)
            .env("RAVELIN_API_KEY", API_KEY);
        cmd
    };

    api_key_authorize()
        .assert()
        .failure()
        .code(1)
        .stdout(contains(r#""kind":"API_KEY_MISSING""#))
        .stdout(contains(r#""status":404"#))
        .stdout(contains("API_KEY is Required"));

    api_key_authorize()
        .args(["--header", "api_key: nope"])
        .assert()
        .failure()
        .stdout(contains(r#""status":401"#))
        .stdout(contains("Invalid KEY, Check API KEY"));

    api_key_authorize()
        .args(["--header", &format!("api_key: {}", API_KEY)])
        .assert()
        .success()
        .stdout(contains(r#""admission":"public""#));
}

#[test]
fn authorize_api_key_ignored_when_disabled() {
    authorize("GET", "/health")
        .assert()
        .success()
        .stdout(contains("API_KEY").not());
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn unsupported_algorithm_config_exits_one() {
    ravelin()
        .arg("--config")
        .arg(fixtures().join("invalid.toml"))
        .args(["routes", "--tree"])
        .arg(fixtures().join("routes.json"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("failed to load config"));
}

#[test]
fn unknown_log_format_exits_one() {
    ravelin()
        .args(["--log-format", "xml", "routes", "--tree"])
        .arg(fixtures().join("routes.json"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("unknown log format"));
}

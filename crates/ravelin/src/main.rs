//! Ravelin operator CLI.
//!
//! Inspects route trees, signs and verifies requests, and dry-runs the
//! authorization pipeline against a single request.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use http::{Method, Request};
use ravelin_lib::listing;
use ravelin_lib::{
    ApiKeyGuard, AuthContext, Gate, MatchedRoute, RavelinConfig, RejectionBody, SignatureGuard,
};
use ravelin_routes::{load_tree, Registry, RouteMatch};
use ravelin_signing::{SignatureEngine, SigningContext};
use ravelin_telemetry::{init_logging, log_startup, LogFormat};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(
    name = "ravelin",
    about = "Route introspection and request-signing security layer",
    version
)]
struct Cli {
    /// Config file (ravelin.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overriding the config file.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (json or pretty), overriding the config file.
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every endpoint in a route tree.
    Routes {
        /// Route tree dump (JSON or YAML).
        #[arg(long)]
        tree: PathBuf,

        /// Output format (text or json).
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Resolve a request path against a route tree.
    Match {
        #[arg(long)]
        tree: PathBuf,

        /// Request path, e.g. /users/42.
        #[arg(long)]
        path: String,

        /// Also require the endpoint to accept this method.
        #[arg(long)]
        method: Option<String>,
    },

    /// Print the signature for a request.
    Sign {
        #[arg(long)]
        method: String,

        /// Full URL as the client sees it.
        #[arg(long)]
        url: String,

        /// JSON body.
        #[arg(long)]
        body: Option<String>,

        /// Signing secret, e.g. a principal's; defaults to the application secret.
        #[arg(long)]
        secret: Option<String>,

        #[arg(long, env = "RAVELIN_APP_SECRET", hide_env_values = true)]
        app_secret: Option<String>,
    },

    /// Check a signature against a request.
    Verify {
        #[arg(long)]
        signature: String,

        #[arg(long)]
        method: String,

        #[arg(long)]
        url: String,

        #[arg(long)]
        body: Option<String>,

        #[arg(long)]
        secret: Option<String>,

        #[arg(long, env = "RAVELIN_APP_SECRET", hide_env_values = true)]
        app_secret: Option<String>,
    },

    /// Run one request through the API-key guard (when enabled), the gate
    /// and optionally the signature guard.
    Authorize {
        #[arg(long)]
        tree: PathBuf,

        #[arg(long)]
        method: String,

        /// Request path with optional query string.
        #[arg(long)]
        path: String,

        /// Request header as `Name: value`. Repeatable.
        #[arg(long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Cookie as `name=value`. Repeatable.
        #[arg(long = "cookie", value_name = "NAME=VALUE")]
        cookies: Vec<String>,

        /// Request body.
        #[arg(long)]
        body: Option<String>,

        /// Run the signature guard after the gate.
        #[arg(long)]
        check_signature: bool,

        #[arg(long, env = "RAVELIN_TOKEN_SECRET", hide_env_values = true)]
        token_secret: Option<String>,

        #[arg(long, env = "RAVELIN_APP_SECRET", hide_env_values = true)]
        app_secret: Option<String>,

        /// Expected client API key, checked when `[api_key] enabled = true`.
        #[arg(long, env = "RAVELIN_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::from(1);
        }
    };

    let mut telemetry = config.telemetry.clone();
    if let Some(level) = cli.log_level {
        telemetry = telemetry.with_log_level(level);
    }
    if let Some(format) = cli.log_format.as_deref() {
        match LogFormat::parse(format) {
            Some(format) => telemetry = telemetry.with_log_format(format),
            None => {
                eprintln!("error: unknown log format '{}' (expected json or pretty)", format);
                return ExitCode::from(1);
            }
        }
    }
    if let Err(e) = init_logging(&telemetry) {
        eprintln!("warning: {}", e);
    }
    log_startup!(service = %telemetry.service_name, version = env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Routes { tree, format } => run_routes(&tree, &format),
        Commands::Match { tree, path, method } => run_match(&tree, &path, method.as_deref()),
        Commands::Sign {
            method,
            url,
            body,
            secret,
            app_secret,
        } => run_sign(
            config.with_app_secret(app_secret),
            &method,
            &url,
            body.as_deref(),
            secret.as_deref(),
        ),
        Commands::Verify {
            signature,
            method,
            url,
            body,
            secret,
            app_secret,
        } => run_verify(
            config.with_app_secret(app_secret),
            &signature,
            SignRequest {
                method: &method,
                url: &url,
                body: body.as_deref(),
                secret: secret.as_deref(),
            },
        ),
        Commands::Authorize {
            tree,
            method,
            path,
            headers,
            cookies,
            body,
            check_signature,
            token_secret,
            app_secret,
            api_key,
        } => run_authorize(
            config
                .with_token_secret(token_secret)
                .with_app_secret(app_secret)
                .with_api_key(api_key),
            &tree,
            build_request(&method, &path, &headers, &cookies, body.as_deref()),
            check_signature,
        ),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RavelinConfig> {
    match path {
        Some(path) => RavelinConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(RavelinConfig::default()),
    }
}

fn load_registry(tree: &Path) -> anyhow::Result<Registry> {
    let layers =
        load_tree(tree).with_context(|| format!("failed to load route tree {}", tree.display()))?;
    Ok(Registry::build(&layers))
}

/// Run the routes command.
fn run_routes(tree: &Path, format: &str) -> anyhow::Result<ExitCode> {
    let registry = load_registry(tree)?;
    match format {
        "json" => println!("{}", listing::render_json(&registry)?),
        "text" => print!("{}", listing::render_text(&registry)),
        other => anyhow::bail!("unknown format '{}' (expected text or json)", other),
    }
    Ok(ExitCode::SUCCESS)
}

/// Run the match command.
fn run_match(tree: &Path, path: &str, method: Option<&str>) -> anyhow::Result<ExitCode> {
    let registry = load_registry(tree)?;

    let RouteMatch::Found { endpoint, params } = registry.lookup(path) else {
        eprintln!("no route matches {}", path);
        return Ok(ExitCode::from(1));
    };

    let params: serde_json::Map<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    println!(
        "{}",
        serde_json::json!({
            "template": endpoint.path,
            "methods": endpoint.methods,
            "params": params,
        })
    );

    if let Some(method) = method {
        if !endpoint.methods.iter().any(|m| m.eq_ignore_ascii_case(method)) {
            eprintln!("{} does not accept {}", endpoint.path, method.to_uppercase());
            return Ok(ExitCode::from(1));
        }
    }
    Ok(ExitCode::SUCCESS)
}

struct SignRequest<'a> {
    method: &'a str,
    url: &'a str,
    body: Option<&'a str>,
    secret: Option<&'a str>,
}

fn parse_body(body: Option<&str>) -> anyhow::Result<Option<Value>> {
    body.map(|b| serde_json::from_str(b).context("body is not valid JSON"))
        .transpose()
}

/// Run the sign command.
fn run_sign(
    config: RavelinConfig,
    method: &str,
    url: &str,
    body: Option<&str>,
    secret: Option<&str>,
) -> anyhow::Result<ExitCode> {
    let engine = SignatureEngine::new(config.app_secret()?);
    let body = parse_body(body)?;
    let mut ctx = SigningContext::new(method, url);
    if let Some(body) = &body {
        ctx = ctx.with_body(body);
    }

    println!("{}", engine.sign_with(secret.map(str::as_bytes), &ctx)?);
    Ok(ExitCode::SUCCESS)
}

/// Run the verify command.
fn run_verify(
    config: RavelinConfig,
    signature: &str,
    request: SignRequest<'_>,
) -> anyhow::Result<ExitCode> {
    let engine = SignatureEngine::new(config.app_secret()?);
    let body = parse_body(request.body)?;
    let mut ctx = SigningContext::new(request.method, request.url);
    if let Some(body) = &body {
        ctx = ctx.with_body(body);
    }

    if engine.verify_with(signature, request.secret.map(str::as_bytes), &ctx)? {
        println!("valid");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("invalid");
        Ok(ExitCode::from(1))
    }
}

fn build_request(
    method: &str,
    path: &str,
    headers: &[String],
    cookies: &[String],
    body: Option<&str>,
) -> anyhow::Result<Request<Bytes>> {
    let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .with_context(|| format!("invalid method '{}'", method))?;
    let mut builder = Request::builder().method(method).uri(path);

    for header in headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("header '{}' is not NAME:VALUE", header))?;
        builder = builder.header(name.trim(), value.trim());
    }
    if !cookies.is_empty() {
        for cookie in cookies {
            if !cookie.contains('=') {
                anyhow::bail!("cookie '{}' is not NAME=VALUE", cookie);
            }
        }
        builder = builder.header(http::header::COOKIE, cookies.join("; "));
    }

    builder
        .body(Bytes::from(body.unwrap_or_default().to_string()))
        .context("invalid request")
}

/// Run the authorize command.
fn run_authorize(
    config: RavelinConfig,
    tree: &Path,
    request: anyhow::Result<Request<Bytes>>,
    check_signature: bool,
) -> anyhow::Result<ExitCode> {
    let mut request = request?;
    let registry = Arc::new(load_registry(tree)?);
    let gate = Gate::from_config(registry, &config)?;
    let api_key = if config.api_key.enabled {
        Some(ApiKeyGuard::from_config(&config)?)
    } else {
        None
    };
    let guard = if check_signature {
        Some(SignatureGuard::from_config(&config)?)
    } else {
        None
    };

    let outcome = api_key
        .as_ref()
        .map_or(Ok(()), |api_key| api_key.check(&mut request))
        .and_then(|()| gate.evaluate(&mut request))
        .and_then(|admission| {
            if let Some(guard) = &guard {
                guard.check(&request)?;
            }
            Ok(admission)
        });

    match outcome {
        Ok(admission) => {
            let route = request
                .extensions()
                .get::<MatchedRoute>()
                .map(|m| m.key.to_string());
            let principal = request
                .extensions()
                .get::<AuthContext>()
                .map(|ctx| serde_json::to_value(&ctx.principal))
                .transpose()?;
            println!(
                "{}",
                serde_json::json!({
                    "admitted": true,
                    "admission": format!("{:?}", admission).to_lowercase(),
                    "route": route,
                    "principal": principal,
                })
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(rejection) => {
            println!(
                "{}",
                serde_json::json!({
                    "admitted": false,
                    "kind": rejection.kind(),
                    "status": rejection.status().as_u16(),
                    "body": serde_json::to_value(RejectionBody::from(&rejection))?,
                })
            );
            Ok(ExitCode::from(1))
        }
    }
}

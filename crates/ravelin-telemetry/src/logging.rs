//! Structured logging to stderr: JSON in production, pretty for humans.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{LogFormat, TelemetryConfig, TelemetryError};

/// Install the global subscriber. Fails if one is already installed.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| TelemetryError::LoggingInit(format!("bad log level: {}", e)))?,
    };

    let json = (config.log_format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_writer(std::io::stderr)
    });
    let pretty = (config.log_format == LogFormat::Pretty).then(|| {
        fmt::layer()
            .pretty()
            .with_line_number(true)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Standard log event names.
pub mod events {
    /// Process is starting up.
    pub const STARTUP: &str = "startup";

    /// The endpoint registry has been built.
    pub const ROUTES_REGISTERED: &str = "routes_registered";

    /// A compiled matcher could not be decoded and was listed as opaque.
    pub const ROUTE_DECODE_OPAQUE: &str = "route_decode_opaque";

    /// The authorization gate admitted a request.
    pub const REQUEST_ADMITTED: &str = "request_admitted";

    /// The authorization gate rejected a request.
    pub const REQUEST_REJECTED: &str = "request_rejected";

    /// A request signature was missing or did not verify.
    pub const SIGNATURE_REJECTED: &str = "signature_rejected";
}

// One macro per event so every crate logs under the same `event` field.
#[macro_export]
macro_rules! log_startup {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::STARTUP,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_routes_registered {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::ROUTES_REGISTERED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_route_decode_opaque {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::ROUTE_DECODE_OPAQUE,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_request_admitted {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::REQUEST_ADMITTED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_request_rejected {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::REQUEST_REJECTED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_signature_rejected {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::SIGNATURE_REJECTED,
            $($field)*
        )
    };
}

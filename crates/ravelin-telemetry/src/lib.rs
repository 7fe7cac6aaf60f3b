//! Logging infrastructure for Ravelin.
//!
//! Structured JSON (or pretty) logging via `tracing-subscriber`, plus the
//! standard event names every crate logs under.
//!
//! # Usage
//!
//! ```ignore
//! use ravelin_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::new().with_log_level("debug");
//! init_logging(&config)?;
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::{events, init_logging};

use thiserror::Error;

/// Telemetry errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "ravelin");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_config_builder() {
        let config = TelemetryConfig::new()
            .with_service_name("edge")
            .with_log_level("debug")
            .with_log_format(LogFormat::Pretty);

        assert_eq!(config.service_name, "edge");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_config_from_toml_table() {
        let config: TelemetryConfig =
            toml::from_str("log_level = \"warn\"\nlog_format = \"pretty\"\n").unwrap();
        assert_eq!(config.service_name, "ravelin");
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }
}

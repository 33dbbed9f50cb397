//! Configuration section types.

use hermes_telemetry::{LogConfig, LogFormat, TelemetryConfig};
use serde::{Deserialize, Serialize};

/// Transport adapter settings.
///
/// # Example
///
/// ```
/// use hermes_config::ServerConfig;
///
/// let config = ServerConfig {
///     http_addr: "127.0.0.1:3000".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(config.max_body_bytes, 2 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (e.g. "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Largest accepted request body in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            max_body_bytes: default_max_body_bytes(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_shutdown_timeout() -> u64 {
    30
}

/// Dispatcher settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Media type used when a route declares no consumes or produces.
    #[serde(default = "default_media_type")]
    pub default_media_type: String,

    /// Code reported for error entries without one.
    #[serde(default = "default_unclassified_code")]
    pub unclassified_code: String,

    /// Client message for recovered faults.
    #[serde(default = "default_internal_error_message")]
    pub internal_error_message: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_media_type: default_media_type(),
            unclassified_code: default_unclassified_code(),
            internal_error_message: default_internal_error_message(),
        }
    }
}

fn default_media_type() -> String {
    "application/json".to_string()
}

fn default_unclassified_code() -> String {
    hermes_core::UNCLASSIFIED_CODE.to_string()
}

fn default_internal_error_message() -> String {
    "internal server error".to_string()
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or a full `EnvFilter`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telemetry section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfigSection {
    /// Service name recorded in logs.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TelemetryConfigSection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_service_name() -> String {
    "hermes-service".to_string()
}

impl TelemetryConfigSection {
    /// Converts this section into the telemetry crate's configuration.
    #[must_use]
    pub fn to_telemetry_config(&self) -> TelemetryConfig {
        let pretty = self.logging.format == LogFormat::Pretty;
        TelemetryConfig::builder()
            .service_name(&self.service_name)
            .logging(LogConfig {
                enabled: self.logging.enabled,
                level: self.logging.level.clone(),
                format: self.logging.format,
                span_events: pretty,
                file_line_info: pretty,
                ..LogConfig::default()
            })
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_defaults() {
        let server = ServerConfig::default();
        assert_eq!(server.http_addr, "0.0.0.0:8080");
        assert_eq!(server.shutdown_timeout_secs, 30);

        let dispatch = DispatchConfig::default();
        assert_eq!(dispatch.default_media_type, "application/json");
        assert_eq!(dispatch.unclassified_code, "unclassified");
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let server: ServerConfig = toml::from_str("max_body_bytes = 1024").unwrap();
        assert_eq!(server.max_body_bytes, 1024);
        assert_eq!(server.http_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<DispatchConfig, _> = toml::from_str("default_mediatype = \"x/y\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_to_telemetry_config() {
        let section = TelemetryConfigSection {
            service_name: "orders".to_string(),
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                ..LoggingConfig::default()
            },
        };
        let config = section.to_telemetry_config();
        assert_eq!(config.service_name, "orders");
        assert_eq!(config.logging.service_name, "orders");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.file_line_info);
    }
}

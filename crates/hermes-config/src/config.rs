//! The root configuration type.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, DispatchConfig, ServerConfig, TelemetryConfigSection};
use hermes_registry::MediaType;

/// Complete Hermes configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and the
/// environment.
///
/// # Example
///
/// ```
/// use hermes_config::HermesConfig;
///
/// let config = HermesConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct HermesConfig {
    /// Transport adapter settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Dispatcher settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging settings.
    #[serde(default)]
    pub telemetry: TelemetryConfigSection,
}

impl HermesConfig {
    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .server
            .http_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        MediaType::parse(&self.dispatch.default_media_type).map_err(|e| {
            ConfigError::invalid_value("dispatch.default_media_type", e.to_string())
        })?;

        if self.dispatch.unclassified_code.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "dispatch.unclassified_code",
                "must not be empty",
            ));
        }

        hermes_telemetry::create_env_filter(&self.telemetry.logging.level)
            .map_err(|e| ConfigError::invalid_value("telemetry.logging.level", e.to_string()))?;

        Ok(())
    }

    /// Development preset: pretty debug logs, bound to localhost.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.server.http_addr = "127.0.0.1:8080".to_string();
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = hermes_telemetry::LogFormat::Pretty;
        config
    }

    /// Production preset: JSON logs at `info`.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = hermes_telemetry::LogFormat::Json;
        config
    }
}

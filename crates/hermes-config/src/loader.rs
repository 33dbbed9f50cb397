//! Layered configuration loading.
//!
//! Layers apply in order, later layers overriding earlier ones:
//! 1. Defaults (or a preset)
//! 2. A TOML or JSON file
//! 3. A `.env` file
//! 4. Process environment variables
//!
//! Variables use the form `PREFIX__SECTION__KEY`, e.g.
//! `HERMES__SERVER__MAX_BODY_BYTES=1048576` or
//! `HERMES__TELEMETRY__LOGGING__LEVEL=debug`.

use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, HermesConfig};
use hermes_telemetry::LogFormat;

/// Configuration loader.
///
/// # Example
///
/// ```no_run
/// use hermes_config::ConfigLoader;
///
/// # fn main() -> Result<(), hermes_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("hermes.toml")?
///     .with_dotenv()?
///     .with_env_prefix("HERMES")
///     .load()?;
/// println!("listening on {}", config.server.http_addr);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: HermesConfig,
    env_prefix: Option<String>,
    dotenv_vars: Vec<(String, String)>,
    vars: Option<Vec<(String, String)>>,
}

impl ConfigLoader {
    /// Creates a loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = HermesConfig::development();
        self
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = HermesConfig::production();
        self
    }

    /// Loads a `.toml` or `.json` file, chosen by extension.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;
        self.config = parse(&content, &format)?;
        Ok(self)
    }

    /// Loads a file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in `toml` or `json` format.
    ///
    /// ```
    /// use hermes_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[dispatch]\nunclassified_code = \"unknown\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    /// assert_eq!(config.dispatch.unclassified_code, "unknown");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Sets the environment variable prefix.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Reads `.env` from the current directory, if present.
    ///
    /// Values are applied before process variables, which take precedence.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv_iter() {
            Ok(iter) => self.collect_dotenv(iter),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads a specific dotenv file.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let iter = dotenvy::from_path_iter(path.as_ref())?;
        self.collect_dotenv(iter)
    }

    /// Replaces the process environment with a fixed set of variables.
    #[must_use]
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Applies environment overrides and validates the result.
    pub fn load(self) -> Result<HermesConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides without validating.
    pub fn load_unvalidated(mut self) -> Result<HermesConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let process = self.vars.take().unwrap_or_else(|| env::vars().collect());
            let dotenv = std::mem::take(&mut self.dotenv_vars);
            for (key, value) in dotenv.iter().chain(process.iter()) {
                if let Some(rest) = key.strip_prefix(prefix.as_str()).and_then(|k| k.strip_prefix("__")) {
                    apply_override(&mut self.config, key, rest, value)?;
                }
            }
        }
        Ok(self.config)
    }

    fn collect_dotenv<I>(mut self, iter: I) -> Result<Self, ConfigError>
    where
        I: Iterator<Item = dotenvy::Result<(String, String)>>,
    {
        for item in iter {
            self.dotenv_vars.push(item?);
        }
        Ok(self)
    }
}

fn parse(content: &str, format: &str) -> Result<HermesConfig, ConfigError> {
    match format {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

fn apply_override(
    config: &mut HermesConfig,
    var: &str,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let parts: Vec<&str> = key.split("__").collect();
    match parts.as_slice() {
        ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
        ["SERVER", "MAX_BODY_BYTES"] => {
            config.server.max_body_bytes = value
                .parse()
                .map_err(|_| ConfigError::env_override(var, "expected integer"))?;
        }
        ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
            config.server.shutdown_timeout_secs = value
                .parse()
                .map_err(|_| ConfigError::env_override(var, "expected integer"))?;
        }
        ["DISPATCH", "DEFAULT_MEDIA_TYPE"] => {
            config.dispatch.default_media_type = value.to_string();
        }
        ["DISPATCH", "UNCLASSIFIED_CODE"] => {
            config.dispatch.unclassified_code = value.to_string();
        }
        ["DISPATCH", "INTERNAL_ERROR_MESSAGE"] => {
            config.dispatch.internal_error_message = value.to_string();
        }
        ["TELEMETRY", "SERVICE_NAME"] => config.telemetry.service_name = value.to_string(),
        ["TELEMETRY", "LOGGING", "ENABLED"] => {
            config.telemetry.logging.enabled = parse_bool(value)
                .ok_or_else(|| ConfigError::env_override(var, "expected boolean"))?;
        }
        ["TELEMETRY", "LOGGING", "LEVEL"] => config.telemetry.logging.level = value.to_string(),
        ["TELEMETRY", "LOGGING", "FORMAT"] => {
            config.telemetry.logging.format = match value.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => {
                    return Err(ConfigError::env_override(
                        var,
                        "expected 'json' or 'pretty'",
                    ))
                }
            };
        }
        _ => tracing::debug!(var, "ignoring unknown configuration variable"),
    }
    Ok(())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

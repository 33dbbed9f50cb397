//! Layered configuration for Hermes.
//!
//! [`HermesConfig`] has three sections:
//!
//! - [`ServerConfig`] - transport adapter settings (address, body limit, shutdown)
//! - [`DispatchConfig`] - dispatcher defaults (media type, unclassified code, fault message)
//! - [`TelemetryConfigSection`] - service name and logging
//!
//! [`ConfigLoader`] layers defaults, a TOML or JSON file, a `.env` file and
//! `PREFIX__SECTION__KEY` environment variables, then validates the result.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! max_body_bytes = 2097152
//! shutdown_timeout_secs = 30
//!
//! [dispatch]
//! default_media_type = "application/json"
//! unclassified_code = "unclassified"
//! internal_error_message = "internal server error"
//!
//! [telemetry]
//! service_name = "orders"
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::HermesConfig;
pub use error::ConfigError;
pub use hermes_telemetry::LogFormat;
pub use loader::ConfigLoader;
pub use schema::{DispatchConfig, LoggingConfig, ServerConfig, TelemetryConfigSection};

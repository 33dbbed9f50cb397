//! # Hermes Telemetry
//!
//! Logging for the Hermes dispatch layer.
//!
//! - [`init_logging`] installs a `tracing-subscriber` with JSON or pretty output
//! - [`log_error`] writes the differentiated record for a failed request
//! - [`request_span`] opens the span that wraps one request
//!
//! # Example
//!
//! ```rust,no_run
//! use hermes_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::builder()
//!     .service_name("orders")
//!     .level("info")
//!     .build();
//! init_telemetry(&config)?;
//! # Ok::<(), hermes_telemetry::TelemetryError>(())
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod errors;
pub mod logging;
pub mod span;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use errors::{log_error, ErrorRecord};
pub use logging::{create_env_filter, fields, init_logging, LogConfig, LogFormat};
pub use span::{record_label, record_status, request_span};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging from a full telemetry configuration.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    tracing::info!(service.name = %config.service_name, "telemetry initialized");
    Ok(())
}

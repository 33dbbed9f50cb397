//! # Hermes
//!
//! **Typed request dispatch with content negotiation**
//!
//! Hermes sits between an HTTP router and application handlers:
//!
//! - **Negotiation** – picks one handler per request from the Accept and
//!   Content-Type headers, with default promotion and vendor super-type fallback
//! - **Typed inputs** – the body and up to three side-arguments (path, query,
//!   header, identity) are bound and coerced before the handler runs
//! - **Uniform failures** – every stage fails with one composite error that
//!   becomes a JSON contract for clients and a detailed record for logs
//!
//! ## Quick Start
//!
//! ```rust
//! use hermes::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Rename {
//!     name: String,
//! }
//!
//! impl Validate for Rename {
//!     fn validate(&self) -> Vec<FieldViolation> {
//!         let mut v = Violations::new("Rename");
//!         v.required("name", !self.name.is_empty());
//!         v.finish()
//!     }
//! }
//!
//! #[derive(Deserialize)]
//! struct ItemPath {
//!     id: u64,
//! }
//!
//! let dispatcher = Dispatcher::builder()
//!     .route(
//!         Route::put("/items/{id}")
//!             .body::<Rename>()
//!             .arg::<Path<ItemPath>>()
//!             .handle(|_ctx, body: Rename, (path,): (Path<ItemPath>,)| async move {
//!                 Ok::<_, Error>(Response::ok(format!("{} -> {}", path.id, body.name)))
//!             }),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let request = IncomingRequest::new(http::Method::PUT, "/items/{id}")
//!     .with_params(Params::new().with("id", "7"))
//!     .with_header(http::header::CONTENT_TYPE, "application/json".parse().unwrap())
//!     .with_body(r#"{"name":"lamp"}"#)
//!     .with_principal(Principal::new("ada"));
//!
//! let response = tokio_test::block_on(dispatcher.execute(request));
//! assert_eq!(response.status(), http::StatusCode::OK);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! transport → Negotiator → AuthZ → Extract → Decode → Hook → Validate → Handler
//!                                                                          ↓
//!           client ← WriteResponse ← ProcessResponse ←─────────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use hermes_core as core;

// Re-export registry and negotiation types
pub use hermes_registry as registry;

// Re-export extraction types
pub use hermes_extract as extract;

// Re-export logging setup
pub use hermes_telemetry as telemetry;

// Re-export configuration
pub use hermes_config as config;

// Re-export server types
pub use hermes_server as server;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use hermes::prelude::*;
///
/// let route = Route::get("/health").public();
/// ```
pub mod prelude {
    pub use hermes_core::{
        ApiError, Error, ErrorKind, HermesResult, Params, Principal, RequestContext, RequestId,
    };

    // Re-export registry types used while declaring routes
    pub use hermes_registry::{AuthCheck, MediaType, RegistrationError, ResponseProcessor};

    // Re-export common extractors and validation
    pub use hermes_extract::{
        Auth, FieldViolation, Header, NoBody, Path, Query, Validate, Violations,
    };

    // Re-export route building and execution
    pub use hermes_server::{
        Controller, Dispatcher, IncomingRequest, NoContent, Response, Route,
    };

    // Re-export configuration and logging setup
    pub use hermes_config::{ConfigLoader, HermesConfig};
    pub use hermes_telemetry::{init_logging, LogConfig};
}

//! # Hermes Registry
//!
//! Handler descriptors, media types, the handler registry and content
//! negotiation.
//!
//! Handlers may share a path and method and differ only by the media types
//! they consume and produce. The registry groups them by `(path, method)`
//! and the negotiator picks exactly one per request from the Accept and
//! Content-Type headers.
//!
//! ## Example
//!
//! ```rust
//! use hermes_registry::{HandlerDescriptor, RegistryBuilder};
//! use http::Method;
//!
//! let mut builder = RegistryBuilder::new();
//! builder.register(
//!     HandlerDescriptor::builder(Method::GET, "/orders/{id}")
//!         .produces("application/vnd.acme.order+json")
//!         .default_handler()
//!         .build()
//!         .unwrap(),
//!     "order",
//! ).unwrap();
//! builder.register(
//!     HandlerDescriptor::builder(Method::GET, "/orders/{id}")
//!         .produces("application/vnd.acme.order.summary+json")
//!         .build()
//!         .unwrap(),
//!     "summary",
//! ).unwrap();
//!
//! let registry = builder.build();
//! let selected = registry
//!     .dispatch("/orders/{id}", &Method::GET, Some("application/vnd.acme.order.summary+json"), None)
//!     .unwrap();
//! assert_eq!(*selected.handler(), "summary");
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-registry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod descriptor;
mod error;
mod media_type;
mod negotiate;
mod registry;

pub use descriptor::{normalize_path, AuthCheck, DescriptorBuilder, HandlerDescriptor, ResponseProcessor};
pub use error::{NegotiationError, RegistrationError};
pub use media_type::{parse_accept, quality, MediaRange, MediaType, MediaTypeError, APPLICATION_JSON};
pub use registry::{DescriptorGroup, Registered, Registry, RegistryBuilder};

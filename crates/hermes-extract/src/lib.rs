//! # Hermes Extract
//!
//! Typed binding of request values for Hermes handlers.
//!
//! A handler receives one *primary value* and up to three *side-arguments*.
//! The primary value is decoded from the request body for write methods and
//! synthesized from path parameters and query pairs for read-only methods.
//! Side-arguments are bound from a single source each:
//!
//! | Extractor | Source | Description |
//! |-----------|--------|-------------|
//! | [`Path<T>`] | Path parameters | Binds the router's named parameters |
//! | [`Query<T>`] | Query string | Binds query pairs, repeated keys become arrays |
//! | [`Header<T>`] | Headers | Binds request headers by lowercase name |
//! | [`Auth`] | Principal | The authenticated identity |
//!
//! String values are converted to each field's declared kind through a
//! [`CoercionTable`], computed once per type at registration.
//!
//! ## Example
//!
//! ```rust
//! use hermes_core::{Params, RequestContext};
//! use hermes_extract::{ArgList, Path, Query};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct OrderPath {
//!     id: u64,
//! }
//!
//! #[derive(Deserialize)]
//! struct Paging {
//!     limit: Option<u32>,
//! }
//!
//! let ctx = RequestContext::mock()
//!     .with_path_params(Params::new().with("id", "42"))
//!     .with_query_string("limit=10")
//!     .unwrap();
//!
//! let plan = <(Path<OrderPath>, Query<Paging>)>::plan();
//! let (path, query) = <(Path<OrderPath>, Query<Paging>)>::extract(&plan, &ctx).unwrap();
//! assert_eq!(path.id, 42);
//! assert_eq!(query.limit, Some(10));
//! ```
//!
//! ## Error Handling
//!
//! Side-argument failures surface as `InvalidArgument` (400) with the source
//! and field in the entry metadata. Body failures surface as `BodyRequired`,
//! `FailedToUnmarshal` or `PayloadTooLarge`, and structural validation
//! failures as `ValidationFailed` with one entry per violated field. A field
//! missing from the payload is reported the same way, with the `required` tag.

#![doc(html_root_url = "https://docs.rs/hermes-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod auth;
mod body;
mod coerce;
mod error;
mod extractor;
mod header;
mod path;
mod query;
mod validate;

pub use auth::Auth;
pub use body::{is_read_only, BodyFormat, BodyPlan, NoBody, RequestBody};
pub use coerce::{CoercionTable, FieldKind};
pub use error::{ArgSource, ExtractionError};
pub use extractor::{ArgList, ArgSourceExt, FromContext, PushArg};
pub use header::Header;
pub use path::Path;
pub use query::Query;
pub use validate::{violations_to_error, FieldViolation, Validate, Violations};

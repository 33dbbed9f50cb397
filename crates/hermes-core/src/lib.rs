//! # Hermes Core
//!
//! Core types for the Hermes typed request-dispatch layer.
//!
//! This crate provides the foundational types shared by every other Hermes crate:
//!
//! - [`Error`] / [`ApiError`] - The composite failure type used by every pipeline stage
//! - [`ErrorKind`] - The request-time error taxonomy
//! - [`RequestContext`] - Per-request values (params, query, headers, principal, trace ids)
//! - [`RequestId`] - UUID v7 request identifier
//! - [`Principal`] - Identity attached by the authentication collaborator
//! - [`Params`] - Path parameters delivered by the external router

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod identity;
mod params;
pub mod redact;

pub use context::{RequestContext, RequestId};
pub use error::{
    ApiError, Error, ErrorEntry, ErrorKind, ErrorResponse, HermesResult, StackTraceLogging,
    UNCLASSIFIED_CODE,
};
pub use identity::Principal;
pub use params::Params;

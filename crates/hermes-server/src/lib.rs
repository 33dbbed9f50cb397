//! # Hermes Server
//!
//! Route builder, request pipeline and transport adapter for Hermes.
//!
//! - [`Route`] - fluent builder for one typed handler
//! - [`Controller`] - routes sharing a path prefix and auth policy
//! - [`Dispatcher`] - the frozen registry plus the per-request executor
//! - [`Transport`] - hyper HTTP/1 adapter over a [`RouteResolver`] and an [`Authenticator`]
//!
//! ## Example
//!
//! ```rust
//! use hermes_core::{Error, RequestContext};
//! use hermes_extract::{NoBody, Query};
//! use hermes_server::{Dispatcher, IncomingRequest, Response, Route};
//! use http::{Method, StatusCode};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Greeting {
//!     name: String,
//! }
//!
//! # tokio_test::block_on(async {
//! let dispatcher = Dispatcher::builder()
//!     .route(
//!         Route::get("/hello")
//!             .public()
//!             .produces("text/plain")
//!             .arg::<Query<Greeting>>()
//!             .handle(|_ctx: RequestContext, _body: NoBody, (q,): (Query<Greeting>,)| async move {
//!                 Ok::<_, Error>(Response::ok(format!("hello {}", q.name)))
//!             }),
//!     )
//!     .build()?;
//!
//! let request = IncomingRequest::new(Method::GET, "/hello")
//!     .with_uri("/hello?name=ada".parse().unwrap());
//! let response = dispatcher.execute(request).await;
//! assert_eq!(response.status(), StatusCode::OK);
//! # Ok::<(), hermes_registry::RegistrationError>(())
//! # }).unwrap();
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod controller;
mod dispatcher;
mod pipeline;
mod request;
mod response;
mod route;
pub mod transport;
mod writer;

pub use controller::Controller;
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use pipeline::{authorize, Handler, Stage, StageTracker};
pub use request::{parse_traceparent, IncomingRequest, TRACEPARENT_HEADER};
pub use response::{NoContent, Response};
pub use route::{Route, RouteDef};
pub use transport::{
    bind, serve, Authenticator, NoAuthentication, RouteMatch, RouteResolver, Transport,
    TransportError,
};

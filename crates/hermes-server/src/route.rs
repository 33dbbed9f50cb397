//! Fluent route builder.
//!
//! A [`Route`] accumulates descriptor metadata, the primary value type and
//! up to three side-arguments, then [`Route::handle`] binds the handler and
//! produces a [`RouteDef`] ready for the [`Dispatcher`](crate::Dispatcher).
//!
//! ```rust
//! use hermes_core::{Error, RequestContext};
//! use hermes_extract::{Auth, Path, Validate, FieldViolation};
//! use hermes_server::{Response, Route};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize)]
//! struct OrderPath {
//!     id: u64,
//! }
//!
//! #[derive(Deserialize)]
//! struct Rename {
//!     name: String,
//! }
//!
//! impl Validate for Rename {
//!     fn validate(&self) -> Vec<FieldViolation> {
//!         Vec::new()
//!     }
//! }
//!
//! #[derive(Serialize)]
//! struct Order {
//!     id: u64,
//!     name: String,
//! }
//!
//! let route = Route::put("/orders/{id}")
//!     .body::<Rename>()
//!     .arg::<Path<OrderPath>>()
//!     .arg::<Auth>()
//!     .label("rename-order")
//!     .handle(|_ctx: RequestContext, body: Rename, (path, _auth): (Path<OrderPath>, Auth)| async move {
//!         Ok::<_, Error>(Response::ok(Order { id: path.id, name: body.name }))
//!     });
//!
//! assert_eq!(route.path(), "/orders/{id}");
//! ```

use crate::pipeline::{Handler, Hook, TypedEndpoint};
use crate::Response;
use hermes_core::{Error, RequestContext};
use hermes_extract::{ArgList, FromContext, NoBody, PushArg, RequestBody};
use hermes_registry::{AuthCheck, DescriptorBuilder, HandlerDescriptor, ResponseProcessor};
use http::{Method, StatusCode};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A route under construction.
///
/// `B` is the primary value type and `A` the side-argument tuple.
pub struct Route<B = NoBody, A = ()> {
    descriptor: DescriptorBuilder,
    auth: Option<bool>,
    hook: Option<Hook<B, A>>,
}

impl Route {
    /// Starts a route for `method` on `path`.
    pub fn new(method: Method, path: impl AsRef<str>) -> Self {
        Self {
            descriptor: HandlerDescriptor::builder(method, path),
            auth: None,
            hook: None,
        }
    }

    /// Starts a `GET` route.
    pub fn get(path: impl AsRef<str>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Starts a `POST` route.
    pub fn post(path: impl AsRef<str>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Starts a `PUT` route.
    pub fn put(path: impl AsRef<str>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Starts a `PATCH` route.
    pub fn patch(path: impl AsRef<str>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// Starts a `DELETE` route.
    pub fn delete(path: impl AsRef<str>) -> Self {
        Self::new(Method::DELETE, path)
    }
}

impl<B, A> Route<B, A> {
    /// Sets the consumed media type.
    pub fn consumes(mut self, media_type: impl Into<String>) -> Self {
        self.descriptor = self.descriptor.consumes(media_type);
        self
    }

    /// Sets the produced media type.
    pub fn produces(mut self, media_type: impl Into<String>) -> Self {
        self.descriptor = self.descriptor.produces(media_type);
        self
    }

    /// Marks this route as its group's default for negotiation.
    pub fn default_handler(mut self) -> Self {
        self.descriptor = self.descriptor.default_handler();
        self
    }

    /// Sets the success status.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.descriptor = self.descriptor.status(status);
        self
    }

    /// Opts out of authentication.
    pub fn public(mut self) -> Self {
        self.auth = Some(false);
        self
    }

    /// Requires authentication even inside a public controller.
    pub fn authenticated(mut self) -> Self {
        self.auth = Some(true);
        self
    }

    /// Adds an authorization check. Checks run in the order added.
    pub fn auth_check(mut self, check: AuthCheck) -> Self {
        self.descriptor = self.descriptor.auth_check(check);
        self
    }

    /// Requires the principal to hold `scope`.
    pub fn require_scope(self, scope: impl Into<String>) -> Self {
        self.auth_check(AuthCheck::scope(scope))
    }

    /// Adds a response processor. Processors run in the order added.
    pub fn response_processor(mut self, processor: ResponseProcessor) -> Self {
        self.descriptor = self.descriptor.response_processor(processor);
        self
    }

    /// Sets the label used in logs and tests.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.descriptor = self.descriptor.label(label);
        self
    }

    /// Sets the primary value type. Clears any pre-validation hook.
    pub fn body<T: RequestBody>(self) -> Route<T, A> {
        Route {
            descriptor: self.descriptor,
            auth: self.auth,
            hook: None,
        }
    }

    /// Appends a side-argument. Clears any pre-validation hook.
    ///
    /// At most three side-arguments are supported; a fourth does not compile.
    pub fn arg<X: FromContext>(self) -> Route<B, A::Output>
    where
        A: PushArg<X>,
    {
        Route {
            descriptor: self.descriptor,
            auth: self.auth,
            hook: None,
        }
    }

    /// Registers a hook that runs after extraction and before validation.
    ///
    /// The hook may rewrite the primary value from side-argument data, or
    /// return an error to abort the request.
    pub fn before_validate<H>(mut self, hook: H) -> Self
    where
        H: Fn(&mut B, &mut A) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Binds the handler and finishes the route.
    pub fn handle<F, Fut, T>(self, handler: F) -> RouteDef
    where
        B: RequestBody,
        A: ArgList,
        F: Fn(RequestContext, B, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<T>, Error>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let endpoint = TypedEndpoint::<B, A, F, T>::new(handler, self.hook);
        RouteDef {
            descriptor: self.descriptor,
            auth: self.auth,
            handler: Handler::new(endpoint),
        }
    }
}

impl<B, A> fmt::Debug for Route<B, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", self.descriptor.method())
            .field("path", &self.descriptor.path())
            .field("auth", &self.auth)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

/// A finished route, ready for registration.
pub struct RouteDef {
    pub(crate) descriptor: DescriptorBuilder,
    pub(crate) auth: Option<bool>,
    pub(crate) handler: Handler,
}

impl RouteDef {
    /// Returns the normalized path template.
    pub fn path(&self) -> &str {
        self.descriptor.path()
    }

    /// Returns the method.
    pub fn method(&self) -> &Method {
        self.descriptor.method()
    }
}

impl fmt::Debug for RouteDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDef")
            .field("method", self.method())
            .field("path", &self.path())
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

//! Request context types.
//!
//! The [`RequestContext`] carries all per-request state from the transport
//! boundary through the pipeline and into handlers. Handlers receive it by
//! value.

use crate::error::Error;
use crate::identity::Principal;
use crate::params::Params;
use http::{Extensions, HeaderMap, Method};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// # Example
///
/// ```
/// use hermes_core::RequestId;
///
/// let id = RequestId::new();
/// let parsed: RequestId = id.to_string().parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new time-ordered request id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID, e.g. one propagated by an upstream proxy.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Per-request context.
///
/// Holds the values the pipeline extracts before a handler runs: path
/// parameters from the router, query pairs in their original order, raw
/// headers, and the principal attached by the authentication collaborator.
/// The typed [`Extensions`] map lets hooks and handlers pass values along.
///
/// # Example
///
/// ```
/// use hermes_core::{Params, Principal, RequestContext};
/// use http::Method;
///
/// let ctx = RequestContext::new(Method::GET, "/users/{id}")
///     .with_path_params(Params::new().with("id", "42"))
///     .with_query_string("expand=orders&expand=roles")
///     .unwrap()
///     .with_principal(Principal::new("user-1"));
///
/// assert_eq!(ctx.path_param("id"), Some("42"));
/// assert_eq!(ctx.query_values("expand").count(), 2);
/// assert!(ctx.principal().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    method: Method,
    route: String,
    path_params: Params,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    principal: Option<Principal>,
    trace_id: Option<String>,
    span_id: Option<String>,
    label: Option<String>,
    extensions: Extensions,
    started_at: Instant,
}

impl RequestContext {
    /// Creates a context for `method` on the matched route template.
    #[must_use]
    pub fn new(method: Method, route: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            route: route.into(),
            path_params: Params::new(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            principal: None,
            trace_id: None,
            span_id: None,
            label: None,
            extensions: Extensions::new(),
            started_at: Instant::now(),
        }
    }

    /// Creates a `GET /` context for tests.
    #[must_use]
    pub fn mock() -> Self {
        Self::new(Method::GET, "/")
    }

    /// Replaces the request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Sets the path parameters.
    #[must_use]
    pub fn with_path_params(mut self, params: Params) -> Self {
        self.path_params = params;
        self
    }

    /// Sets the query pairs.
    #[must_use]
    pub fn with_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    /// Parses a raw query string (without the leading `?`) into ordered pairs.
    pub fn with_query_string(mut self, query: &str) -> Result<Self, Error> {
        self.query = serde_urlencoded::from_str(query).map_err(|e| {
            Error::invalid_argument("malformed query string")
                .with_metadata("source", "query")
                .with_cause(e)
        })?;
        Ok(self)
    }

    /// Sets the raw headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Attaches an authenticated principal.
    #[must_use]
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Sets the trace id.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Sets the span id.
    #[must_use]
    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }

    /// Sets the matched descriptor's label.
    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    /// Returns the request id.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the matched route template.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Returns all path parameters.
    #[must_use]
    pub fn path_params(&self) -> &Params {
        &self.path_params
    }

    /// Returns one path parameter.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    /// Returns the query pairs in request order.
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Iterates over every value for a query key.
    pub fn query_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the raw headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the principal, if one was attached.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Returns the trace id.
    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Returns the span id.
    #[must_use]
    pub fn span_id(&self) -> Option<&str> {
        self.span_id.as_deref()
    }

    /// Returns the matched descriptor's label.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the typed extension map.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Returns the typed extension map mutably.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Returns the time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

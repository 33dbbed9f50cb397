//! The executor's input.

use bytes::Bytes;
use hermes_core::{Params, Principal, RequestContext};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};

/// The W3C trace context header.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// One request as delivered by the transport and router.
///
/// `route` is the matched route template (e.g. `/orders/{id}`), not the raw
/// path; `params` holds the values the router extracted for it.
///
/// # Example
///
/// ```rust
/// use hermes_core::Params;
/// use hermes_server::IncomingRequest;
/// use http::Method;
///
/// let request = IncomingRequest::new(Method::GET, "/orders/{id}")
///     .with_params(Params::new().with("id", "42"))
///     .with_uri("/orders/42?expand=items".parse().unwrap());
///
/// assert_eq!(request.route(), "/orders/{id}");
/// ```
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    method: Method,
    route: String,
    params: Params,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    principal: Option<Principal>,
    trace_id: Option<String>,
    span_id: Option<String>,
}

impl IncomingRequest {
    /// Creates a request for `method` on the route template `route`.
    pub fn new(method: Method, route: impl Into<String>) -> Self {
        Self {
            method,
            route: route.into(),
            params: Params::new(),
            uri: Uri::default(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            principal: None,
            trace_id: None,
            span_id: None,
        }
    }

    /// Sets the path parameters.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Sets the request URI. Its query string becomes the query pairs.
    #[must_use]
    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    /// Replaces the headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Appends one header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Attaches the principal produced by the authentication collaborator.
    #[must_use]
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Sets the trace id. Overrides any `traceparent` header.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Sets the span id. Overrides any `traceparent` header.
    #[must_use]
    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }

    /// Returns the method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the route template.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Returns the URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Splits into a context (without query pairs), the raw query and the body.
    pub(crate) fn into_parts(self) -> (RequestContext, String, Bytes) {
        let propagated = self
            .headers
            .get(TRACEPARENT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_traceparent);

        let mut ctx = RequestContext::new(self.method, self.route)
            .with_path_params(self.params)
            .with_headers(self.headers);
        if let Some(principal) = self.principal {
            ctx = ctx.with_principal(principal);
        }

        let (header_trace, header_span) = propagated.unzip();
        if let Some(trace_id) = self.trace_id.or(header_trace) {
            ctx = ctx.with_trace_id(trace_id);
        }
        if let Some(span_id) = self.span_id.or(header_span) {
            ctx = ctx.with_span_id(span_id);
        }

        let query = self.uri.query().unwrap_or_default().to_string();
        (ctx, query, self.body)
    }
}

/// Parses `{version}-{trace-id}-{parent-id}-{flags}` into trace and span ids.
///
/// Only version `00` is accepted.
pub fn parse_traceparent(value: &str) -> Option<(String, String)> {
    let mut parts = value.trim().split('-');
    let (version, trace_id, span_id, flags) =
        (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || version != "00" {
        return None;
    }
    let hex = |s: &str, len: usize| s.len() == len && s.chars().all(|c| c.is_ascii_hexdigit());
    if !hex(trace_id, 32) || !hex(span_id, 16) || !hex(flags, 2) {
        return None;
    }
    if trace_id.bytes().all(|b| b == b'0') || span_id.bytes().all(|b| b == b'0') {
        return None;
    }
    Some((trace_id.to_ascii_lowercase(), span_id.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARENT: &str = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";

    #[test]
    fn test_parse_traceparent() {
        assert_eq!(
            parse_traceparent(PARENT),
            Some((
                "0af7651916cd43dd8448eb211c80319c".to_string(),
                "b7ad6b7169203331".to_string()
            ))
        );
        assert_eq!(parse_traceparent("01-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01"), None);
        assert_eq!(parse_traceparent("00-short-b7ad6b7169203331-01"), None);
        assert_eq!(parse_traceparent(&format!("{PARENT}-extra")), None);
        assert_eq!(
            parse_traceparent("00-00000000000000000000000000000000-b7ad6b7169203331-01"),
            None
        );
    }

    #[test]
    fn test_into_parts_uses_traceparent_fallback() {
        let request = IncomingRequest::new(Method::GET, "/orders/{id}")
            .with_params(Params::new().with("id", "7"))
            .with_uri("/orders/7?expand=items&expand=notes".parse().unwrap())
            .with_header(
                HeaderName::from_static(TRACEPARENT_HEADER),
                HeaderValue::from_static(PARENT),
            )
            .with_span_id("explicit")
            .with_principal(Principal::new("ada"));

        let (ctx, query, body) = request.into_parts();
        assert_eq!(ctx.route(), "/orders/{id}");
        assert_eq!(ctx.path_param("id"), Some("7"));
        assert_eq!(ctx.trace_id(), Some("0af7651916cd43dd8448eb211c80319c"));
        assert_eq!(ctx.span_id(), Some("explicit"));
        assert_eq!(ctx.principal().map(|p| p.subject.as_str()), Some("ada"));
        assert_eq!(query, "expand=items&expand=notes");
        assert!(body.is_empty());
    }
}

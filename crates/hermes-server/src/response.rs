//! Handler return values.

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;

/// The value a handler returns on success.
///
/// The body is optional so handlers can return an empty response. An empty
/// body is only valid when `T` is a bodyless type ([`NoContent`] or `()`);
/// for any other `T` the pipeline reports
/// `ServerFailedToProduceExpectedResponse`.
///
/// # Example
///
/// ```rust
/// use hermes_server::Response;
/// use http::StatusCode;
///
/// let response = Response::ok("hello").with_status(StatusCode::ACCEPTED);
/// assert_eq!(response.status(), Some(StatusCode::ACCEPTED));
/// assert_eq!(response.body(), Some(&"hello"));
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    body: Option<T>,
    status: Option<StatusCode>,
    headers: HeaderMap,
}

impl<T> Response<T> {
    /// A response carrying `body`.
    #[must_use]
    pub fn ok(body: T) -> Self {
        Self {
            body: Some(body),
            status: None,
            headers: HeaderMap::new(),
        }
    }

    /// A `201 Created` response carrying `body`.
    #[must_use]
    pub fn created(body: T) -> Self {
        Self::ok(body).with_status(StatusCode::CREATED)
    }

    /// A response without a body.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            body: None,
            status: None,
            headers: HeaderMap::new(),
        }
    }

    /// Overrides the status code. Takes precedence over the route's status.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Adds a response header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Returns the body.
    pub fn body(&self) -> Option<&T> {
        self.body.as_ref()
    }

    /// Returns the status override.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns the headers set by the handler.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Splits the response into body, status override and headers.
    pub fn into_parts(self) -> (Option<T>, Option<StatusCode>, HeaderMap) {
        (self.body, self.status, self.headers)
    }
}

/// A deliberately bodyless response type.
///
/// `Response::<NoContent>::empty()` is written as `204 No Content` unless a
/// status is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NoContent;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_sets_status() {
        let response = Response::created(5_u32);
        assert_eq!(response.status(), Some(StatusCode::CREATED));
        assert_eq!(response.body(), Some(&5));
    }

    #[test]
    fn test_headers_accumulate() {
        let response = Response::<NoContent>::empty()
            .with_header(HeaderName::from_static("x-a"), HeaderValue::from_static("1"))
            .with_header(HeaderName::from_static("x-a"), HeaderValue::from_static("2"));
        let (body, status, headers) = response.into_parts();
        assert!(body.is_none());
        assert!(status.is_none());
        assert_eq!(headers.get_all("x-a").iter().count(), 2);
    }
}

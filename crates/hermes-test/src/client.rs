//! In-memory client driving a [`Dispatcher`].

use crate::error::TestError;
use crate::response::TestResponse;
use bytes::Bytes;
use hermes_core::{Params, Principal};
use hermes_server::{Dispatcher, IncomingRequest};
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use serde::Serialize;

/// A client that sends requests straight into a [`Dispatcher`].
///
/// No socket and no router are involved. The route template defaults to the
/// URI path, so requests against literal routes need no extra setup. Routes
/// with path variables take [`TestClientRequest::route`] and
/// [`TestClientRequest::param`].
///
/// # Example
///
/// ```ignore
/// let client = TestClient::new(dispatcher);
///
/// let response = client
///     .get("/orders/42")
///     .route("/orders/{id}")
///     .param("id", "42")
///     .principal(Principal::new("ada"))
///     .send()
///     .await;
///
/// response.assert_status(StatusCode::OK);
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct TestClient {
    dispatcher: Dispatcher,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client for `dispatcher`.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            default_headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Returns the dispatcher under test.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Starts a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a PATCH request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts a request with an arbitrary method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        let mut request = TestClientRequest {
            client: self,
            method,
            uri: uri.as_ref().to_string(),
            route: None,
            params: Params::new(),
            headers: Vec::new(),
            body: Bytes::new(),
            principal: None,
            error: None,
        };
        for (name, value) in &self.default_headers {
            request = request.header(name, value);
        }
        request
    }
}

/// A request being assembled by a [`TestClient`].
#[must_use]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    method: Method,
    uri: String,
    route: Option<String>,
    params: Params,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
    principal: Option<Principal>,
    error: Option<TestError>,
}

impl TestClientRequest<'_> {
    /// Appends a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = match HeaderName::try_from(name.as_ref()) {
            Ok(name) => name,
            Err(e) => return self.fail(TestError::InvalidHeader(e.to_string())),
        };
        match HeaderValue::try_from(value.as_ref()) {
            Ok(value) => self.headers.push((name, value)),
            Err(e) => return self.fail(TestError::InvalidHeader(e.to_string())),
        }
        self
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the `Accept` header.
    pub fn accept(self, accept: impl AsRef<str>) -> Self {
        self.header(header::ACCEPT.as_str(), accept)
    }

    /// Serializes `value` as the body and sets `Content-Type: application/json`.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Bytes::from(bytes),
            Err(e) => return self.fail(TestError::Json(e)),
        }
        self.content_type("application/json")
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Attaches an authenticated principal.
    pub fn principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Sets the matched route template. Defaults to the URI path.
    pub fn route(mut self, template: impl Into<String>) -> Self {
        self.route = Some(template.into());
        self
    }

    /// Adds a path parameter value.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(name, value);
        self
    }

    fn fail(mut self, error: TestError) -> Self {
        self.error.get_or_insert(error);
        self
    }

    /// Sends the request, panicking if it could not be built.
    ///
    /// # Panics
    ///
    /// Panics on an invalid URI, header or JSON body.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Sends the request.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("invalid URI: {e}")))?;
        let route = self.route.unwrap_or_else(|| uri.path().to_string());

        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            headers.append(name, value);
        }

        let mut request = IncomingRequest::new(self.method, route)
            .with_params(self.params)
            .with_uri(uri)
            .with_headers(headers)
            .with_body(self.body);
        if let Some(principal) = self.principal {
            request = request.with_principal(principal);
        }

        let response = self.client.dispatcher.execute(request).await;
        TestResponse::from_http(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::Error;
    use hermes_extract::{Header, NoBody, Path};
    use hermes_server::{Response, Route};
    use http::StatusCode;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Id {
        id: u32,
    }

    #[derive(Deserialize)]
    struct Tenant {
        x_tenant: Option<String>,
    }

    fn client() -> TestClient {
        let dispatcher = Dispatcher::builder()
            .route(
                Route::get("/items/{id}")
                    .public()
                    .arg::<Path<Id>>()
                    .arg::<Header<Tenant>>()
                    .handle(
                        |_ctx, _body: NoBody, (path, tenant): (Path<Id>, Header<Tenant>)| async move {
                            let tenant = tenant.0.x_tenant.unwrap_or_default();
                            Ok::<_, Error>(Response::ok(format!("{tenant}:{}", path.id)))
                        },
                    ),
            )
            .route(Route::get("/ping").public().handle(|_ctx, _body: NoBody, (): ()| async move {
                Ok::<_, Error>(Response::ok("pong"))
            }))
            .build()
            .unwrap();
        TestClient::new(dispatcher)
    }

    #[tokio::test]
    async fn test_route_and_params() {
        let response = client()
            .get("/items/7")
            .route("/items/{id}")
            .param("id", "7")
            .send()
            .await;
        response.assert_status(StatusCode::OK);
        assert_eq!(response.json::<String>().unwrap(), ":7");
    }

    #[tokio::test]
    async fn test_route_defaults_to_path() {
        let response = client().get("/ping?verbose=1").send().await;
        response.assert_status(StatusCode::OK);
        assert_eq!(response.json::<String>().unwrap(), "pong");
    }

    #[tokio::test]
    async fn test_default_headers_are_sent() {
        let client = client().with_default_header("x-tenant", "acme");
        let response = client
            .get("/items/3")
            .route("/items/{id}")
            .param("id", "3")
            .send()
            .await;
        assert_eq!(response.json::<String>().unwrap(), "acme:3");
    }

    #[tokio::test]
    async fn test_invalid_header_is_reported() {
        let client = client();
        let result = client.get("/items/1").header("bad header", "x").try_send().await;
        assert!(matches!(result, Err(TestError::InvalidHeader(_))));
    }
}

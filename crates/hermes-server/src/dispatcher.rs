//! The request executor.
//!
//! [`Dispatcher`] owns the frozen registry and runs every request through
//! negotiation and the stage sequence. Failures, including panics, are caught
//! once here: logged through `hermes-telemetry` and written using the JSON
//! error contract.

use crate::pipeline::{authorize, Handler, Input, Stage, StageTracker};
use crate::writer::{write_error, write_reply};
use crate::{Controller, IncomingRequest, RouteDef};
use bytes::Bytes;
use futures_util::FutureExt;
use hermes_config::HermesConfig;
use hermes_core::{ApiError, Error, ErrorKind, RequestContext, UNCLASSIFIED_CODE};
use hermes_extract::BodyFormat;
use hermes_registry::{MediaType, NegotiationError, RegistrationError, Registry, RegistryBuilder};
use hermes_telemetry::{fields, log_error, record_label, record_status, request_span};
use http::header::{ACCEPT, ALLOW, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{Instrument, Span};
use uuid::Uuid;

const DEFAULT_INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Request-time settings shared by every request.
#[derive(Debug, Clone)]
struct Settings {
    max_body_bytes: Option<usize>,
    unclassified_code: String,
    internal_error_message: String,
}

/// Builder for [`Dispatcher`].
#[derive(Debug)]
pub struct DispatcherBuilder {
    routes: Vec<RouteDef>,
    default_media_type: String,
    settings: Settings,
}

impl DispatcherBuilder {
    fn new() -> Self {
        Self {
            routes: Vec::new(),
            default_media_type: hermes_registry::APPLICATION_JSON.to_string(),
            settings: Settings {
                max_body_bytes: None,
                unclassified_code: UNCLASSIFIED_CODE.to_string(),
                internal_error_message: DEFAULT_INTERNAL_ERROR_MESSAGE.to_string(),
            },
        }
    }

    /// Adds a route.
    #[must_use]
    pub fn route(mut self, route: RouteDef) -> Self {
        self.routes.push(route);
        self
    }

    /// Adds every route of a controller.
    #[must_use]
    pub fn controller(mut self, controller: Controller) -> Self {
        self.routes.extend(controller.into_routes());
        self
    }

    /// Media type used for routes that do not set consumes or produces.
    #[must_use]
    pub fn default_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.default_media_type = media_type.into();
        self
    }

    /// Rejects bodies larger than `limit` bytes with `PayloadTooLarge`.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.settings.max_body_bytes = Some(limit);
        self
    }

    /// Code reported for error entries without one.
    #[must_use]
    pub fn unclassified_code(mut self, code: impl Into<String>) -> Self {
        self.settings.unclassified_code = code.into();
        self
    }

    /// Client-facing message for recovered panics.
    #[must_use]
    pub fn internal_error_message(mut self, message: impl Into<String>) -> Self {
        self.settings.internal_error_message = message.into();
        self
    }

    /// Applies the `server` and `dispatch` sections of `config`.
    #[must_use]
    pub fn with_config(self, config: &HermesConfig) -> Self {
        self.default_media_type(config.dispatch.default_media_type.clone())
            .max_body_bytes(config.server.max_body_bytes)
            .unclassified_code(config.dispatch.unclassified_code.clone())
            .internal_error_message(config.dispatch.internal_error_message.clone())
    }

    /// Registers every route and freezes the registry.
    ///
    /// Fails on the first inconsistent registration.
    pub fn build(self) -> Result<Dispatcher, RegistrationError> {
        let default = MediaType::parse(&self.default_media_type)?;
        let mut registry = RegistryBuilder::new();
        for route in self.routes {
            let descriptor = route
                .descriptor
                .auth_required(route.auth.unwrap_or(true))
                .build_with_default(&default)?;
            registry.register(descriptor, route.handler)?;
        }
        Ok(Dispatcher {
            registry: Arc::new(registry.build()),
            settings: Arc::new(self.settings),
        })
    }
}

/// Executes requests against a frozen registry.
///
/// Cheap to clone; clones share the registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry<Handler>>,
    settings: Arc<Settings>,
}

impl Dispatcher {
    /// Starts a dispatcher.
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Registry<Handler> {
        &self.registry
    }

    /// Runs one request to completion.
    ///
    /// Never fails: every error, including a panic in the handler, becomes
    /// an error response.
    pub async fn execute(&self, request: IncomingRequest) -> http::Response<Full<Bytes>> {
        let (ctx, query, body) = request.into_parts();
        let span = request_span(&ctx);
        let tracker = StageTracker::new();
        let mut log_ctx = ctx.clone();

        let outcome = AssertUnwindSafe(self.run(ctx, &query, body, &tracker, &mut log_ctx, &span))
            .catch_unwind()
            .instrument(span.clone())
            .await;
        let result = outcome.unwrap_or_else(|panic| Err(self.panic_error(panic.as_ref())));

        let response = match result {
            Ok(response) => {
                tracker.enter(Stage::Done);
                response
            }
            Err(err) => {
                let stage = tracker.current();
                tracker.enter(Stage::Aborted);
                let err = err.with_log_field(fields::STAGE, stage.as_str());
                span.in_scope(|| self.error_response(&err, &log_ctx))
            }
        };
        record_status(&span, response.status().as_u16());
        response
    }

    /// Logs `err` and writes the client-facing error response.
    pub fn error_response(&self, err: &Error, ctx: &RequestContext) -> http::Response<Full<Bytes>> {
        let error_id = Uuid::now_v7().to_string();
        log_error(err, ctx, &error_id);
        write_error(err, &error_id, &self.settings.unclassified_code)
    }

    async fn run(
        &self,
        ctx: RequestContext,
        query: &str,
        body: Bytes,
        tracker: &StageTracker,
        log_ctx: &mut RequestContext,
        span: &Span,
    ) -> Result<http::Response<Full<Bytes>>, Error> {
        let mut ctx = ctx.with_query_string(query)?;

        let accept = header_value(ctx.headers(), &ACCEPT);
        let content_type = header_value(ctx.headers(), &CONTENT_TYPE);
        let registered = self
            .registry
            .dispatch(ctx.route(), ctx.method(), accept.as_deref(), content_type.as_deref())
            .map_err(negotiation_error)?;
        let descriptor = registered.descriptor();

        if let Some(label) = descriptor.label() {
            ctx.set_label(Some(label.to_string()));
            log_ctx.set_label(Some(label.to_string()));
            record_label(span, label);
        }

        tracker.enter(Stage::AuthZ);
        authorize(descriptor, &ctx)?;

        let format = if descriptor.consumes().is_text_plain() {
            BodyFormat::Text
        } else {
            BodyFormat::Json
        };
        let input = Input {
            body,
            format,
            max_body_bytes: self.settings.max_body_bytes,
            produces: descriptor.produces(),
            descriptor,
            tracker,
        };
        let reply = registered.handler().endpoint().call(ctx, input).await?;

        tracker.enter(Stage::WriteResponse);
        Ok(write_reply(reply, descriptor, descriptor.produces()))
    }

    #[track_caller]
    fn panic_error(&self, panic: &(dyn Any + Send)) -> Error {
        let detail = panic
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Error::from_entries(
            ErrorKind::InternalServerError,
            [ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                self.settings.internal_error_message.clone(),
            )],
        )
        .with_cause(anyhow::anyhow!("handler panicked: {detail}"))
        .with_log_message("recovered from panic")
    }
}

fn header_value(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Converts a negotiation failure, adding `Allow` for `MethodNotAllowed`.
#[track_caller]
fn negotiation_error(err: NegotiationError) -> Error {
    let allow = match &err {
        NegotiationError::MethodNotAllowed { allowed, .. } => {
            HeaderValue::from_str(&allowed.join(", ")).ok()
        }
        _ => None,
    };
    let converted = Error::from(err);
    match allow {
        Some(value) => converted.with_header(ALLOW, value),
        None => converted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NoContent, Response, Route};
    use hermes_core::Principal;
    use hermes_extract::{FieldViolation, NoBody, Path, Validate, Violations};
    use http::Method;
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use serde_json::{json, Value};

    #[derive(Debug, Deserialize)]
    struct CreateUser {
        #[serde(default)]
        name: String,
    }

    impl Validate for CreateUser {
        fn validate(&self) -> Vec<FieldViolation> {
            let mut v = Violations::new("CreateUser");
            v.required("Name", !self.name.is_empty());
            v.finish()
        }
    }

    #[derive(Debug, Deserialize)]
    struct UserPath {
        id: u64,
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::builder()
            .route(
                Route::post("/users")
                    .body::<CreateUser>()
                    .status(StatusCode::CREATED)
                    .label("create-user")
                    .handle(|_ctx, body: CreateUser, (): ()| async move {
                        Ok(Response::ok(json!({ "name": body.name })))
                    }),
            )
            .route(
                Route::get("/users/{id}")
                    .arg::<Path<UserPath>>()
                    .public()
                    .handle(|_ctx, _body: NoBody, (path,): (Path<UserPath>,)| async move {
                        Ok(Response::ok(json!({ "id": path.id })))
                    }),
            )
            .route(
                Route::delete("/users/{id}")
                    .public()
                    .handle(|_ctx, _body: NoBody, (): ()| async move {
                        Ok(Response::<NoContent>::empty())
                    }),
            )
            .route(
                Route::get("/boom").public().handle(|_ctx, _body: NoBody, (): ()| async move {
                    if true {
                        panic!("secret panic detail");
                    }
                    Ok(Response::ok(0_u8))
                }),
            )
            .build()
            .unwrap()
    }

    async fn json_body(response: http::Response<Full<Bytes>>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_user(body: &'static str) -> IncomingRequest {
        IncomingRequest::new(Method::POST, "/users")
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(body)
    }

    #[tokio::test]
    async fn test_success_uses_route_status() {
        let response = dispatcher()
            .execute(post_user(r#"{"name":"ada"}"#).with_principal(Principal::new("u1")))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(json_body(response).await["name"], "ada");
    }

    #[tokio::test]
    async fn test_missing_principal_is_401() {
        let response = dispatcher().execute(post_user(r#"{"name":"ada"}"#)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["errors"][0]["code"], "invalid_credentials");
        assert!(Uuid::parse_str(body["error_id"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_validation_failure_names_field() {
        let response = dispatcher()
            .execute(post_user("{}").with_principal(Principal::new("u1")))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        let errors = body["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["metadata"]["field"], "Name");
        assert_eq!(errors[0]["metadata"]["tag"], "required");
    }

    #[tokio::test]
    async fn test_path_argument_and_public_route() {
        let request = IncomingRequest::new(Method::GET, "/users/{id}")
            .with_params(hermes_core::Params::new().with("id", "12"));
        let response = dispatcher().execute(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["id"], 12);
    }

    #[tokio::test]
    async fn test_no_content() {
        let response = dispatcher()
            .execute(IncomingRequest::new(Method::DELETE, "/users/{id}"))
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_method_not_allowed_sets_allow() {
        let response = dispatcher()
            .execute(IncomingRequest::new(Method::PATCH, "/users/{id}"))
            .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "DELETE, GET");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = dispatcher()
            .execute(IncomingRequest::new(Method::GET, "/nope"))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_panic_is_recovered_without_leaking() {
        let response = dispatcher()
            .execute(IncomingRequest::new(Method::GET, "/boom"))
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["errors"][0]["message"], "internal server error");
        assert_eq!(body["errors"][0]["code"], "internal_server_error");
        assert!(!body.to_string().contains("secret panic detail"));
    }

    #[test]
    fn test_duplicate_registration_fails_build() {
        let route = || {
            Route::get("/dup").handle(|_ctx, _body: NoBody, (): ()| async move {
                Ok(Response::ok(1_u8))
            })
        };
        let err = Dispatcher::builder()
            .route(route())
            .route(route())
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateHandler { .. }));
    }

    #[test]
    fn test_invalid_default_media_type_fails_build() {
        let err = Dispatcher::builder()
            .default_media_type("not a media type")
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidMediaType(_)));
    }
}

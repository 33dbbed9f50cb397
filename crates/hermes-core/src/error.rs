//! Error model for Hermes.
//!
//! Every failure in the request pipeline is represented by a single composite
//! [`Error`]. An `Error` carries:
//!
//! - an ordered list of client-facing [`ApiError`] entries
//! - a taxonomy [`ErrorKind`]
//! - server-only diagnostics: cause, backtrace, call-site origin, log message
//!   and extra log fields
//! - extra response headers
//! - a [`StackTraceLogging`] policy
//!
//! Only the entries ever reach the client, through [`Error::to_response`].
//! Everything else is confined to the server-side log record.
//!
//! # Example
//!
//! ```
//! use hermes_core::{Error, ErrorKind};
//! use http::StatusCode;
//!
//! let err = Error::new(StatusCode::CONFLICT, "user already exists")
//!     .with_code("user_exists")
//!     .with_metadata("user_id", "u-42");
//!
//! assert_eq!(err.kind(), ErrorKind::Handler);
//! assert_eq!(err.status(), StatusCode::CONFLICT);
//!
//! let body = err.to_response("err-1", hermes_core::UNCLASSIFIED_CODE);
//! assert_eq!(body.errors[0].code, "user_exists");
//! ```

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::panic::Location;

/// Result type alias using [`Error`].
pub type HermesResult<T> = Result<T, Error>;

/// Code reported to clients for entries that were never classified.
pub const UNCLASSIFIED_CODE: &str = "unclassified";

/// Request-time error taxonomy.
///
/// Each kind maps to a default HTTP status and a default client-facing code.
/// [`ErrorKind::Handler`] is used for failures raised by application handlers,
/// whose status and code are chosen by the handler itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No authenticated principal on an auth-required route.
    InvalidCredentials,
    /// An authorization check rejected the principal.
    NotAuthorized,
    /// A write method arrived without the body its handler requires.
    BodyRequired,
    /// The request body could not be decoded.
    FailedToUnmarshal,
    /// Structural validation of the primary value failed.
    ValidationFailed,
    /// A side-argument could not be bound from its source.
    InvalidArgument,
    /// No descriptor group exists for the requested path.
    RouteNotFound,
    /// The path exists but not for this method.
    MethodNotAllowed,
    /// No registered produces type satisfies the Accept header.
    NotAcceptable,
    /// No registered consumes type satisfies the Content-Type header.
    UnsupportedMediaType,
    /// The request body exceeds the configured limit.
    PayloadTooLarge,
    /// An unrecoverable fault was recovered at the request boundary.
    InternalServerError,
    /// A handler returned no body for a response type that requires one.
    ServerFailedToProduceExpectedResponse,
    /// The response body could not be encoded for its content type.
    FailedToWriteResponse,
    /// A failure raised by application code.
    Handler,
}

impl ErrorKind {
    /// Returns the default HTTP status code for this kind.
    #[must_use]
    pub const fn default_status(self) -> StatusCode {
        match self {
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::NotAuthorized => StatusCode::FORBIDDEN,
            Self::BodyRequired
            | Self::FailedToUnmarshal
            | Self::ValidationFailed
            | Self::InvalidArgument
            | Self::NotAcceptable
            | Self::UnsupportedMediaType => StatusCode::BAD_REQUEST,
            Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InternalServerError
            | Self::ServerFailedToProduceExpectedResponse
            | Self::FailedToWriteResponse
            | Self::Handler => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the stable snake_case name of this kind.
    ///
    /// This is also the client-facing code for every kind except
    /// [`ErrorKind::Handler`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::NotAuthorized => "not_authorized",
            Self::BodyRequired => "body_required",
            Self::FailedToUnmarshal => "failed_to_unmarshal",
            Self::ValidationFailed => "validation_failed",
            Self::InvalidArgument => "invalid_argument",
            Self::RouteNotFound => "route_not_found",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::NotAcceptable => "not_acceptable",
            Self::UnsupportedMediaType => "unsupported_media_type",
            Self::PayloadTooLarge => "payload_too_large",
            Self::InternalServerError => "internal_server_error",
            Self::ServerFailedToProduceExpectedResponse => {
                "server_failed_to_produce_expected_response"
            }
            Self::FailedToWriteResponse => "failed_to_write_response",
            Self::Handler => "handler",
        }
    }

    /// Returns the default client-facing code, if this kind has one.
    #[must_use]
    pub const fn default_code(self) -> Option<&'static str> {
        match self {
            Self::Handler => None,
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controls whether the backtrace is attached to the log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackTraceLogging {
    /// Attach for statuses outside 400-499, omit for client errors.
    #[default]
    Default,
    /// Always attach.
    Force,
    /// Never attach.
    Suppress,
}

/// One client-facing error entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    message: String,
    metadata: Map<String, Value>,
    status: StatusCode,
    code: Option<String>,
}

impl ApiError {
    /// Creates an entry with a status and message.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            metadata: Map::new(),
            status,
            code: None,
        }
    }

    /// Sets the business code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the metadata map.
    #[must_use]
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Returns the HTTP status of this entry.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the business code, if one was set.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

/// The composite pipeline error.
///
/// Constructors are `#[track_caller]`, so [`Error::origin`] reports the line
/// that created the error rather than a line inside this module.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    errors: Vec<ApiError>,
    cause: Option<anyhow::Error>,
    backtrace: Backtrace,
    origin: &'static Location<'static>,
    log_message: Option<String>,
    log_fields: Map<String, Value>,
    response_headers: HeaderMap,
    stack_trace_logging: StackTraceLogging,
}

impl Error {
    #[track_caller]
    fn with_entries(kind: ErrorKind, errors: Vec<ApiError>) -> Self {
        Self {
            kind,
            errors,
            cause: None,
            backtrace: Backtrace::capture(),
            origin: Location::caller(),
            log_message: None,
            log_fields: Map::new(),
            response_headers: HeaderMap::new(),
            stack_trace_logging: StackTraceLogging::Default,
        }
    }

    #[track_caller]
    fn of_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let mut entry = ApiError::new(kind.default_status(), message);
        entry.code = kind.default_code().map(str::to_string);
        Self::with_entries(kind, vec![entry])
    }

    /// Creates a handler-defined error with a status and message.
    #[track_caller]
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self::with_entries(ErrorKind::Handler, vec![ApiError::new(status, message)])
    }

    /// Creates an error of the given kind from pre-built entries.
    ///
    /// Entries without a code receive the kind's default code.
    #[track_caller]
    #[must_use]
    pub fn from_entries(kind: ErrorKind, entries: impl IntoIterator<Item = ApiError>) -> Self {
        let errors = entries
            .into_iter()
            .map(|mut entry| {
                if entry.code.is_none() {
                    entry.code = kind.default_code().map(str::to_string);
                }
                entry
            })
            .collect();
        Self::with_entries(kind, errors)
    }

    /// The route requires authentication and no principal is present.
    #[track_caller]
    #[must_use]
    pub fn invalid_credentials() -> Self {
        Self::of_kind(ErrorKind::InvalidCredentials, "invalid credentials")
    }

    /// An authorization check failed with the given message.
    #[track_caller]
    #[must_use]
    pub fn not_authorized(message: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::NotAuthorized, message)
    }

    /// A write method arrived without a body.
    #[track_caller]
    #[must_use]
    pub fn body_required() -> Self {
        Self::of_kind(ErrorKind::BodyRequired, "request body is required")
    }

    /// The body could not be decoded; `diagnostics` becomes entry metadata.
    #[track_caller]
    #[must_use]
    pub fn failed_to_unmarshal(message: impl Into<String>, diagnostics: Map<String, Value>) -> Self {
        let mut err = Self::of_kind(ErrorKind::FailedToUnmarshal, message);
        err.errors[0].metadata = diagnostics;
        err
    }

    /// A side-argument could not be bound.
    #[track_caller]
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::InvalidArgument, message)
    }

    /// No route is registered for the path.
    #[track_caller]
    #[must_use]
    pub fn route_not_found(path: &str) -> Self {
        Self::of_kind(ErrorKind::RouteNotFound, "route not found").with_metadata("path", path)
    }

    /// The path exists but not for this method.
    #[track_caller]
    #[must_use]
    pub fn method_not_allowed(method: &str, allowed: Vec<String>) -> Self {
        Self::of_kind(
            ErrorKind::MethodNotAllowed,
            format!("method {method} is not allowed"),
        )
        .with_metadata("allowed", allowed)
    }

    /// No registered produces type satisfies `accept`.
    #[track_caller]
    #[must_use]
    pub fn not_acceptable(accept: &str, available: Value) -> Self {
        Self::of_kind(
            ErrorKind::NotAcceptable,
            format!("no handler produces a media type acceptable for '{accept}'"),
        )
        .with_metadata("accept", accept)
        .with_metadata("available", available)
    }

    /// No registered consumes type satisfies `content_type`.
    #[track_caller]
    #[must_use]
    pub fn unsupported_media_type(content_type: &str, available: Value) -> Self {
        Self::of_kind(
            ErrorKind::UnsupportedMediaType,
            format!("no handler consumes '{content_type}'"),
        )
        .with_metadata("content_type", content_type)
        .with_metadata("available", available)
    }

    /// The body exceeds `limit` bytes.
    #[track_caller]
    #[must_use]
    pub fn payload_too_large(limit: usize, actual: usize) -> Self {
        Self::of_kind(
            ErrorKind::PayloadTooLarge,
            format!("payload too large: max {limit} bytes"),
        )
        .with_metadata("limit", limit)
        .with_log_field("actual_size", actual)
    }

    /// A recovered fault. The message is generic; attach details with [`Error::with_cause`].
    #[track_caller]
    #[must_use]
    pub fn internal() -> Self {
        Self::of_kind(ErrorKind::InternalServerError, "internal server error")
    }

    /// The handler returned no body for a response type that requires one.
    #[track_caller]
    #[must_use]
    pub fn server_failed_to_produce_expected_response() -> Self {
        Self::of_kind(
            ErrorKind::ServerFailedToProduceExpectedResponse,
            "server failed to produce the expected response",
        )
    }

    /// The response could not be written for its content type.
    #[track_caller]
    #[must_use]
    pub fn failed_to_write_response(reason: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::FailedToWriteResponse, "failed to write response")
            .with_log_message(reason)
    }

    /// Sets the code on every entry.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        let code = code.into();
        for entry in &mut self.errors {
            entry.code = Some(code.clone());
        }
        self
    }

    /// Adds metadata to the most recently added entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Some(entry) = self.errors.last_mut() {
            entry.metadata.insert(key.into(), value.into());
        }
        self
    }

    /// Attaches the underlying cause. Logged, never returned to clients.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<anyhow::Error>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Adds a field to the server-side log record.
    #[must_use]
    pub fn with_log_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.log_fields.insert(key.into(), value.into());
        self
    }

    /// Sets a log-only message.
    #[must_use]
    pub fn with_log_message(mut self, message: impl Into<String>) -> Self {
        self.log_message = Some(message.into());
        self
    }

    /// Adds a header to the error response.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.response_headers.append(name, value);
        self
    }

    /// Sets the stack trace logging policy.
    #[must_use]
    pub fn with_stack_trace_logging(mut self, policy: StackTraceLogging) -> Self {
        self.stack_trace_logging = policy;
        self
    }

    /// Always log the stack trace, regardless of status.
    #[must_use]
    pub fn force_stack_trace(self) -> Self {
        self.with_stack_trace_logging(StackTraceLogging::Force)
    }

    /// Never log the stack trace, regardless of status.
    #[must_use]
    pub fn suppress_stack_trace(self) -> Self {
        self.with_stack_trace_logging(StackTraceLogging::Suppress)
    }

    /// Appends an entry.
    #[must_use]
    pub fn push(mut self, entry: ApiError) -> Self {
        self.errors.push(entry);
        self
    }

    /// Merges another error's entries, log fields and headers into this one.
    ///
    /// The kind, cause and origin of `self` are kept.
    #[must_use]
    pub fn merge(mut self, other: Error) -> Self {
        self.errors.extend(other.errors);
        self.log_fields.extend(other.log_fields);
        self.response_headers.extend(other.response_headers);
        self
    }

    /// Returns the taxonomy kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the client-facing entries in order.
    #[must_use]
    pub fn errors(&self) -> &[ApiError] {
        &self.errors
    }

    /// Returns the response status: the first entry's, or 500 when empty.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.errors
            .first()
            .map(ApiError::status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Returns the underlying cause.
    #[must_use]
    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.cause.as_ref()
    }

    /// Returns the backtrace captured at construction.
    ///
    /// Capture follows `RUST_BACKTRACE` / `RUST_LIB_BACKTRACE`.
    #[must_use]
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.backtrace.status() {
            BacktraceStatus::Captured => Some(&self.backtrace),
            _ => None,
        }
    }

    /// Returns the call site that created this error.
    #[must_use]
    pub fn origin(&self) -> &'static Location<'static> {
        self.origin
    }

    /// Returns the log-only message.
    #[must_use]
    pub fn log_message(&self) -> Option<&str> {
        self.log_message.as_deref()
    }

    /// Returns the extra log fields.
    #[must_use]
    pub fn log_fields(&self) -> &Map<String, Value> {
        &self.log_fields
    }

    /// Returns the extra response headers.
    #[must_use]
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Returns the stack trace logging policy.
    #[must_use]
    pub fn stack_trace_logging(&self) -> StackTraceLogging {
        self.stack_trace_logging
    }

    /// Whether the log record for this error should include the stack trace.
    #[must_use]
    pub fn should_log_stack_trace(&self) -> bool {
        match self.stack_trace_logging {
            StackTraceLogging::Force => true,
            StackTraceLogging::Suppress => false,
            StackTraceLogging::Default => !self.status().is_client_error(),
        }
    }

    /// Builds the client-facing response body.
    ///
    /// `unclassified` is reported for entries without a code.
    #[must_use]
    pub fn to_response(&self, error_id: &str, unclassified: &str) -> ErrorResponse {
        ErrorResponse {
            error_id: error_id.to_string(),
            errors: self
                .errors
                .iter()
                .map(|entry| ErrorEntry {
                    message: entry.message.clone(),
                    metadata: entry.metadata.clone(),
                    code: entry
                        .code
                        .clone()
                        .unwrap_or_else(|| unclassified.to_string()),
                })
                .collect(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        let mut messages = self.errors.iter().map(ApiError::message);
        if let Some(first) = messages.next() {
            write!(f, ": {first}")?;
            for message in messages {
                write!(f, "; {message}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| &**cause as &(dyn std::error::Error + 'static))
    }
}

impl From<anyhow::Error> for Error {
    #[track_caller]
    fn from(cause: anyhow::Error) -> Self {
        Self::internal().with_cause(cause)
    }
}

/// Client-facing error response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Fresh correlation id for this failure.
    pub error_id: String,
    /// One entry per [`ApiError`].
    pub errors: Vec<ErrorEntry>,
}

/// One entry of an [`ErrorResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Human-readable message.
    pub message: String,
    /// Structured metadata.
    pub metadata: Map<String, Value>,
    /// Business code, or the unclassified sentinel.
    pub code: String,
}

//! Differentiated error log records.
//!
//! Every request-time failure is logged exactly once, at the outermost
//! pipeline boundary, through [`log_error`]. Server errors (5xx) log at
//! `error`, everything else at `warn`. The stack trace is attached according
//! to [`Error::should_log_stack_trace`]. Request headers are always redacted
//! before they reach the record.

use crate::fields;
use hermes_core::redact::redact_headers;
use hermes_core::{Error, RequestContext};
use serde_json::{Map, Value};
use tracing::Level;

/// The server-side view of one failed request.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    level: Level,
    status: u16,
    kind: &'static str,
    message: String,
    error_id: String,
    request_id: String,
    method: String,
    route: String,
    stage: Option<String>,
    origin: String,
    log_message: Option<String>,
    principal: Option<String>,
    label: Option<String>,
    trace_id: Option<String>,
    span_id: Option<String>,
    cause: Option<String>,
    stack_trace: Option<String>,
    fields: Map<String, Value>,
}

impl ErrorRecord {
    /// Builds the record for `err` raised while handling `ctx`.
    #[must_use]
    pub fn new(err: &Error, ctx: &RequestContext, error_id: &str) -> Self {
        let status = err.status();
        let level = if status.is_server_error() {
            Level::ERROR
        } else {
            Level::WARN
        };

        let mut extra = err.log_fields().clone();
        let stage = extra
            .remove(fields::STAGE)
            .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string));
        extra.insert("headers".to_string(), Value::Object(redact_headers(ctx.headers())));
        extra.insert(
            fields::DURATION_MS.to_string(),
            Value::from(u64::try_from(ctx.elapsed().as_millis()).unwrap_or(u64::MAX)),
        );

        let stack_trace = err.should_log_stack_trace().then(|| {
            err.backtrace()
                .map_or_else(|| err.origin().to_string(), ToString::to_string)
        });

        Self {
            level,
            status: status.as_u16(),
            kind: err.kind().as_str(),
            message: err.to_string(),
            error_id: error_id.to_string(),
            request_id: ctx.request_id().to_string(),
            method: ctx.method().to_string(),
            route: ctx.route().to_string(),
            stage,
            origin: err.origin().to_string(),
            log_message: err.log_message().map(str::to_string),
            principal: ctx.principal().map(hermes_core::Principal::log_id),
            label: ctx.label().map(str::to_string),
            trace_id: ctx.trace_id().map(str::to_string),
            span_id: ctx.span_id().map(str::to_string),
            cause: err.cause().map(|cause| format!("{cause:#}")),
            stack_trace,
            fields: extra,
        }
    }

    /// Log level for this record.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    /// Response status.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Failing pipeline stage, when recorded.
    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    /// Rendered cause chain.
    #[must_use]
    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    /// Stack trace, present only when the policy allows it.
    #[must_use]
    pub fn stack_trace(&self) -> Option<&str> {
        self.stack_trace.as_deref()
    }

    /// Extra structured fields, including the redacted headers.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Emits the record through `tracing`.
    pub fn emit(&self) {
        let extra = Value::Object(self.fields.clone());
        let stage = self.stage.as_deref().unwrap_or("unknown");
        let log_message = self.log_message.as_deref().unwrap_or("");
        let principal = self.principal.as_deref().unwrap_or("");
        let label = self.label.as_deref().unwrap_or("");
        let trace_id = self.trace_id.as_deref().unwrap_or("");
        let span_id = self.span_id.as_deref().unwrap_or("");
        let cause = self.cause.as_deref().unwrap_or("");

        macro_rules! record {
            ($level:ident) => {
                tracing::$level!(
                    request_id = %self.request_id,
                    error_id = %self.error_id,
                    stage,
                    http.method = %self.method,
                    http.route = %self.route,
                    status = self.status,
                    kind = self.kind,
                    origin = %self.origin,
                    log_message,
                    principal,
                    label,
                    trace_id,
                    span_id,
                    cause,
                    stack_trace = self.stack_trace.as_deref(),
                    fields = %extra,
                    "{}",
                    self.message
                )
            };
        }

        if self.level == Level::ERROR {
            record!(error);
        } else {
            record!(warn);
        }
    }
}

/// Logs `err` for the request described by `ctx`.
pub fn log_error(err: &Error, ctx: &RequestContext, error_id: &str) {
    ErrorRecord::new(err, ctx, error_id).emit();
}

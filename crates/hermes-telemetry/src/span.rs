//! Per-request spans.

use crate::fields;
use hermes_core::RequestContext;
use tracing::Span;

/// Creates the span that wraps one request through the pipeline.
///
/// `label` and `status` are declared empty and recorded later.
#[must_use]
pub fn request_span(ctx: &RequestContext) -> Span {
    tracing::info_span!(
        "request",
        request_id = %ctx.request_id(),
        http.method = %ctx.method(),
        http.route = %ctx.route(),
        trace_id = ctx.trace_id(),
        span_id = ctx.span_id(),
        label = tracing::field::Empty,
        status = tracing::field::Empty,
    )
}

/// Records the response status on `span`.
pub fn record_status(span: &Span, status: u16) {
    span.record(fields::STATUS, status);
}

/// Records the matched handler label on `span`.
pub fn record_label(span: &Span, label: &str) {
    span.record(fields::LABEL, label);
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_request_span_accepts_late_fields() {
        let subscriber = tracing_subscriber::fmt().with_max_level(tracing::Level::TRACE).finish();
        tracing::subscriber::with_default(subscriber, || {
            let ctx = RequestContext::new(Method::POST, "/orders").with_trace_id("abc");
            let span = request_span(&ctx);
            assert!(!span.is_disabled());
            record_label(&span, "create-order");
            record_status(&span, 201);
            assert!(span.has_field(fields::STATUS));
            assert!(span.has_field(fields::LABEL));
        });
    }
}

//! Response encoding and writing.
//!
//! Successful responses are encoded for the negotiated `produces` type, then
//! passed through the route's response processors. Error responses always use
//! the JSON error contract.

use crate::NoContent;
use bytes::Bytes;
use hermes_core::Error;
use hermes_registry::{HandlerDescriptor, MediaType, ResponseProcessor};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use serde_json::Value;
use std::any::TypeId;

/// Body used if the error contract itself cannot be serialized.
const FALLBACK_ERROR_BODY: &[u8] = br#"{"error_id":"","errors":[]}"#;

/// An encoded handler result, ready to write.
#[derive(Debug)]
pub(crate) struct Reply {
    pub(crate) body: Option<Bytes>,
    pub(crate) status: Option<StatusCode>,
    pub(crate) headers: HeaderMap,
}

/// Returns true for response types that never carry a payload.
pub(crate) fn is_bodyless<T: 'static>() -> bool {
    let id = TypeId::of::<T>();
    id == TypeId::of::<NoContent>() || id == TypeId::of::<()>()
}

/// Encodes the handler's body and runs the response processors.
///
/// Returns `None` for bodyless response types.
#[track_caller]
pub(crate) fn prepare<T: Serialize + 'static>(
    body: Option<T>,
    produces: &MediaType,
    processors: &[ResponseProcessor],
) -> Result<Option<Bytes>, Error> {
    if is_bodyless::<T>() {
        return Ok(None);
    }
    let Some(body) = body else {
        return Err(Error::server_failed_to_produce_expected_response()
            .with_log_field("response_type", std::any::type_name::<T>()));
    };
    let encoded = encode(&body, produces)?;
    processors
        .iter()
        .try_fold(encoded, |bytes, processor| processor.process(bytes))
        .map(Some)
}

/// Encodes `value` for `produces`.
///
/// `text/plain` requires a string value; every other type is JSON.
#[track_caller]
pub(crate) fn encode<T: Serialize + ?Sized>(value: &T, produces: &MediaType) -> Result<Bytes, Error> {
    if produces.is_text_plain() {
        return match serde_json::to_value(value) {
            Ok(Value::String(text)) => Ok(Bytes::from(text)),
            Ok(_) => Err(Error::failed_to_write_response(format!(
                "{produces} response requires a text body"
            ))),
            Err(e) => Err(Error::failed_to_write_response("response encoding failed").with_cause(e)),
        };
    }
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| Error::failed_to_write_response("response encoding failed").with_cause(e))
}

/// Writes a successful reply.
///
/// Status precedence: the handler's override, then the route's status, then
/// 200 (204 when there is no body).
pub(crate) fn write_reply(
    reply: Reply,
    descriptor: &HandlerDescriptor,
    produces: &MediaType,
) -> http::Response<Full<Bytes>> {
    let fallback = if reply.body.is_some() {
        StatusCode::OK
    } else {
        StatusCode::NO_CONTENT
    };
    let status = reply.status.or(descriptor.status()).unwrap_or(fallback);

    let has_body = reply.body.is_some();
    let mut response = http::Response::new(Full::new(reply.body.unwrap_or_default()));
    *response.status_mut() = status;
    if has_body {
        if let Ok(value) = HeaderValue::from_str(produces.essence()) {
            response.headers_mut().insert(CONTENT_TYPE, value);
        }
    }
    response.headers_mut().extend(reply.headers);
    response
}

/// Writes the client-facing error response.
pub(crate) fn write_error(err: &Error, error_id: &str, unclassified: &str) -> http::Response<Full<Bytes>> {
    let body = serde_json::to_vec(&err.to_response(error_id, unclassified))
        .map_or_else(|_| Bytes::from_static(FALLBACK_ERROR_BODY), Bytes::from);

    let mut response = http::Response::new(Full::new(body));
    *response.status_mut() = err.status();
    response.headers_mut().extend(err.response_headers().clone());
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::ErrorKind;
    use http::header::ALLOW;
    use http::Method;
    use http_body_util::BodyExt;

    fn descriptor(status: Option<StatusCode>) -> HandlerDescriptor {
        let builder = HandlerDescriptor::builder(Method::GET, "/items");
        match status {
            Some(status) => builder.status(status),
            None => builder,
        }
        .build()
        .unwrap()
    }

    async fn body_of(response: http::Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[test]
    fn test_bodyless_types() {
        assert!(is_bodyless::<NoContent>());
        assert!(is_bodyless::<()>());
        assert!(!is_bodyless::<String>());
        assert_eq!(prepare::<NoContent>(None, &MediaType::json(), &[]).unwrap(), None);
        assert_eq!(prepare(Some(()), &MediaType::json(), &[]).unwrap(), None);
    }

    #[test]
    fn test_missing_body_is_contract_violation() {
        let err = prepare::<String>(None, &MediaType::json(), &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServerFailedToProduceExpectedResponse);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_text_plain_requires_string() {
        let text = MediaType::parse("text/plain").unwrap();
        assert_eq!(encode("hi", &text).unwrap(), Bytes::from_static(b"hi"));
        let err = encode(&42, &text).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FailedToWriteResponse);
    }

    #[test]
    fn test_processors_run_in_order_on_encoded_bytes() {
        let upper = ResponseProcessor::new(|bytes: Bytes| {
            Ok(Bytes::from(bytes.to_ascii_uppercase()))
        });
        let wrap = ResponseProcessor::new(|bytes: Bytes| {
            let mut out = b"<".to_vec();
            out.extend_from_slice(&bytes);
            out.push(b'>');
            Ok(Bytes::from(out))
        });
        let out = prepare(Some("abc"), &MediaType::json(), &[upper, wrap]).unwrap();
        assert_eq!(out, Some(Bytes::from_static(b"<\"ABC\">")));
    }

    #[test]
    fn test_processor_failure_propagates() {
        let failing = ResponseProcessor::new(|_| Err(Error::internal()));
        let err = prepare(Some(1), &MediaType::json(), &[failing]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalServerError);
    }

    #[tokio::test]
    async fn test_status_precedence() {
        let reply = || Reply {
            body: Some(Bytes::from_static(b"1")),
            status: None,
            headers: HeaderMap::new(),
        };
        let json = MediaType::json();

        let response = write_reply(reply(), &descriptor(None), &json);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

        let response = write_reply(reply(), &descriptor(Some(StatusCode::CREATED)), &json);
        assert_eq!(response.status(), StatusCode::CREATED);

        let mut overridden = reply();
        overridden.status = Some(StatusCode::ACCEPTED);
        let response = write_reply(overridden, &descriptor(Some(StatusCode::CREATED)), &json);
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_of(response).await, Bytes::from_static(b"1"));
    }

    #[test]
    fn test_empty_reply_is_no_content() {
        let reply = Reply {
            body: None,
            status: None,
            headers: HeaderMap::new(),
        };
        let response = write_reply(reply, &descriptor(None), &MediaType::json());
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_error_response_contract() {
        let err = Error::method_not_allowed("DELETE", vec!["GET".into()])
            .with_header(ALLOW, HeaderValue::from_static("GET"))
            .with_cause(anyhow::anyhow!("internal detail"));
        let response = write_error(&err, "err-1", "unclassified");
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET");
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

        let body: Value = serde_json::from_slice(&body_of(response).await).unwrap();
        assert_eq!(body["error_id"], "err-1");
        assert_eq!(body["errors"][0]["code"], "method_not_allowed");
        assert!(!body.to_string().contains("internal detail"));
    }

    #[tokio::test]
    async fn test_handler_error_without_code_is_unclassified() {
        let err = Error::new(StatusCode::CONFLICT, "already exists");
        let response = write_error(&err, "err-2", "unclassified");
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body: Value = serde_json::from_slice(&body_of(response).await).unwrap();
        assert_eq!(body["errors"][0]["code"], "unclassified");
        assert_eq!(body["errors"][0]["message"], "already exists");
    }
}

//! The primary request value.
//!
//! Write methods decode the primary value from the request body. Read-only
//! methods synthesize it from path parameters and query pairs, using the
//! body type's coercion table.

use crate::error::{missing_field, short_type_name};
use crate::{CoercionTable, FieldViolation, Validate};
use hermes_core::{Error, ErrorKind, RequestContext};
use http::Method;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::error::Category;
use serde_json::{Map, Value};

/// A primary value for handlers that take no body.
///
/// Accepts any payload (or none) and discards it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoBody;

impl<'de> Deserialize<'de> for NoBody {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_ignored_any(IgnoredAny)?;
        Ok(Self)
    }
}

impl Serialize for NoBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_unit()
    }
}

/// Types usable as the primary request value.
pub trait RequestBody: DeserializeOwned + Validate + Send + 'static {}

impl<T: DeserializeOwned + Validate + Send + 'static> RequestBody for T {}

/// How body bytes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    /// JSON, for `application/json` and `+json` types.
    Json,
    /// Raw UTF-8 text bound as a JSON string, for `text/plain`.
    Text,
}

/// Returns true for methods whose primary value comes from path and query.
#[must_use]
pub fn is_read_only(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::DELETE | Method::HEAD | Method::OPTIONS
    )
}

/// Per-type body state built at registration.
#[derive(Debug, Clone)]
pub struct BodyPlan {
    table: CoercionTable,
    accepts_empty: bool,
}

impl BodyPlan {
    /// Builds the plan for `T`.
    #[must_use]
    pub fn of<T: DeserializeOwned>() -> Self {
        Self {
            table: CoercionTable::of::<T>(),
            accepts_empty: serde_json::from_value::<T>(Value::Null).is_ok(),
        }
    }

    /// Returns true if `T` deserializes from JSON `null`.
    #[must_use]
    pub fn accepts_empty(&self) -> bool {
        self.accepts_empty
    }

    /// Returns the coercion table used for read-only synthesis.
    #[must_use]
    pub fn table(&self) -> &CoercionTable {
        &self.table
    }

    /// Decodes the primary value from body bytes.
    ///
    /// `max_bytes` bounds the payload size; `None` disables the check.
    pub fn decode<T: DeserializeOwned>(
        &self,
        body: &[u8],
        format: BodyFormat,
        max_bytes: Option<usize>,
    ) -> Result<T, Error> {
        if let Some(limit) = max_bytes {
            if body.len() > limit {
                return Err(Error::payload_too_large(limit, body.len()));
            }
        }
        if body.iter().all(u8::is_ascii_whitespace) {
            if !self.accepts_empty {
                return Err(Error::body_required());
            }
            return serde_json::from_value(Value::Null).map_err(|e| self.decode_error(e, body));
        }
        match format {
            BodyFormat::Json => serde_json::from_slice(body).map_err(|e| self.decode_error(e, body)),
            BodyFormat::Text => {
                let text = std::str::from_utf8(body).map_err(|e| {
                    let mut diagnostics = Map::new();
                    diagnostics.insert("category".into(), "syntax".into());
                    diagnostics.insert("offset".into(), e.valid_up_to().into());
                    Error::failed_to_unmarshal("request body is not valid UTF-8", diagnostics)
                        .with_cause(e)
                })?;
                serde_json::from_value(Value::String(text.to_string()))
                    .map_err(|e| self.decode_error(e, body))
            }
        }
    }

    /// Builds the primary value from path parameters and query pairs.
    ///
    /// Path values win over query values for the same key.
    pub fn synthesize<T: DeserializeOwned>(&self, ctx: &RequestContext) -> Result<T, Error> {
        let mut pairs = ctx.path_params().to_pairs();
        pairs.extend(
            ctx.query()
                .iter()
                .filter(|(key, _)| !ctx.path_params().contains(key))
                .cloned(),
        );
        self.table.bind(&pairs).map_err(|e| match missing_field(&e.to_string()) {
            Some(field) => self.required_error(&field, e),
            None => unmarshal_error(e, &[]).with_metadata("source", "path+query"),
        })
    }

    /// A missing field is a `required` violation; anything else is a decode failure.
    #[track_caller]
    fn decode_error(&self, err: serde_json::Error, body: &[u8]) -> Error {
        match missing_field(&err.to_string()) {
            Some(field) => self.required_error(&field, err),
            None => unmarshal_error(err, body),
        }
    }

    #[track_caller]
    fn required_error(&self, field: &str, cause: serde_json::Error) -> Error {
        let type_name =
            short_type_name(self.table.type_name()).unwrap_or_else(|| self.table.type_name().to_string());
        let violation = FieldViolation::new(format!("{type_name}.{field}"), field, "required");
        Error::from_entries(ErrorKind::ValidationFailed, [violation.to_api_error()])
            .with_log_field("violations", 1)
            .with_cause(cause)
    }
}

/// Converts a serde_json error into `FailedToUnmarshal` with parser diagnostics.
#[track_caller]
fn unmarshal_error(err: serde_json::Error, body: &[u8]) -> Error {
    let diagnostics = diagnostics(&err, body);
    Error::failed_to_unmarshal("failed to decode request body", diagnostics).with_cause(err)
}

fn diagnostics(err: &serde_json::Error, body: &[u8]) -> Map<String, Value> {
    let mut out = Map::new();
    let category = match err.classify() {
        Category::Io => "io",
        Category::Syntax => "syntax",
        Category::Data => "data",
        Category::Eof => "eof",
    };
    out.insert("category".into(), category.into());
    if err.line() > 0 {
        out.insert("line".into(), err.line().into());
        out.insert("column".into(), err.column().into());
        out.insert("offset".into(), byte_offset(body, err.line(), err.column()).into());
    }
    let message = err.to_string();
    if let Some((actual, expected)) = type_mismatch(&message) {
        out.insert("actual".into(), actual.into());
        out.insert("expected".into(), expected.into());
    }
    out
}

/// Byte offset of a 1-based line and column, clamped to the body length.
fn byte_offset(body: &[u8], line: usize, column: usize) -> usize {
    let line_start: usize = body
        .split(|b| *b == b'\n')
        .take(line.saturating_sub(1))
        .map(|l| l.len() + 1)
        .sum();
    (line_start + column.saturating_sub(1)).min(body.len())
}

/// Splits serde's "invalid type: X, expected Y" message.
fn type_mismatch(message: &str) -> Option<(String, String)> {
    let rest = message
        .strip_prefix("invalid type: ")
        .or_else(|| message.strip_prefix("invalid value: "))?;
    let (actual, expected) = rest.split_once(", expected ")?;
    let expected = expected
        .split_once(" at line ")
        .map_or(expected, |(e, _)| e);
    Some((actual.to_string(), expected.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldViolation, Validate};
    use hermes_core::{ErrorKind, Params};
    use http::StatusCode;

    #[derive(Debug, Deserialize, PartialEq)]
    struct CreateUser {
        name: String,
        age: u8,
    }

    impl Validate for CreateUser {
        fn validate(&self) -> Vec<FieldViolation> {
            Vec::new()
        }
    }

    #[test]
    fn test_read_only_methods() {
        assert!(is_read_only(&Method::GET));
        assert!(is_read_only(&Method::DELETE));
        assert!(!is_read_only(&Method::POST));
        assert!(!is_read_only(&Method::PATCH));
    }

    #[test]
    fn test_decode_json() {
        let plan = BodyPlan::of::<CreateUser>();
        let user: CreateUser = plan
            .decode(br#"{"name":"ada","age":36}"#, BodyFormat::Json, None)
            .unwrap();
        assert_eq!(user.name, "ada");
    }

    #[test]
    fn test_empty_body_required() {
        let plan = BodyPlan::of::<CreateUser>();
        assert!(!plan.accepts_empty());
        let err = plan.decode::<CreateUser>(b"  ", BodyFormat::Json, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BodyRequired);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_empty_body_accepted_for_nullable_types() {
        assert_eq!(BodyPlan::of::<NoBody>().decode::<NoBody>(b"", BodyFormat::Json, None).unwrap(), NoBody);
        assert!(BodyPlan::of::<()>().decode::<()>(b"", BodyFormat::Json, None).is_ok());
        assert_eq!(
            BodyPlan::of::<Option<CreateUser>>()
                .decode::<Option<CreateUser>>(b"", BodyFormat::Json, None)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_syntax_error_diagnostics() {
        let plan = BodyPlan::of::<CreateUser>();
        let body = b"{\n  \"name\": \"ada\",\n  \"age\": }";
        let err = plan.decode::<CreateUser>(body, BodyFormat::Json, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FailedToUnmarshal);
        let meta = err.errors()[0].metadata();
        assert_eq!(meta["category"], "syntax");
        assert_eq!(meta["line"], 3);
        let offset = meta["offset"].as_u64().unwrap() as usize;
        assert!(offset <= body.len());
        assert!(err.cause().is_some());
    }

    #[test]
    fn test_type_mismatch_diagnostics() {
        let plan = BodyPlan::of::<CreateUser>();
        let err = plan
            .decode::<CreateUser>(br#"{"name":"ada","age":"old"}"#, BodyFormat::Json, None)
            .unwrap_err();
        let meta = err.errors()[0].metadata();
        assert_eq!(meta["category"], "data");
        assert_eq!(meta["actual"], "string \"old\"");
        assert_eq!(meta["expected"], "u8");
    }

    #[test]
    fn test_payload_too_large() {
        let plan = BodyPlan::of::<Value>();
        let err = plan.decode::<Value>(b"[1,2,3]", BodyFormat::Json, Some(4)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PayloadTooLarge);
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_text_body() {
        let plan = BodyPlan::of::<String>();
        let text: String = plan.decode(b"hello", BodyFormat::Text, None).unwrap();
        assert_eq!(text, "hello");
        let err = plan.decode::<String>(&[0xff, 0xfe], BodyFormat::Text, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FailedToUnmarshal);
    }

    #[test]
    fn test_synthesize_path_wins() {
        #[derive(Debug, Deserialize)]
        struct Lookup {
            id: u64,
            verbose: bool,
        }
        let ctx = RequestContext::mock()
            .with_path_params(Params::new().with("id", "5"))
            .with_query_string("id=9&verbose=true")
            .unwrap();
        let lookup: Lookup = BodyPlan::of::<Lookup>().synthesize(&ctx).unwrap();
        assert_eq!(lookup.id, 5);
        assert!(lookup.verbose);
    }

    #[test]
    fn test_synthesize_reports_missing_field() {
        let err = BodyPlan::of::<CreateUser>()
            .synthesize::<CreateUser>(&RequestContext::mock())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        let meta = err.errors()[0].metadata();
        assert_eq!(meta["key"], "CreateUser.name");
        assert_eq!(meta["field"], "name");
        assert_eq!(meta["tag"], "required");
    }

    #[test]
    fn test_missing_field_is_required_violation() {
        #[derive(Debug, Deserialize)]
        struct Strict {
            #[serde(rename = "Name")]
            _name: String,
        }
        let err = BodyPlan::of::<Strict>()
            .decode::<Strict>(b"{}", BodyFormat::Json, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.errors().len(), 1);
        let entry = &err.errors()[0];
        assert_eq!(entry.code(), Some("validation_failed"));
        assert_eq!(entry.metadata()["key"], "Strict.Name");
        assert_eq!(entry.metadata()["field"], "Name");
        assert_eq!(entry.metadata()["tag"], "required");
        assert!(err.cause().is_some());
    }

    #[test]
    fn test_byte_offset() {
        assert_eq!(byte_offset(b"ab\ncd", 2, 2), 4);
        assert_eq!(byte_offset(b"ab", 1, 1), 0);
        assert_eq!(byte_offset(b"ab", 9, 9), 2);
    }
}

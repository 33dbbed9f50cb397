//! Header redaction for log records.

use http::HeaderMap;
use serde_json::{Map, Value};

/// Replacement for sensitive header values.
pub const REDACTED: &str = "[REDACTED]";

/// Returns true if the header carries credentials.
///
/// Matches `authorization`, `proxy-authorization`, and any name ending in
/// `-authorization`, case-insensitively.
#[must_use]
pub fn is_sensitive(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name == "authorization" || name.ends_with("-authorization")
}

/// Converts headers into a JSON object for logging, redacting sensitive values.
///
/// Repeated headers become arrays. Non-UTF-8 values are logged as `"<binary>"`.
#[must_use]
pub fn redact_headers(headers: &HeaderMap) -> Map<String, Value> {
    let mut out = Map::new();
    for name in headers.keys() {
        let key = name.as_str();
        let values: Vec<Value> = headers
            .get_all(name)
            .iter()
            .map(|value| {
                if is_sensitive(key) {
                    Value::from(REDACTED)
                } else {
                    Value::from(value.to_str().unwrap_or("<binary>"))
                }
            })
            .collect();
        let value = match <[Value; 1]>::try_from(values) {
            Ok([single]) => single,
            Err(many) => Value::Array(many),
        };
        out.insert(key.to_string(), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_sensitive_names() {
        assert!(is_sensitive("Authorization"));
        assert!(is_sensitive("proxy-authorization"));
        assert!(is_sensitive("X-Upstream-Authorization"));
        assert!(!is_sensitive("x-authorization-hint"));
        assert!(!is_sensitive("accept"));
    }

    #[test]
    fn test_redact_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer secret"));
        headers.insert("proxy-authorization", HeaderValue::from_static("Basic abc"));
        headers.insert("accept", HeaderValue::from_static("application/json"));
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));

        let fields = redact_headers(&headers);
        assert_eq!(fields["authorization"], REDACTED);
        assert_eq!(fields["proxy-authorization"], REDACTED);
        assert_eq!(fields["accept"], "application/json");
        assert_eq!(fields["x-tag"], serde_json::json!(["a", "b"]));

        let rendered = Value::Object(fields).to_string();
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("Basic abc"));
    }

    proptest::proptest! {
        #[test]
        fn prop_any_authorization_suffix_is_redacted(prefix in "[a-z][a-z0-9]{0,12}") {
            let name = format!("{prefix}-authorization");
            let mut headers = HeaderMap::new();
            headers.insert(
                http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_static("token-value"),
            );
            let fields = redact_headers(&headers);
            proptest::prop_assert_eq!(&fields[&name], REDACTED);
        }
    }
}

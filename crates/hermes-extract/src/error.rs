//! Extraction error types.
//!
//! Extractors report failures as [`ExtractionError`], which records where the
//! value was being read from. It converts into an `InvalidArgument`
//! [`hermes_core::Error`] (400) with the source and field as metadata.

use hermes_core::Error;
use std::fmt;

/// Where an argument is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgSource {
    /// Path parameters delivered by the router.
    Path,
    /// Query string pairs.
    Query,
    /// Request headers.
    Header,
    /// The authenticated principal.
    Auth,
    /// The request body.
    Body,
}

impl ArgSource {
    /// Returns the lowercase source name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Auth => "auth",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for ArgSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure binding one argument.
///
/// # Example
///
/// ```rust
/// use hermes_extract::{ArgSource, ExtractionError};
/// use hermes_core::{Error, ErrorKind};
///
/// let err = ExtractionError::missing(ArgSource::Header, "x-tenant-id");
/// assert!(err.to_string().contains("x-tenant-id"));
///
/// let err: Error = err.into();
/// assert_eq!(err.kind(), ErrorKind::InvalidArgument);
/// ```
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ExtractionError {
    source_kind: ArgSource,
    field: Option<String>,
    message: String,
    #[source]
    cause: Option<serde_json::Error>,
}

impl ExtractionError {
    /// A required value is absent.
    #[must_use]
    pub fn missing(source: ArgSource, field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            source_kind: source,
            message: format!("missing required {source} parameter: {field}"),
            field: Some(field),
            cause: None,
        }
    }

    /// The values could not be deserialized into the target type.
    #[must_use]
    pub fn deserialize(source: ArgSource, type_name: &str, cause: serde_json::Error) -> Self {
        Self {
            source_kind: source,
            message: format!("invalid {source} parameters: {cause}"),
            field: missing_field(&cause.to_string()).or_else(|| short_type_name(type_name)),
            cause: Some(cause),
        }
    }

    /// Returns the source being read.
    #[must_use]
    pub fn arg_source(&self) -> ArgSource {
        self.source_kind
    }

    /// Returns the offending field, when known.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl From<ExtractionError> for Error {
    #[track_caller]
    fn from(err: ExtractionError) -> Self {
        let mut converted = Error::invalid_argument(err.message.clone())
            .with_metadata("source", err.source_kind.as_str());
        if let Some(field) = &err.field {
            converted = converted.with_metadata("field", field.as_str());
        }
        match err.cause {
            Some(cause) => converted.with_cause(cause),
            None => converted,
        }
    }
}

/// Pulls `name` out of serde's "missing field `name`" message.
pub(crate) fn missing_field(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    rest.split_once('`').map(|(field, _)| field.to_string())
}

pub(crate) fn short_type_name(type_name: &str) -> Option<String> {
    type_name
        .split('<')
        .next()
        .and_then(|path| path.rsplit("::").next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::ErrorKind;
    use http::StatusCode;

    #[test]
    fn test_missing_field_parsing() {
        assert_eq!(
            missing_field("missing field `limit` at line 1 column 2"),
            Some("limit".to_string())
        );
        assert_eq!(missing_field("invalid type"), None);
    }

    #[test]
    fn test_conversion_carries_source_and_field() {
        let err: Error = ExtractionError::missing(ArgSource::Path, "id").into();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.errors()[0].metadata()["source"], "path");
        assert_eq!(err.errors()[0].metadata()["field"], "id");
        assert!(err.cause().is_none());
    }

    #[test]
    fn test_deserialize_keeps_cause() {
        let cause = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err = ExtractionError::deserialize(ArgSource::Query, "my_crate::ListParams", cause);
        assert_eq!(err.field(), Some("ListParams"));
        assert_eq!(err.arg_source(), ArgSource::Query);
        let err: Error = err.into();
        assert!(err.cause().is_some());
    }
}

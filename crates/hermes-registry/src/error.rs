//! Registration and negotiation errors.

use crate::media_type::MediaTypeError;
use hermes_core::Error;
use http::Method;
use serde_json::Value;
use thiserror::Error as ThisError;

/// A structurally inconsistent registration. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum RegistrationError {
    /// The `(path, method, consumes, produces)` quadruple is already registered.
    #[error("duplicate handler for {method} {path} (consumes {consumes}, produces {produces})")]
    DuplicateHandler {
        /// HTTP method.
        method: Method,
        /// Path template.
        path: String,
        /// Consumed media type.
        consumes: String,
        /// Produced media type.
        produces: String,
    },

    /// A second default handler was added to a group.
    #[error("{method} {path} already has a default handler")]
    ConflictingDefault {
        /// HTTP method.
        method: Method,
        /// Path template.
        path: String,
    },

    /// Handlers in one group disagree on whether auth is required.
    #[error("handlers for {method} {path} disagree on auth requirement")]
    ConflictingAuth {
        /// HTTP method.
        method: Method,
        /// Path template.
        path: String,
    },

    /// A consumes or produces value did not parse.
    #[error(transparent)]
    InvalidMediaType(#[from] MediaTypeError),
}

/// A request-time dispatch failure.
///
/// Converts into the matching [`hermes_core::Error`] kind.
#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum NegotiationError {
    /// No group exists for the path.
    #[error("no route for path {path}")]
    RouteNotFound {
        /// Requested path template.
        path: String,
    },

    /// The path exists, but not for this method.
    #[error("method {method} not allowed")]
    MethodNotAllowed {
        /// Requested method.
        method: Method,
        /// Methods registered for the path, sorted.
        allowed: Vec<String>,
    },

    /// Nothing the group produces satisfies Accept.
    #[error("not acceptable: {accept}")]
    NotAcceptable {
        /// The Accept header as received (`*/*` when absent).
        accept: String,
        /// `[{consumes, produces}]` for every member of the group.
        available: Value,
    },

    /// Nothing the group consumes satisfies Content-Type.
    #[error("unsupported media type: {content_type}")]
    UnsupportedMediaType {
        /// The Content-Type header as received (`*/*` when absent).
        content_type: String,
        /// `[{consumes, produces}]` for every member of the group.
        available: Value,
    },
}

impl From<NegotiationError> for Error {
    #[track_caller]
    fn from(err: NegotiationError) -> Self {
        match err {
            NegotiationError::RouteNotFound { path } => Error::route_not_found(&path),
            NegotiationError::MethodNotAllowed { method, allowed } => {
                Error::method_not_allowed(method.as_str(), allowed)
            }
            NegotiationError::NotAcceptable { accept, available } => {
                Error::not_acceptable(&accept, available)
            }
            NegotiationError::UnsupportedMediaType {
                content_type,
                available,
            } => Error::unsupported_media_type(&content_type, available),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::ErrorKind;
    use http::StatusCode;

    #[test]
    fn test_negotiation_error_conversion() {
        let err: Error = NegotiationError::MethodNotAllowed {
            method: Method::DELETE,
            allowed: vec!["GET".into()],
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::MethodNotAllowed);
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);

        let err: Error = NegotiationError::NotAcceptable {
            accept: "text/html".into(),
            available: serde_json::json!([]),
        }
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.errors()[0].metadata()["accept"], "text/html");
    }

    #[test]
    fn test_registration_error_display() {
        let err = RegistrationError::ConflictingDefault {
            method: Method::GET,
            path: "/a".into(),
        };
        assert_eq!(err.to_string(), "GET /a already has a default handler");
    }
}

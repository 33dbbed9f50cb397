//! Handler descriptors.
//!
//! A [`HandlerDescriptor`] is the immutable registration-time metadata for one
//! handler: where it lives, what it consumes and produces, and which checks
//! and transforms surround it.

use crate::error::RegistrationError;
use crate::media_type::MediaType;
use bytes::Bytes;
use hermes_core::{Error, Principal};
use http::{Method, StatusCode};
use std::fmt;
use std::sync::Arc;

/// An authorization check run against the request principal.
///
/// `Err(message)` rejects the request with `NotAuthorized` carrying `message`.
#[derive(Clone)]
pub struct AuthCheck(Arc<dyn Fn(&Principal) -> Result<(), String> + Send + Sync>);

impl AuthCheck {
    /// Wraps a check function.
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&Principal) -> Result<(), String> + Send + Sync + 'static,
    {
        Self(Arc::new(check))
    }

    /// Requires `scope` to be granted.
    #[must_use]
    pub fn scope(scope: impl Into<String>) -> Self {
        let scope = scope.into();
        Self::new(move |principal| {
            if principal.has_scope(&scope) {
                Ok(())
            } else {
                Err(format!("missing required scope '{scope}'"))
            }
        })
    }

    /// Runs the check.
    pub fn check(&self, principal: &Principal) -> Result<(), String> {
        (self.0)(principal)
    }
}

impl fmt::Debug for AuthCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthCheck(..)")
    }
}

/// A byte-in/byte-out transform applied to the encoded response body.
#[derive(Clone)]
pub struct ResponseProcessor(Arc<dyn Fn(Bytes) -> Result<Bytes, Error> + Send + Sync>);

impl ResponseProcessor {
    /// Wraps a transform.
    pub fn new<F>(process: F) -> Self
    where
        F: Fn(Bytes) -> Result<Bytes, Error> + Send + Sync + 'static,
    {
        Self(Arc::new(process))
    }

    /// Applies the transform.
    pub fn process(&self, body: Bytes) -> Result<Bytes, Error> {
        (self.0)(body)
    }
}

impl fmt::Debug for ResponseProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResponseProcessor(..)")
    }
}

/// Immutable metadata for one registered handler.
#[derive(Debug, Clone)]
pub struct HandlerDescriptor {
    path: String,
    method: Method,
    consumes: MediaType,
    produces: MediaType,
    is_default: bool,
    status: Option<StatusCode>,
    auth_required: bool,
    auth_checks: Vec<AuthCheck>,
    response_processors: Vec<ResponseProcessor>,
    label: Option<String>,
}

impl HandlerDescriptor {
    /// Starts a descriptor for `method` on `path`.
    ///
    /// # Example
    ///
    /// ```
    /// use hermes_registry::HandlerDescriptor;
    /// use http::Method;
    ///
    /// let descriptor = HandlerDescriptor::builder(Method::GET, "orders/{id}/")
    ///     .produces("application/vnd.acme.order+json")
    ///     .default_handler()
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(descriptor.path(), "/orders/{id}");
    /// assert_eq!(descriptor.consumes().essence(), "application/json");
    /// assert!(descriptor.auth_required());
    /// ```
    pub fn builder(method: Method, path: impl AsRef<str>) -> DescriptorBuilder {
        DescriptorBuilder {
            path: normalize_path(path.as_ref()),
            method,
            consumes: None,
            produces: None,
            is_default: false,
            status: None,
            auth_required: true,
            auth_checks: Vec::new(),
            response_processors: Vec::new(),
            label: None,
        }
    }

    /// Returns the normalized path template.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the consumed media type.
    #[must_use]
    pub fn consumes(&self) -> &MediaType {
        &self.consumes
    }

    /// Returns the produced media type.
    #[must_use]
    pub fn produces(&self) -> &MediaType {
        &self.produces
    }

    /// Returns true if this is its group's default handler.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Returns the status override.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns true if a principal is required.
    #[must_use]
    pub fn auth_required(&self) -> bool {
        self.auth_required
    }

    /// Returns the authorization checks in run order.
    #[must_use]
    pub fn auth_checks(&self) -> &[AuthCheck] {
        &self.auth_checks
    }

    /// Returns the response processors in run order.
    #[must_use]
    pub fn response_processors(&self) -> &[ResponseProcessor] {
        &self.response_processors
    }

    /// Returns the debug label.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Builder for [`HandlerDescriptor`].
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    path: String,
    method: Method,
    consumes: Option<String>,
    produces: Option<String>,
    is_default: bool,
    status: Option<StatusCode>,
    auth_required: bool,
    auth_checks: Vec<AuthCheck>,
    response_processors: Vec<ResponseProcessor>,
    label: Option<String>,
}

impl DescriptorBuilder {
    /// Sets the consumed media type.
    pub fn consumes(mut self, media_type: impl Into<String>) -> Self {
        self.consumes = Some(media_type.into());
        self
    }

    /// Sets the produced media type.
    pub fn produces(mut self, media_type: impl Into<String>) -> Self {
        self.produces = Some(media_type.into());
        self
    }

    /// Marks this descriptor as its group's default.
    pub fn default_handler(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Overrides the success status.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets whether a principal is required.
    pub fn auth_required(mut self, required: bool) -> Self {
        self.auth_required = required;
        self
    }

    /// Appends an authorization check.
    pub fn auth_check(mut self, check: AuthCheck) -> Self {
        self.auth_checks.push(check);
        self
    }

    /// Inserts checks that run before the ones already added.
    pub fn prepend_auth_checks(mut self, checks: impl IntoIterator<Item = AuthCheck>) -> Self {
        let mut all: Vec<AuthCheck> = checks.into_iter().collect();
        all.append(&mut self.auth_checks);
        self.auth_checks = all;
        self
    }

    /// Appends a response processor.
    pub fn response_processor(mut self, processor: ResponseProcessor) -> Self {
        self.response_processors.push(processor);
        self
    }

    /// Sets the debug label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Prefixes the path, e.g. with a controller base path.
    pub fn prefix_path(mut self, prefix: &str) -> Self {
        let prefix = normalize_path(prefix);
        self.path = if prefix == "/" {
            self.path
        } else if self.path == "/" {
            prefix
        } else {
            format!("{prefix}{}", self.path)
        };
        self
    }

    /// Builds the descriptor, using `application/json` for unset media types.
    pub fn build(self) -> Result<HandlerDescriptor, RegistrationError> {
        self.build_with_default(&MediaType::json())
    }

    /// Builds the descriptor, using `default` for unset media types.
    pub fn build_with_default(
        self,
        default: &MediaType,
    ) -> Result<HandlerDescriptor, RegistrationError> {
        let resolve = |value: Option<String>| match value {
            Some(raw) => MediaType::parse(&raw).map_err(RegistrationError::from),
            None => Ok(default.clone()),
        };
        Ok(HandlerDescriptor {
            consumes: resolve(self.consumes)?,
            produces: resolve(self.produces)?,
            path: self.path,
            method: self.method,
            is_default: self.is_default,
            status: self.status,
            auth_required: self.auth_required,
            auth_checks: self.auth_checks,
            response_processors: self.response_processors,
            label: self.label,
        })
    }

    /// Returns the normalized path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the method.
    pub fn method(&self) -> &Method {
        &self.method
    }
}

/// Normalizes a path: one leading slash, no trailing slash (except `/`).
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("users/"), "/users");
        assert_eq!(normalize_path("/users/{id}"), "/users/{id}");
    }

    #[test]
    fn test_prefix_path() {
        let b = HandlerDescriptor::builder(Method::GET, "/").prefix_path("/v1/orders/");
        assert_eq!(b.path(), "/v1/orders");
        let b = HandlerDescriptor::builder(Method::GET, "{id}").prefix_path("v1");
        assert_eq!(b.path(), "/v1/{id}");
        let b = HandlerDescriptor::builder(Method::GET, "/health").prefix_path("/");
        assert_eq!(b.path(), "/health");
    }

    #[test]
    fn test_invalid_media_type_rejected() {
        let err = HandlerDescriptor::builder(Method::POST, "/x")
            .consumes("not a type")
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidMediaType(_)));
    }

    #[test]
    fn test_custom_default_media_type() {
        let d = HandlerDescriptor::builder(Method::GET, "/x")
            .build_with_default(&MediaType::parse("text/plain").unwrap())
            .unwrap();
        assert!(d.produces().is_text_plain());
        assert!(d.consumes().is_text_plain());
    }

    #[test]
    fn test_auth_checks_order() {
        let d = HandlerDescriptor::builder(Method::GET, "/x")
            .auth_check(AuthCheck::new(|_| Err("route".into())))
            .prepend_auth_checks([AuthCheck::new(|_| Err("controller".into()))])
            .build()
            .unwrap();
        let principal = Principal::new("u");
        assert_eq!(d.auth_checks()[0].check(&principal), Err("controller".into()));
        assert_eq!(d.auth_checks()[1].check(&principal), Err("route".into()));
    }

    #[test]
    fn test_scope_check() {
        let check = AuthCheck::scope("admin");
        assert!(check.check(&Principal::new("u").with_scope("admin")).is_ok());
        assert_eq!(
            check.check(&Principal::new("u")),
            Err("missing required scope 'admin'".into())
        );
    }
}

//! The authenticated principal.
//!
//! Hermes never verifies credentials. The authentication collaborator
//! (see `hermes_server::transport::Authenticator`) attaches a [`Principal`]
//! to the request context, and the pipeline only consumes it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity attached to a request by the authentication collaborator.
///
/// # Example
///
/// ```rust
/// use hermes_core::Principal;
///
/// let principal = Principal::new("user-123")
///     .with_organization("org-1")
///     .with_scope("orders:read");
///
/// assert!(principal.has_scope("orders:read"));
/// assert_eq!(principal.log_id(), "org-1/user-123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Principal {
    /// Subject identifier (user id, service id, key id).
    pub subject: String,
    /// Organization the subject acts within.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    /// Environment the subject acts within.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    /// Granted scopes.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Collaborator-specific claims.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Principal {
    /// Creates a principal for `subject` with no scopes.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    /// Sets the organization id.
    #[must_use]
    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    /// Sets the environment id.
    #[must_use]
    pub fn with_environment(mut self, environment_id: impl Into<String>) -> Self {
        self.environment_id = Some(environment_id.into());
        self
    }

    /// Grants a scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Adds a collaborator-specific claim.
    #[must_use]
    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Returns true if the scope was granted.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Returns an identifier suitable for logging. Never includes claims.
    #[must_use]
    pub fn log_id(&self) -> String {
        match &self.organization_id {
            Some(org) => format!("{org}/{}", self.subject),
            None => self.subject.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_id_without_org() {
        assert_eq!(Principal::new("svc-billing").log_id(), "svc-billing");
    }

    #[test]
    fn test_scopes() {
        let p = Principal::new("u").with_scope("a").with_scope("b");
        assert!(p.has_scope("b"));
        assert!(!p.has_scope("c"));
    }

    #[test]
    fn test_deserialize_minimal() {
        let p: Principal = serde_json::from_str(r#"{"subject":"u-1"}"#).unwrap();
        assert_eq!(p.subject, "u-1");
        assert!(p.scopes.is_empty());
        assert!(p.environment_id.is_none());
    }

    #[test]
    fn test_serialize_skips_empty() {
        let json = serde_json::to_value(Principal::new("u").with_environment("prod")).unwrap();
        assert_eq!(json["environment_id"], "prod");
        assert!(json.get("organization_id").is_none());
        assert!(json.get("extra").is_none());
    }
}

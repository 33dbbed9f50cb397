//! Principal extractor.

use crate::{ArgSource, FromContext};
use hermes_core::{Error, Principal, RequestContext};
use std::ops::Deref;

/// The authenticated principal.
///
/// Extraction fails with `InvalidCredentials` (401) when no principal is
/// attached. Use `Option<Auth>` on routes where identity is optional.
///
/// # Example
///
/// ```rust
/// use hermes_core::{Principal, RequestContext};
/// use hermes_extract::{Auth, FromContext};
///
/// let ctx = RequestContext::mock().with_principal(Principal::new("user-1"));
/// let auth = Auth::extract(&(), &ctx).unwrap();
/// assert_eq!(auth.subject, "user-1");
///
/// let anonymous = RequestContext::mock();
/// assert!(Auth::extract(&(), &anonymous).is_err());
/// assert!(Option::<Auth>::extract(&(), &anonymous).unwrap().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auth(pub Principal);

impl Auth {
    /// Returns the principal.
    #[must_use]
    pub fn into_inner(self) -> Principal {
        self.0
    }
}

impl Deref for Auth {
    type Target = Principal;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromContext for Auth {
    const SOURCE: ArgSource = ArgSource::Auth;
    type Plan = ();

    fn plan() -> Self::Plan {}

    fn extract(_plan: &Self::Plan, ctx: &RequestContext) -> Result<Self, Error> {
        ctx.principal()
            .cloned()
            .map(Auth)
            .ok_or_else(Error::invalid_credentials)
    }
}

impl FromContext for Option<Auth> {
    const SOURCE: ArgSource = ArgSource::Auth;
    type Plan = ();

    fn plan() -> Self::Plan {}

    fn extract(_plan: &Self::Plan, ctx: &RequestContext) -> Result<Self, Error> {
        Ok(ctx.principal().cloned().map(Auth))
    }
}

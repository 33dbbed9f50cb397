//! Route groups sharing a path prefix and auth policy.

use crate::RouteDef;
use hermes_registry::AuthCheck;

/// Groups routes under a path prefix.
///
/// Controller-level auth checks run before each route's own checks. The
/// controller's auth default applies to routes that did not choose one.
///
/// # Example
///
/// ```rust
/// use hermes_core::Error;
/// use hermes_extract::NoBody;
/// use hermes_server::{Controller, Response, Route};
///
/// let admin = Controller::new("/admin")
///     .require_scope("admin")
///     .route(Route::get("/stats").handle(|_ctx, _body: NoBody, (): ()| async move {
///         Ok::<_, Error>(Response::ok(42_u32))
///     }));
///
/// assert_eq!(admin.prefix(), "/admin");
/// assert_eq!(admin.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Controller {
    prefix: String,
    checks: Vec<AuthCheck>,
    auth: Option<bool>,
    routes: Vec<RouteDef>,
}

impl Controller {
    /// Creates a controller for `prefix`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Adds a check that runs before every route's own checks.
    #[must_use]
    pub fn auth_check(mut self, check: AuthCheck) -> Self {
        self.checks.push(check);
        self
    }

    /// Requires `scope` on every route.
    #[must_use]
    pub fn require_scope(self, scope: impl Into<String>) -> Self {
        self.auth_check(AuthCheck::scope(scope))
    }

    /// Makes routes public unless they opt back in.
    #[must_use]
    pub fn public(mut self) -> Self {
        self.auth = Some(false);
        self
    }

    /// Adds a route.
    #[must_use]
    pub fn route(mut self, route: RouteDef) -> Self {
        self.routes.push(route);
        self
    }

    /// Returns the prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no routes were added.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Applies the prefix, checks and auth default to every route.
    pub(crate) fn into_routes(self) -> impl Iterator<Item = RouteDef> {
        let Self {
            prefix,
            checks,
            auth,
            routes,
        } = self;
        routes.into_iter().map(move |mut route| {
            route.descriptor = route
                .descriptor
                .prefix_path(&prefix)
                .prepend_auth_checks(checks.iter().cloned());
            route.auth = route.auth.or(auth);
            route
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Response, Route};
    use hermes_core::Principal;
    use hermes_extract::NoBody;
    use hermes_registry::HandlerDescriptor;

    fn route(path: &str) -> Route {
        Route::get(path)
    }

    fn finish(route: Route) -> RouteDef {
        route.handle(|_ctx, _body: NoBody, (): ()| async move { Ok(Response::ok(1_u8)) })
    }

    fn built(def: RouteDef) -> HandlerDescriptor {
        def.descriptor
            .auth_required(def.auth.unwrap_or(true))
            .build()
            .unwrap()
    }

    #[test]
    fn test_prefix_and_auth_default() {
        let mut routes = Controller::new("/v1/")
            .public()
            .route(finish(route("/items")))
            .route(finish(route("/me").authenticated()))
            .into_routes();

        let items = built(routes.next().unwrap());
        assert_eq!(items.path(), "/v1/items");
        assert!(!items.auth_required());

        let me = built(routes.next().unwrap());
        assert_eq!(me.path(), "/v1/me");
        assert!(me.auth_required());
    }

    #[test]
    fn test_controller_checks_run_first() {
        let def = Controller::new("/admin")
            .auth_check(AuthCheck::new(|_| Err("controller".into())))
            .route(finish(route("/x").auth_check(AuthCheck::new(|_| Err("route".into())))))
            .into_routes()
            .next()
            .unwrap();
        let descriptor = built(def);
        let principal = Principal::new("ada");
        let messages: Vec<String> = descriptor
            .auth_checks()
            .iter()
            .filter_map(|check| check.check(&principal).err())
            .collect();
        assert_eq!(messages, vec!["controller", "route"]);
    }
}

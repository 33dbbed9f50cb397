//! Core extractor traits.
//!
//! A side-argument is any type implementing [`FromContext`]. A handler's
//! side-arguments form a tuple implementing [`ArgList`]; [`PushArg`] appends
//! one extractor to such a tuple at the type level so route builders can
//! accumulate arguments one call at a time.

use crate::ArgSource;
use hermes_core::{Error, RequestContext};

/// Types that can be bound from a [`RequestContext`].
///
/// Binding runs in two phases. [`FromContext::plan`] is called once when the
/// route is registered and may precompute per-type state (such as a
/// [`CoercionTable`](crate::CoercionTable)). [`FromContext::extract`] runs per
/// request with that state.
///
/// # Implementing `FromContext`
///
/// ```rust
/// use hermes_core::{Error, RequestContext};
/// use hermes_extract::{ArgSource, ArgSourceExt, ExtractionError, FromContext};
///
/// struct ApiVersion(u32);
///
/// impl FromContext for ApiVersion {
///     const SOURCE: ArgSource = ArgSource::Header;
///     type Plan = ();
///
///     fn plan() {}
///
///     fn extract(_plan: &(), ctx: &RequestContext) -> Result<Self, Error> {
///         let raw = ctx
///             .headers()
///             .get("x-api-version")
///             .and_then(|v| v.to_str().ok())
///             .ok_or_else(|| ExtractionError::missing(Self::SOURCE, "x-api-version"))?;
///         raw.parse()
///             .map(ApiVersion)
///             .map_err(|_| Self::SOURCE.invalid("x-api-version", "expected an integer"))
///     }
/// }
/// ```
pub trait FromContext: Sized + Send + 'static {
    /// Where the value comes from.
    const SOURCE: ArgSource;

    /// Per-type state built at registration.
    type Plan: Send + Sync + 'static;

    /// Builds the per-type state.
    fn plan() -> Self::Plan;

    /// Extracts the value for one request.
    fn extract(plan: &Self::Plan, ctx: &RequestContext) -> Result<Self, Error>;
}

/// Helpers for building argument errors from a source.
pub trait ArgSourceExt {
    /// An `InvalidArgument` error for `field` with a detail message.
    fn invalid(self, field: &str, detail: &str) -> Error;
}

impl ArgSourceExt for ArgSource {
    #[track_caller]
    fn invalid(self, field: &str, detail: &str) -> Error {
        Error::invalid_argument(format!("invalid {self} parameter '{field}': {detail}"))
            .with_metadata("source", self.as_str())
            .with_metadata("field", field)
    }
}

/// An ordered list of side-arguments: `()`, `(A,)`, `(A, B)` or `(A, B, C)`.
pub trait ArgList: Sized + Send + 'static {
    /// Combined per-type state for every element.
    type Plan: Send + Sync + 'static;

    /// Builds the combined state.
    fn plan() -> Self::Plan;

    /// Returns the source of each element, in order.
    fn sources() -> Vec<ArgSource>;

    /// Extracts every element, failing on the first error.
    fn extract(plan: &Self::Plan, ctx: &RequestContext) -> Result<Self, Error>;
}

impl ArgList for () {
    type Plan = ();

    fn plan() -> Self::Plan {}

    fn sources() -> Vec<ArgSource> {
        Vec::new()
    }

    fn extract(_plan: &Self::Plan, _ctx: &RequestContext) -> Result<Self, Error> {
        Ok(())
    }
}

macro_rules! impl_arg_list_for_tuple {
    ($($T:ident $idx:tt),+) => {
        impl<$($T: FromContext),+> ArgList for ($($T,)+) {
            type Plan = ($($T::Plan,)+);

            fn plan() -> Self::Plan {
                ($($T::plan(),)+)
            }

            fn sources() -> Vec<ArgSource> {
                vec![$($T::SOURCE),+]
            }

            fn extract(plan: &Self::Plan, ctx: &RequestContext) -> Result<Self, Error> {
                Ok(($($T::extract(&plan.$idx, ctx)?,)+))
            }
        }
    };
}

impl_arg_list_for_tuple!(A 0);
impl_arg_list_for_tuple!(A 0, B 1);
impl_arg_list_for_tuple!(A 0, B 1, C 2);

/// Appends `A` to an argument list.
///
/// Implemented for lists of up to two elements, so a fourth argument does
/// not compile.
pub trait PushArg<A: FromContext>: ArgList {
    /// The list with `A` appended.
    type Output: ArgList;
}

impl<A: FromContext> PushArg<A> for () {
    type Output = (A,);
}

impl<T1: FromContext, A: FromContext> PushArg<A> for (T1,) {
    type Output = (T1, A);
}

impl<T1: FromContext, T2: FromContext, A: FromContext> PushArg<A> for (T1, T2) {
    type Output = (T1, T2, A);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExtractionError;
    use hermes_core::ErrorKind;

    struct Tenant(String);

    impl FromContext for Tenant {
        const SOURCE: ArgSource = ArgSource::Path;
        type Plan = &'static str;

        fn plan() -> Self::Plan {
            "tenant"
        }

        fn extract(plan: &Self::Plan, ctx: &RequestContext) -> Result<Self, Error> {
            ctx.path_param(plan)
                .map(|t| Tenant(t.to_string()))
                .ok_or_else(|| ExtractionError::missing(Self::SOURCE, *plan).into())
        }
    }

    struct Fails;

    impl FromContext for Fails {
        const SOURCE: ArgSource = ArgSource::Header;
        type Plan = ();

        fn plan() -> Self::Plan {}

        fn extract(_plan: &(), _ctx: &RequestContext) -> Result<Self, Error> {
            Err(Self::SOURCE.invalid("x", "always"))
        }
    }

    fn pushed<L: PushArg<A>, A: FromContext>() -> Vec<ArgSource> {
        <L::Output as ArgList>::sources()
    }

    #[test]
    fn test_tuple_extraction() {
        let ctx = RequestContext::mock()
            .with_path_params(hermes_core::Params::new().with("tenant", "acme"));
        let plan = <(Tenant,)>::plan();
        let (tenant,) = <(Tenant,)>::extract(&plan, &ctx).unwrap();
        assert_eq!(tenant.0, "acme");
    }

    #[test]
    fn test_first_failure_wins() {
        let ctx = RequestContext::mock();
        let plan = <(Tenant, Fails)>::plan();
        let Err(err) = <(Tenant, Fails)>::extract(&plan, &ctx) else {
            panic!("expected failure");
        };
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.errors()[0].metadata()["source"], "path");
    }

    #[test]
    fn test_push_arg_appends() {
        assert_eq!(pushed::<(), Tenant>(), vec![ArgSource::Path]);
        assert_eq!(
            pushed::<(Tenant, Tenant), Fails>(),
            vec![ArgSource::Path, ArgSource::Path, ArgSource::Header]
        );
        assert!(<() as ArgList>::sources().is_empty());
    }
}

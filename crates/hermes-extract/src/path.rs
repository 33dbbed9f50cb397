//! Path parameter extractor.

use crate::{ArgSource, CoercionTable, ExtractionError, FromContext};
use hermes_core::{Error, RequestContext};
use serde::de::DeserializeOwned;
use std::ops::Deref;

/// Binds path parameters into `T`.
///
/// `T` may be a struct keyed by parameter name, a tuple bound in template
/// order, or a single scalar for one-parameter routes. Numeric and boolean
/// fields are coerced from their string form.
///
/// # Example
///
/// ```rust
/// use hermes_core::{Params, RequestContext};
/// use hermes_extract::{FromContext, Path};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct OrderPath {
///     tenant: String,
///     order_id: u64,
/// }
///
/// let ctx = RequestContext::mock()
///     .with_path_params(Params::new().with("tenant", "acme").with("order_id", "42"));
///
/// let plan = Path::<OrderPath>::plan();
/// let Path(path) = Path::<OrderPath>::extract(&plan, &ctx).unwrap();
/// assert_eq!(path.tenant, "acme");
/// assert_eq!(path.order_id, 42);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path<T>(pub T);

impl<T> Path<T> {
    /// Returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Path<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: DeserializeOwned + Send + 'static> FromContext for Path<T> {
    const SOURCE: ArgSource = ArgSource::Path;
    type Plan = CoercionTable;

    fn plan() -> Self::Plan {
        CoercionTable::of::<T>()
    }

    fn extract(plan: &Self::Plan, ctx: &RequestContext) -> Result<Self, Error> {
        plan.bind(&ctx.path_params().to_pairs())
            .map(Path)
            .map_err(|e| ExtractionError::deserialize(Self::SOURCE, plan.type_name(), e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{ErrorKind, Params};

    #[test]
    fn test_scalar_path() {
        let ctx = RequestContext::mock().with_path_params(Params::new().with("id", "7"));
        let Path(id) = Path::<u32>::extract(&Path::<u32>::plan(), &ctx).unwrap();
        assert_eq!(id, 7);
    }

    #[test]
    fn test_tuple_path_in_template_order() {
        let ctx = RequestContext::mock()
            .with_path_params(Params::new().with("org", "acme").with("n", "3"));
        let plan = Path::<(String, u8)>::plan();
        let Path((org, n)) = Path::<(String, u8)>::extract(&plan, &ctx).unwrap();
        assert_eq!(org, "acme");
        assert_eq!(n, 3);
    }

    #[test]
    fn test_bad_value_is_invalid_argument() {
        let ctx = RequestContext::mock().with_path_params(Params::new().with("id", "abc"));
        let err = Path::<u32>::extract(&Path::<u32>::plan(), &ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.errors()[0].metadata()["source"], "path");
    }
}

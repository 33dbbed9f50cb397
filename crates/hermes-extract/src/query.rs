//! Query string extractor.

use crate::{ArgSource, CoercionTable, ExtractionError, FromContext};
use hermes_core::{Error, RequestContext};
use serde::de::DeserializeOwned;
use std::ops::Deref;

/// Binds query pairs into `T`.
///
/// Repeated keys bind sequence fields (`?ids=1&ids=2` into `Vec<u32>`); a
/// repeated key bound to a scalar field takes the first value.
///
/// # Example
///
/// ```rust
/// use hermes_core::RequestContext;
/// use hermes_extract::{FromContext, Query};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct ListParams {
///     #[serde(default)]
///     ids: Vec<u32>,
///     limit: Option<u32>,
/// }
///
/// let ctx = RequestContext::mock()
///     .with_query_string("ids=1&ids=2&limit=10")
///     .unwrap();
///
/// let Query(params) = Query::<ListParams>::extract(&Query::<ListParams>::plan(), &ctx).unwrap();
/// assert_eq!(params.ids, vec![1, 2]);
/// assert_eq!(params.limit, Some(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query<T>(pub T);

impl<T> Query<T> {
    /// Returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Query<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: DeserializeOwned + Send + 'static> FromContext for Query<T> {
    const SOURCE: ArgSource = ArgSource::Query;
    type Plan = CoercionTable;

    fn plan() -> Self::Plan {
        CoercionTable::of::<T>()
    }

    fn extract(plan: &Self::Plan, ctx: &RequestContext) -> Result<Self, Error> {
        plan.bind(ctx.query())
            .map(Query)
            .map_err(|e| ExtractionError::deserialize(Self::SOURCE, plan.type_name(), e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, Deserialize)]
    struct Paging {
        limit: u32,
        #[serde(default)]
        cursor: Option<String>,
    }

    fn ctx(query: &str) -> RequestContext {
        RequestContext::mock().with_query_string(query).unwrap()
    }

    #[test]
    fn test_limit_binds_u32() {
        let plan = Query::<Paging>::plan();
        let Query(p) = Query::<Paging>::extract(&plan, &ctx("limit=10")).unwrap();
        assert_eq!(p.limit, 10);
        assert!(p.cursor.is_none());
    }

    #[test]
    fn test_repeated_scalar_binds_first() {
        let plan = Query::<Paging>::plan();
        let Query(p) = Query::<Paging>::extract(&plan, &ctx("limit=5&limit=50&cursor=abc")).unwrap();
        assert_eq!(p.limit, 5);
        assert_eq!(p.cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn test_missing_required_field_names_it() {
        let plan = Query::<Paging>::plan();
        let err = Query::<Paging>::extract(&plan, &ctx("cursor=abc")).unwrap_err();
        assert_eq!(err.errors()[0].metadata()["field"], "limit");
        assert_eq!(err.errors()[0].metadata()["source"], "query");
    }

    #[test]
    fn test_map_target_keeps_strings() {
        let plan = Query::<HashMap<String, String>>::plan();
        let Query(map) =
            Query::<HashMap<String, String>>::extract(&plan, &ctx("a=1&b=two")).unwrap();
        assert_eq!(map["a"], "1");
        assert_eq!(map["b"], "two");
    }
}

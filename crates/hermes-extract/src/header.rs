//! Header extractor.

use crate::{ArgSource, CoercionTable, ExtractionError, FromContext};
use hermes_core::{Error, RequestContext};
use serde::de::DeserializeOwned;
use std::ops::Deref;

/// Binds request headers into `T`.
///
/// Each header is offered under its lowercase name and, when the name
/// contains dashes, under a snake_case alias (`x-tenant-id` also binds a
/// `x_tenant_id` field). Non-UTF-8 values are skipped.
///
/// # Example
///
/// ```rust
/// use hermes_core::RequestContext;
/// use hermes_extract::{FromContext, Header};
/// use http::HeaderMap;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Tenancy {
///     x_tenant_id: String,
///     x_api_version: Option<u8>,
/// }
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-tenant-id", "acme".parse().unwrap());
/// headers.insert("x-api-version", "2".parse().unwrap());
/// let ctx = RequestContext::mock().with_headers(headers);
///
/// let Header(t) = Header::<Tenancy>::extract(&Header::<Tenancy>::plan(), &ctx).unwrap();
/// assert_eq!(t.x_tenant_id, "acme");
/// assert_eq!(t.x_api_version, Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header<T>(pub T);

impl<T> Header<T> {
    /// Returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Header<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn header_pairs(ctx: &RequestContext) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(ctx.headers().len());
    for (name, value) in ctx.headers() {
        let Ok(value) = value.to_str() else {
            continue;
        };
        let name = name.as_str();
        pairs.push((name.to_string(), value.to_string()));
        if name.contains('-') {
            pairs.push((name.replace('-', "_"), value.to_string()));
        }
    }
    pairs
}

impl<T: DeserializeOwned + Send + 'static> FromContext for Header<T> {
    const SOURCE: ArgSource = ArgSource::Header;
    type Plan = CoercionTable;

    fn plan() -> Self::Plan {
        CoercionTable::of::<T>()
    }

    fn extract(plan: &Self::Plan, ctx: &RequestContext) -> Result<Self, Error> {
        plan.bind(&header_pairs(ctx))
            .map(Header)
            .map_err(|e| ExtractionError::deserialize(Self::SOURCE, plan.type_name(), e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, HeaderValue};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Tags {
        #[serde(rename = "x-tag")]
        tags: Vec<String>,
    }

    #[test]
    fn test_repeated_header_binds_sequence() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));
        let ctx = RequestContext::mock().with_headers(headers);
        let Header(tags) = Header::<Tags>::extract(&Header::<Tags>::plan(), &ctx).unwrap();
        assert_eq!(tags.tags, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_header_fails() {
        let err = Header::<Tags>::extract(&Header::<Tags>::plan(), &RequestContext::mock())
            .unwrap_err();
        assert_eq!(err.errors()[0].metadata()["field"], "x-tag");
    }
}

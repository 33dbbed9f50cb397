//! Path parameters delivered by the external router.

use smallvec::SmallVec;

/// Parameters stored inline before spilling to the heap.
const INLINE_PARAMS: usize = 4;

/// Path parameters captured for one request, in template order.
///
/// The router that matched the request fills this in; Hermes only reads it.
///
/// # Example
///
/// ```
/// use hermes_core::Params;
///
/// let params: Params = [("tenant", "acme"), ("id", "42")].into_iter().collect();
///
/// assert_eq!(params.get("id"), Some("42"));
/// assert_eq!(params.names().collect::<Vec<_>>(), vec!["tenant", "id"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter. A repeated name shadows nothing; [`Params::get`] returns the first.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Builder form of [`Params::push`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// Returns the first value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|(n, _)| n == name)
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Iterates over parameter names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(|(n, _)| n.as_str())
    }

    /// Copies the parameters into owned pairs, the shape the coercion layer consumes.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.inner.to_vec()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, String)>,
        fn(&'a (String, String)) -> (&'a str, &'a str),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Params {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_binding_wins() {
        let params = Params::new().with("id", "1").with("id", "2");
        assert_eq!(params.get("id"), Some("1"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_order_preserved_in_pairs() {
        let params: Params = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(
            params.to_pairs(),
            vec![("b".to_string(), "2".to_string()), ("a".to_string(), "1".to_string())]
        );
        assert!(params.contains("a"));
        assert!(!params.contains("c"));
    }

    #[test]
    fn test_empty() {
        let params = Params::new();
        assert!(params.is_empty());
        assert_eq!((&params).into_iter().count(), 0);
    }
}

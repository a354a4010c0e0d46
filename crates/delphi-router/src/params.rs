//! Bound path parameters.
//!
//! Values are raw: the matcher never percent-decodes, so the parameter
//! deserializer sees exactly what arrived on the wire.

use smallvec::SmallVec;

/// Number of bindings stored inline before spilling to the heap.
const INLINE_PARAMS: usize = 4;

/// Placeholder bindings produced by a template match, in template order.
///
/// # Example
///
/// ```rust
/// use delphi_router::Params;
///
/// let mut params = Params::new();
/// params.push("petId", "42");
///
/// assert_eq!(params.get("petId"), Some("42"));
/// assert_eq!(params.get("ownerId"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates an empty binding set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds placeholder names to captured values positionally.
    pub(crate) fn bind(names: &[String], values: &[&str]) -> Self {
        names
            .iter()
            .zip(values)
            .map(|(name, value)| (name.clone(), (*value).to_string()))
            .collect()
    }

    /// Adds a binding.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the raw value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates over `(name, value)` pairs in template order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_new() {
        let params = Params::new();
        assert!(params.is_empty());
        assert_eq!(params.len(), 0);
    }

    #[test]
    fn test_params_bind_positional() {
        let names = vec!["org".to_string(), "repo".to_string()];
        let params = Params::bind(&names, &["acme", "delphi"]);

        assert_eq!(params.get("org"), Some("acme"));
        assert_eq!(params.get("repo"), Some("delphi"));
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("org", "acme"), ("repo", "delphi")]);
    }

    #[test]
    fn test_params_spill_to_heap() {
        let mut params = Params::new();
        for i in 0..10 {
            params.push(format!("key{i}"), format!("value{i}"));
        }

        assert_eq!(params.len(), 10);
        assert_eq!(params.get("key7"), Some("value7"));
    }

    #[test]
    fn test_params_keep_raw_encoding() {
        let mut params = Params::new();
        params.push("name", "a%20b");
        assert_eq!(params.get("name"), Some("a%20b"));
    }
}

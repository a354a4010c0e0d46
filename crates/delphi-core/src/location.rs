//! Parameter locations and per-location containers.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a parameter value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// The URL query string.
    Query,
    /// A request header.
    Header,
    /// A variable in the matched server URL.
    Server,
    /// A placeholder in the path template.
    Path,
    /// The `Cookie` header.
    Cookie,
}

impl ParameterLocation {
    /// All locations in validation order.
    pub const ALL: [Self; 5] = [
        Self::Query,
        Self::Header,
        Self::Server,
        Self::Path,
        Self::Cookie,
    ];

    /// Returns the lowercase name used in API descriptions.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Header => "header",
            Self::Server => "server",
            Self::Path => "path",
            Self::Cookie => "cookie",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name to value mapping, in declaration order.
pub type ParametersMap<T> = IndexMap<String, T>;

/// Parsed parameters, as returned by
/// [`ResolvedPath::parse_parameters`](crate::ResolvedPath::parse_parameters).
pub type ParsedParameters = ParametersByLocation<ParametersMap<Value>>;

/// One value of type `T` per parameter location.
///
/// # Example
///
/// ```rust
/// use delphi_core::{ParameterLocation, ParametersByLocation};
///
/// let mut counts: ParametersByLocation<usize> = ParametersByLocation::default();
/// *counts.get_mut(ParameterLocation::Cookie) += 2;
///
/// let order: Vec<_> = counts.iter().map(|(location, _)| location).collect();
/// assert_eq!(order, ParameterLocation::ALL);
/// assert_eq!(counts.cookie, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParametersByLocation<T> {
    /// Query string values.
    pub query: T,
    /// Header values.
    pub header: T,
    /// Server variable values.
    pub server: T,
    /// Path placeholder values.
    pub path: T,
    /// Cookie values.
    pub cookie: T,
}

impl<T> ParametersByLocation<T> {
    /// Returns the value for `location`.
    #[must_use]
    pub const fn get(&self, location: ParameterLocation) -> &T {
        match location {
            ParameterLocation::Query => &self.query,
            ParameterLocation::Header => &self.header,
            ParameterLocation::Server => &self.server,
            ParameterLocation::Path => &self.path,
            ParameterLocation::Cookie => &self.cookie,
        }
    }

    /// Returns the value for `location` mutably.
    pub fn get_mut(&mut self, location: ParameterLocation) -> &mut T {
        match location {
            ParameterLocation::Query => &mut self.query,
            ParameterLocation::Header => &mut self.header,
            ParameterLocation::Server => &mut self.server,
            ParameterLocation::Path => &mut self.path,
            ParameterLocation::Cookie => &mut self.cookie,
        }
    }

    /// Iterates over locations in validation order.
    pub fn iter(&self) -> impl Iterator<Item = (ParameterLocation, &T)> {
        ParameterLocation::ALL
            .into_iter()
            .map(move |location| (location, self.get(location)))
    }
}

impl<T> ParametersByLocation<ParametersMap<T>> {
    /// Looks up a single parameter.
    #[must_use]
    pub fn find(&self, location: ParameterLocation, name: &str) -> Option<&T> {
        self.get(location).get(name)
    }

    /// Returns true if no location holds a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, map)| map.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_location_names() {
        let names: Vec<_> = ParameterLocation::ALL.iter().map(ParameterLocation::as_str).collect();
        assert_eq!(names, vec!["query", "header", "server", "path", "cookie"]);
        assert_eq!(ParameterLocation::Cookie.to_string(), "cookie");
    }

    #[test]
    fn test_location_serde() {
        let json = serde_json::to_string(&ParameterLocation::Header).unwrap();
        assert_eq!(json, "\"header\"");
        let back: ParameterLocation = serde_json::from_str("\"path\"").unwrap();
        assert_eq!(back, ParameterLocation::Path);
    }

    #[test]
    fn test_find_and_is_empty() {
        let mut parsed = ParsedParameters::default();
        assert!(parsed.is_empty());

        parsed.query.insert("limit".to_string(), json!(10));
        assert_eq!(parsed.find(ParameterLocation::Query, "limit"), Some(&json!(10)));
        assert_eq!(parsed.find(ParameterLocation::Header, "limit"), None);
        assert!(!parsed.is_empty());
    }

    #[test]
    fn test_maps_keep_insertion_order() {
        let mut parsed = ParsedParameters::default();
        parsed.header.insert("x-b".to_string(), json!("2"));
        parsed.header.insert("x-a".to_string(), json!("1"));
        let keys: Vec<_> = parsed.header.keys().cloned().collect();
        assert_eq!(keys, vec!["x-b", "x-a"]);
    }
}

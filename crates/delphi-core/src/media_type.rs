//! Media-type ranges and negotiation.
//!
//! Declared keys may be exact (`application/json`), subtype wildcards
//! (`application/*`) or the full wildcard (`*/*`). A concrete request media
//! type selects the most specific declared range; parameters such as
//! `charset` never take part in matching.

use mime::Mime;

use crate::error::{DelphiError, DelphiResult};

/// How closely a declared range matches a concrete media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Specificity {
    /// `*/*`
    Any,
    /// `type/*`
    Subtype,
    /// `type/subtype`
    Exact,
}

#[derive(Debug, Clone)]
struct Entry<T> {
    key: String,
    type_: String,
    subtype: String,
    value: T,
}

impl<T> Entry<T> {
    fn specificity(&self, type_: &str, subtype: &str) -> Option<Specificity> {
        match (self.type_.as_str(), self.subtype.as_str()) {
            ("*", "*") => Some(Specificity::Any),
            (t, "*") if t == type_ => Some(Specificity::Subtype),
            (t, s) if t == type_ && s == subtype => Some(Specificity::Exact),
            _ => None,
        }
    }
}

/// Values keyed by media-type range.
///
/// # Example
///
/// ```rust
/// use delphi_core::MediaTypeMap;
///
/// let mut map = MediaTypeMap::new();
/// map.insert("application/*", 1).unwrap();
/// map.insert("application/json", 2).unwrap();
///
/// let (key, value) = map.negotiate("application/json; charset=utf-8").unwrap();
/// assert_eq!((key, *value), ("application/json", 2));
///
/// let (key, value) = map.negotiate("application/xml").unwrap();
/// assert_eq!((key, *value), ("application/*", 1));
///
/// assert!(map.negotiate("text/plain").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct MediaTypeMap<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Default for MediaTypeMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MediaTypeMap<T> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds a range. Later duplicates of the same range are shadowed by
    /// earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`DelphiError::InvalidDocument`] if `key` is not a media type.
    pub fn insert(&mut self, key: &str, value: T) -> DelphiResult<()> {
        let mime = parse(key).ok_or_else(|| {
            DelphiError::invalid_document(format!("'{key}' is not a valid media type"))
        })?;
        self.entries.push(Entry {
            key: key.to_string(),
            type_: mime.type_().as_str().to_ascii_lowercase(),
            subtype: mime.subtype().as_str().to_ascii_lowercase(),
            value,
        });
        Ok(())
    }

    /// Selects the most specific range matching `content_type`.
    ///
    /// Returns the declared key and its value. On equal specificity the
    /// earliest inserted range wins.
    #[must_use]
    pub fn negotiate(&self, content_type: &str) -> Option<(&str, &T)> {
        let mime = parse(content_type)?;
        let type_ = mime.type_().as_str().to_ascii_lowercase();
        let subtype = mime.subtype().as_str().to_ascii_lowercase();

        let mut best: Option<(Specificity, &Entry<T>)> = None;
        for entry in &self.entries {
            let Some(score) = entry.specificity(&type_, &subtype) else {
                continue;
            };
            if best.map_or(true, |(current, _)| score > current) {
                best = Some((score, entry));
            }
        }
        best.map(|(_, entry)| (entry.key.as_str(), &entry.value))
    }

    /// Returns declared keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// Returns the number of ranges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no ranges are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parses a media type, tolerating surrounding whitespace.
#[must_use]
pub fn parse(raw: &str) -> Option<Mime> {
    raw.trim().parse::<Mime>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_map() -> MediaTypeMap<&'static str> {
        let mut map = MediaTypeMap::new();
        map.insert("*/*", "any").unwrap();
        map.insert("application/*", "application").unwrap();
        map.insert("application/json", "json").unwrap();
        map
    }

    #[test]
    fn test_exact_preferred_over_wildcards() {
        let map = body_map();
        assert_eq!(map.negotiate("application/json"), Some(("application/json", &"json")));
    }

    #[test]
    fn test_subtype_wildcard_fallback() {
        let map = body_map();
        assert_eq!(
            map.negotiate("application/xml"),
            Some(("application/*", &"application"))
        );
    }

    #[test]
    fn test_full_wildcard_fallback() {
        let map = body_map();
        assert_eq!(map.negotiate("text/plain"), Some(("*/*", &"any")));
    }

    #[test]
    fn test_parameters_and_case_ignored() {
        let map = body_map();
        assert_eq!(
            map.negotiate("Application/JSON; charset=UTF-8"),
            Some(("application/json", &"json"))
        );
    }

    #[test]
    fn test_no_match() {
        let mut map = MediaTypeMap::new();
        map.insert("application/json", ()).unwrap();
        assert!(map.negotiate("text/plain").is_none());
        assert!(map.negotiate("not a media type").is_none());
    }

    #[test]
    fn test_invalid_key_rejected() {
        let mut map = MediaTypeMap::new();
        assert!(map.insert("json", ()).is_err());
        assert!(map.is_empty());
    }

    #[test]
    fn test_first_declared_wins_on_tie() {
        let mut map = MediaTypeMap::new();
        map.insert("application/json", 1).unwrap();
        map.insert("application/json; charset=utf-8", 2).unwrap();
        assert_eq!(map.negotiate("application/json").map(|(_, v)| *v), Some(1));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_specificity_order() {
        assert!(Specificity::Exact > Specificity::Subtype);
        assert!(Specificity::Subtype > Specificity::Any);
    }
}

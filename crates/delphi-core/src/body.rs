//! Request body parsing capabilities.
//!
//! A [`BodyParser`] turns raw bytes of one media type into a JSON value.
//! Parsers are looked up from a [`BodyParserRegistry`] by the request's
//! media type, using the same range matching as request-body negotiation.

use std::fmt;
use std::sync::Arc;

use mime::Mime;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::DelphiResult;
use crate::media_type::MediaTypeMap;

/// A body could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BodyParseError {
    /// Human-readable reason.
    pub message: String,
}

impl BodyParseError {
    /// Creates a parse error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Decodes a request body of a given media type.
pub trait BodyParser: Send + Sync {
    /// Parses `body`, sent with `media_type`.
    fn parse(&self, media_type: &Mime, body: &[u8]) -> Result<Value, BodyParseError>;
}

/// Parses JSON bodies with `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBodyParser;

impl BodyParser for JsonBodyParser {
    fn parse(&self, _media_type: &Mime, body: &[u8]) -> Result<Value, BodyParseError> {
        serde_json::from_slice(body).map_err(|e| BodyParseError::new(format!("invalid JSON: {e}")))
    }
}

/// Reads textual bodies as a single string.
///
/// Only UTF-8 (and its ASCII subset) is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextBodyParser;

impl BodyParser for TextBodyParser {
    fn parse(&self, media_type: &Mime, body: &[u8]) -> Result<Value, BodyParseError> {
        if let Some(charset) = media_type.get_param(mime::CHARSET) {
            let charset = charset.as_str().to_ascii_lowercase();
            if charset != "utf-8" && charset != "us-ascii" {
                return Err(BodyParseError::new(format!("unsupported charset '{charset}'")));
            }
        }
        std::str::from_utf8(body)
            .map(|text| Value::String(text.to_string()))
            .map_err(|e| BodyParseError::new(format!("invalid UTF-8: {e}")))
    }
}

/// Parses `application/x-www-form-urlencoded` bodies into an object.
///
/// Repeated keys collect into an array, in the order they appear.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormBodyParser;

impl BodyParser for FormBodyParser {
    fn parse(&self, _media_type: &Mime, body: &[u8]) -> Result<Value, BodyParseError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
            .map_err(|e| BodyParseError::new(format!("invalid form body: {e}")))?;

        let mut object = Map::new();
        for (key, value) in pairs {
            match object.get_mut(&key) {
                Some(Value::Array(items)) => items.push(Value::String(value)),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, Value::String(value)]);
                }
                None => {
                    object.insert(key, Value::String(value));
                }
            }
        }
        Ok(Value::Object(object))
    }
}

/// Body parsers keyed by media-type range.
///
/// # Example
///
/// ```rust
/// use delphi_core::BodyParserRegistry;
///
/// let registry = BodyParserRegistry::default();
/// let parser = registry.find("application/json; charset=utf-8").unwrap();
/// let mime = "application/json".parse().unwrap();
/// assert_eq!(parser.parse(&mime, br#"{"a":1}"#).unwrap()["a"], 1);
///
/// assert!(registry.find("image/png").is_none());
/// ```
#[derive(Clone)]
pub struct BodyParserRegistry {
    parsers: MediaTypeMap<Arc<dyn BodyParser>>,
}

impl BodyParserRegistry {
    /// Creates a registry with no parsers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            parsers: MediaTypeMap::new(),
        }
    }

    /// Registers a parser for a media-type range.
    ///
    /// # Errors
    ///
    /// Returns an error if `range` is not a media type.
    pub fn register(&mut self, range: &str, parser: impl BodyParser + 'static) -> DelphiResult<()> {
        self.parsers.insert(range, Arc::new(parser))
    }

    /// Returns the parser for the most specific range matching
    /// `content_type`.
    #[must_use]
    pub fn find(&self, content_type: &str) -> Option<Arc<dyn BodyParser>> {
        self.parsers
            .negotiate(content_type)
            .map(|(_, parser)| Arc::clone(parser))
    }
}

impl Default for BodyParserRegistry {
    /// JSON, form and text parsers.
    fn default() -> Self {
        let mut parsers: MediaTypeMap<Arc<dyn BodyParser>> = MediaTypeMap::new();
        let defaults: [(&str, Arc<dyn BodyParser>); 3] = [
            ("application/json", Arc::new(JsonBodyParser)),
            ("application/x-www-form-urlencoded", Arc::new(FormBodyParser)),
            ("text/*", Arc::new(TextBodyParser)),
        ];
        for (range, parser) in defaults {
            let _ = parsers.insert(range, parser);
        }
        Self { parsers }
    }
}

impl fmt::Debug for BodyParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyParserRegistry")
            .field("ranges", &self.parsers.keys().collect::<Vec<_>>())
            .finish()
    }
}

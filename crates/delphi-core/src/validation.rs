//! Validation errors and validator capabilities.
//!
//! A [`ValidatorFunction`] checks one value against one schema node and
//! returns every violation it finds, or `None` when the value is valid.
//! Validators are produced once per schema node by a [`ValidatorFactory`]
//! and shared by every request.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DelphiResult;
use crate::location::ParameterLocation;

/// Which part of the request a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSource {
    /// The URL query string.
    Query,
    /// A request header.
    Header,
    /// A server variable.
    Server,
    /// A path placeholder.
    Path,
    /// A cookie.
    Cookie,
    /// The request body.
    Request,
}

impl From<ParameterLocation> for ErrorSource {
    fn from(location: ParameterLocation) -> Self {
        match location {
            ParameterLocation::Query => Self::Query,
            ParameterLocation::Header => Self::Header,
            ParameterLocation::Server => Self::Server,
            ParameterLocation::Path => Self::Path,
            ParameterLocation::Cookie => Self::Cookie,
        }
    }
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "query",
            Self::Header => "header",
            Self::Server => "server",
            Self::Path => "path",
            Self::Cookie => "cookie",
            Self::Request => "request",
        })
    }
}

/// Where a violation was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLocation {
    /// Request part.
    #[serde(rename = "in")]
    pub source: ErrorSource,
    /// Parameter name, or `body`.
    pub name: String,
    /// JSON pointer to the schema or declaration in the API description.
    pub doc_path: String,
    /// JSON pointer into the offending value (empty for the value itself).
    pub path: String,
}

/// One violated constraint.
///
/// # Example
///
/// ```rust
/// use delphi_core::{ErrorSource, ValidationTarget};
///
/// let target = ValidationTarget::new(ErrorSource::Query, "limit", "/paths/~1pets/get/parameters/0");
/// let error = target.error("/", "must be >= 1");
/// assert_eq!(error.to_string(), "query parameter 'limit' at '/': must be >= 1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Human-readable message.
    pub message: String,
    /// Where the violation was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<ErrorLocation>,
}

impl ValidationError {
    /// Creates an error with no location.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    /// Creates the error reported for an absent required parameter.
    #[must_use]
    pub fn missing_parameter(
        location: ParameterLocation,
        name: &str,
        doc_path: impl Into<String>,
    ) -> Self {
        ValidationTarget::new(location.into(), name, doc_path)
            .error("", format!("Missing required {location} parameter \"{name}\""))
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) if location.path.is_empty() => write!(
                f,
                "{} parameter '{}': {}",
                location.source, location.name, self.message
            ),
            Some(location) => write!(
                f,
                "{} parameter '{}' at '{}': {}",
                location.source, location.name, location.path, self.message
            ),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Turns an accumulated list into the `None`-when-valid form.
#[must_use]
pub fn into_errors(errors: Vec<ValidationError>) -> Option<Vec<ValidationError>> {
    if errors.is_empty() {
        None
    } else {
        Some(errors)
    }
}

/// What a compiled validator reports its errors against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationTarget {
    /// Request part.
    pub source: ErrorSource,
    /// Parameter name, or `body`.
    pub name: String,
    /// JSON pointer to the schema in the API description.
    pub doc_path: String,
}

impl ValidationTarget {
    /// Creates a target.
    #[must_use]
    pub fn new(source: ErrorSource, name: impl Into<String>, doc_path: impl Into<String>) -> Self {
        Self {
            source,
            name: name.into(),
            doc_path: doc_path.into(),
        }
    }

    /// Builds an error located at `path` inside the validated value.
    #[must_use]
    pub fn error(&self, path: impl Into<String>, message: impl Into<String>) -> ValidationError {
        ValidationError {
            message: message.into(),
            location: Some(ErrorLocation {
                source: self.source,
                name: self.name.clone(),
                doc_path: self.doc_path.clone(),
                path: path.into(),
            }),
        }
    }
}

/// Validates one value against one schema node.
///
/// Closures with the right signature implement this trait:
///
/// ```rust
/// use delphi_core::{ValidationError, ValidatorFunction};
/// use serde_json::{json, Value};
///
/// let non_null = |value: &Value| {
///     value.is_null().then(|| vec![ValidationError::new("must not be null")])
/// };
/// assert!(non_null.validate(&json!(1)).is_none());
/// assert_eq!(non_null.validate(&Value::Null).unwrap().len(), 1);
/// ```
pub trait ValidatorFunction: Send + Sync {
    /// Returns every violation, or `None` when `value` is valid.
    fn validate(&self, value: &Value) -> Option<Vec<ValidationError>>;
}

impl<F> ValidatorFunction for F
where
    F: Fn(&Value) -> Option<Vec<ValidationError>> + Send + Sync,
{
    fn validate(&self, value: &Value) -> Option<Vec<ValidationError>> {
        self(value)
    }
}

/// Compiles schema nodes into validators.
pub trait ValidatorFactory: Send + Sync {
    /// Compiles `schema`. `root` is the whole API description, used to
    /// resolve references.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema itself is unusable, for example an
    /// unresolvable reference or an invalid `pattern`.
    fn compile(
        &self,
        schema: &Value,
        root: &Arc<Value>,
        target: ValidationTarget,
    ) -> DelphiResult<Arc<dyn ValidatorFunction>>;
}

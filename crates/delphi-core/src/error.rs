//! Error types for Delphi.
//!
//! [`DelphiError`] covers everything that is *thrown*: problems with the API
//! description itself and parameter input that cannot be interpreted at
//! all. Ordinary request mistakes are never errors; they are returned as
//! [`ValidationError`](crate::ValidationError) lists.

use http::StatusCode;
use thiserror::Error;

use crate::location::ParameterLocation;

/// Result type alias using [`DelphiError`].
pub type DelphiResult<T> = Result<T, DelphiError>;

/// Standard error type for Delphi.
///
/// # Example
///
/// ```
/// use delphi_core::{DelphiError, ParameterLocation};
///
/// let err = DelphiError::malformed_parameter(
///     ParameterLocation::Query,
///     "color",
///     "expected key/value pairs",
/// );
/// assert!(!err.is_document_error());
/// assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
/// ```
#[derive(Error, Debug)]
pub enum DelphiError {
    /// The API description is inconsistent.
    #[error("Invalid API document: {message}")]
    InvalidDocument {
        /// Human-readable error message.
        message: String,
        /// JSON pointer to the offending node, when known.
        pointer: Option<String>,
    },

    /// The API description declares a version this crate cannot resolve.
    #[error("Unsupported API description version '{version}'")]
    UnsupportedVersion {
        /// The declared version string.
        version: String,
    },

    /// A path or server template could not be compiled.
    #[error("Invalid template '{template}': {message}")]
    InvalidTemplate {
        /// The template text.
        template: String,
        /// Human-readable error message.
        message: String,
    },

    /// A parameter value cannot be split according to its declared style.
    #[error("Malformed {location} parameter '{name}': {reason}")]
    MalformedParameter {
        /// Where the parameter is read from.
        location: ParameterLocation,
        /// The parameter name.
        name: String,
        /// Why the value could not be interpreted.
        reason: String,
    },

    /// No controller is registered for an operation and missing
    /// controllers are not allowed.
    #[error("No controller registered for operation '{operation_id}'{}", controller_suffix(.controller))]
    MissingController {
        /// The controller name, when the operation names one.
        controller: Option<String>,
        /// The operation id.
        operation_id: String,
    },

    /// Reading the API description failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The API description is not valid JSON or does not fit the model.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn controller_suffix(controller: &Option<String>) -> String {
    controller
        .as_ref()
        .map(|c| format!(" in '{c}'"))
        .unwrap_or_default()
}

impl DelphiError {
    /// Creates an invalid document error.
    #[must_use]
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
            pointer: None,
        }
    }

    /// Creates an invalid document error anchored at a JSON pointer.
    #[must_use]
    pub fn invalid_document_at(message: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
            pointer: Some(pointer.into()),
        }
    }

    /// Creates an invalid template error.
    #[must_use]
    pub fn invalid_template(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Creates a malformed parameter error.
    #[must_use]
    pub fn malformed_parameter(
        location: ParameterLocation,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedParameter {
            location,
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the error points at the API description rather than
    /// the request.
    #[must_use]
    pub const fn is_document_error(&self) -> bool {
        !matches!(self, Self::MalformedParameter { .. })
    }

    /// Returns the HTTP status code a transport should answer with.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedParameter { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_document_display() {
        let err = DelphiError::invalid_document_at("duplicate parameter", "/paths/~1pets");
        assert_eq!(err.to_string(), "Invalid API document: duplicate parameter");
        assert!(err.is_document_error());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_malformed_parameter_display() {
        let err = DelphiError::malformed_parameter(ParameterLocation::Path, "color", "odd number of components");
        assert_eq!(
            err.to_string(),
            "Malformed path parameter 'color': odd number of components"
        );
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_missing_controller_display() {
        let err = DelphiError::MissingController {
            controller: Some("pets".to_string()),
            operation_id: "listPets".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No controller registered for operation 'listPets' in 'pets'"
        );

        let err = DelphiError::MissingController {
            controller: None,
            operation_id: "listPets".to_string(),
        };
        assert_eq!(err.to_string(), "No controller registered for operation 'listPets'");
    }

    #[test]
    fn test_json_error_conversion() {
        let err: DelphiError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, DelphiError::Json(_)));
    }
}

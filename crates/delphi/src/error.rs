//! Facade error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading a [`DelphiConfig`](crate::DelphiConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    ReadError {
        /// Path being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parse error.
    #[error("invalid TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON parse or conversion error.
    #[error("invalid JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Unsupported file format.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// A field holds an invalid value.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Dotted field path.
        field: String,
        /// What was wrong.
        reason: String,
    },

    /// An environment variable could not be applied.
    #[error("failed to apply environment variable '{var}': {reason}")]
    EnvParseError {
        /// Variable name.
        var: String,
        /// What was wrong.
        reason: String,
    },

    /// Final validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

impl ConfigError {
    /// Creates a file-not-found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates a read error.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid-value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an environment variable error.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}

/// Errors from [`init_logging`](crate::logging::init_logging).
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Filter directives did not parse.
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),

    /// The global subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    Init(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            ConfigError::file_not_found("/etc/delphi.toml").to_string(),
            "configuration file not found: /etc/delphi.toml"
        );
        assert_eq!(
            ConfigError::invalid_value("logging.level", "unknown level 'loud'").to_string(),
            "invalid value for 'logging.level': unknown level 'loud'"
        );
        assert_eq!(
            ConfigError::env_parse_error("DELPHI__RESOLVER__ALL_ERRORS", "expected a boolean").to_string(),
            "failed to apply environment variable 'DELPHI__RESOLVER__ALL_ERRORS': expected a boolean"
        );
        assert_eq!(
            LoggingError::Init("already set".to_string()).to_string(),
            "failed to initialize logging: already set"
        );
    }
}

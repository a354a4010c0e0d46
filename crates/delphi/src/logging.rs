//! Structured logging for Delphi.
//!
//! Every Delphi crate logs through `tracing`: construction summaries at
//! `info`, skipped declarations at `warn`, per-request stage transitions at
//! `debug`. This module installs a `tracing-subscriber` pipeline for binaries
//! and tests that do not bring their own.
//!
//! # Example
//!
//! ```rust,no_run
//! use delphi::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development()).unwrap();
//! tracing::info!(operation_id = "getPet", "resolved");
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::LoggingError;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Whether logging is installed at all.
    pub enabled: bool,

    /// Default level (e.g. `info`, `debug`).
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json_format: bool,

    /// Include the target (module path).
    pub include_target: bool,

    /// Include file and line.
    pub include_location: bool,

    /// Log span creation and close events.
    pub span_events: bool,

    /// Explicit filter directives (e.g. `delphi_oas3=debug,warn`). When
    /// unset, `RUST_LOG` is honoured before falling back to `level`.
    pub filter_directives: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            include_target: true,
            include_location: false,
            span_events: false,
            filter_directives: None,
        }
    }
}

impl LogConfig {
    /// Human-readable output at `debug`, with locations and span events.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            include_target: true,
            include_location: true,
            span_events: true,
            filter_directives: None,
        }
    }

    /// JSON output at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Disables logging.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`LoggingError::InvalidFilter`] for bad directives and
/// [`LoggingError::Init`] if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(config)?;
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = if config.json_format {
        tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_target(config.include_target)
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .pretty()
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_target(config.include_target)
            .with_filter(filter)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}

/// Builds the filter: explicit directives, else `RUST_LOG`, else `level`.
///
/// # Errors
///
/// Returns [`LoggingError::InvalidFilter`] if the directives do not parse.
pub fn create_env_filter(config: &LogConfig) -> Result<EnvFilter, LoggingError> {
    if let Some(directives) = &config.filter_directives {
        return EnvFilter::try_new(directives).map_err(|e| LoggingError::InvalidFilter(e.to_string()));
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| LoggingError::InvalidFilter(e.to_string()))
}

/// Field names used in Delphi's structured logs.
pub mod fields {
    /// HTTP method.
    pub const METHOD: &str = "method";

    /// Request URL as received.
    pub const URL: &str = "url";

    /// Server-relative request path.
    pub const PATH: &str = "path";

    /// Matched path template.
    pub const TEMPLATE: &str = "template";

    /// Resolved operation id.
    pub const OPERATION_ID: &str = "operation_id";

    /// Index of the matched server.
    pub const SERVER: &str = "server";

    /// Stage at which resolution stopped.
    pub const STAGE: &str = "stage";

    /// JSON pointer into the API document.
    pub const POINTER: &str = "pointer";
}

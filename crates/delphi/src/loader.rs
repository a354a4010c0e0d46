//! Layered configuration loading.
//!
//! Layers are applied in call order, later layers overriding earlier ones:
//!
//! 1. Built-in defaults or a preset
//! 2. Configuration files (TOML or JSON, chosen by extension)
//! 3. Inline strings
//! 4. Environment variables (`PREFIX__SECTION__KEY`), applied by [`ConfigLoader::load`]
//!
//! File and string layers are merged key by key, so a file that only sets
//! `[logging] level` keeps every other default.

use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::config::DelphiConfig;
use crate::error::{ConfigError, ConfigResult};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "DELPHI";

/// Builds a [`DelphiConfig`] from defaults, files and the environment.
///
/// # Example
///
/// ```no_run
/// use delphi::ConfigLoader;
///
/// # fn main() -> Result<(), delphi::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_production()
///     .with_optional_file("delphi.toml")?
///     .with_dotenv()
///     .with_env_prefix("DELPHI")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: DelphiConfig,
    env_prefix: Option<String>,
    files_loaded: usize,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader seeded with [`DelphiConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: DelphiConfig::default(),
            env_prefix: None,
            files_loaded: 0,
        }
    }

    /// Resets to the built-in defaults.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = DelphiConfig::default();
        self
    }

    /// Resets to [`DelphiConfig::development`].
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = DelphiConfig::development();
        self
    }

    /// Resets to [`DelphiConfig::production`].
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = DelphiConfig::production();
        self
    }

    /// Merges a TOML or JSON file.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, unreadable, has an unknown extension,
    /// does not parse, or contains unknown sections.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        let layer = parse_layer(&content, &format)?;
        self.merge_layer(layer)?;
        self.files_loaded += 1;
        debug!(path = %path.display(), "merged configuration file");

        Ok(self)
    }

    /// Merges a file if it exists.
    ///
    /// # Errors
    ///
    /// Same as [`with_file`](Self::with_file) once the file exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> ConfigResult<Self> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Merges configuration given inline; `format` is `toml` or `json`.
    ///
    /// # Errors
    ///
    /// Fails on an unknown format, a parse error or unknown sections.
    ///
    /// # Example
    ///
    /// ```
    /// use delphi::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[resolver]\nignore_servers = true", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(config.resolver.ignore_servers);
    /// assert_eq!(config.logging.level, "info");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> ConfigResult<Self> {
        let layer = parse_layer(content, &format.to_lowercase())?;
        self.merge_layer(layer)?;
        Ok(self)
    }

    /// Enables environment overrides under `prefix`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads `.env` into the process environment if one is present.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        self
    }

    /// Number of files merged so far.
    pub fn files_loaded(&self) -> usize {
        self.files_loaded
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Fails if an environment value does not parse or validation fails.
    pub fn load(mut self) -> ConfigResult<DelphiConfig> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> DelphiConfig {
        self.config
    }

    fn merge_layer(&mut self, layer: Value) -> ConfigResult<()> {
        let mut base = serde_json::to_value(&self.config)?;
        merge_values(&mut base, layer);
        self.config = serde_json::from_value(base)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> ConfigResult<()> {
        let marker = format!("{prefix}__");
        let mut vars: Vec<(String, String)> = env::vars().filter(|(k, _)| k.starts_with(&marker)).collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> ConfigResult<()> {
        let rest = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;
        let parts: Vec<&str> = rest.split("__").collect();

        let resolver = &mut self.config.resolver;
        let logging = &mut self.config.logging;
        match parts.as_slice() {
            ["RESOLVER", "IGNORE_SERVERS"] => resolver.ignore_servers = bool_var(key, value)?,
            ["RESOLVER", "ALLOW_MISSING_CONTROLLERS"] => resolver.allow_missing_controllers = bool_var(key, value)?,
            ["RESOLVER", "ALL_ERRORS"] => resolver.all_errors = bool_var(key, value)?,
            ["RESOLVER", "EXTENSION_PREFIX"] => resolver.extension_prefix = value.to_string(),

            ["LOGGING", "ENABLED"] => logging.enabled = bool_var(key, value)?,
            ["LOGGING", "LEVEL"] => logging.level = value.to_string(),
            ["LOGGING", "JSON_FORMAT"] => logging.json_format = bool_var(key, value)?,
            ["LOGGING", "INCLUDE_TARGET"] => logging.include_target = bool_var(key, value)?,
            ["LOGGING", "INCLUDE_LOCATION"] => logging.include_location = bool_var(key, value)?,
            ["LOGGING", "SPAN_EVENTS"] => logging.span_events = bool_var(key, value)?,
            ["LOGGING", "FILTER_DIRECTIVES"] => {
                logging.filter_directives = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }

            _ => {
                debug!(var = key, "ignoring unknown configuration variable");
            }
        }

        Ok(())
    }
}

fn parse_layer(content: &str, format: &str) -> ConfigResult<Value> {
    match format {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Recursively overlays `layer` onto `base`; non-object values replace.
fn merge_values(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

fn bool_var(key: &str, value: &str) -> ConfigResult<bool> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

//! Top-level configuration.

use delphi_oas3::ResolverConfig;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::{ConfigError, ConfigResult};
use crate::logging::LogConfig;

/// Complete Delphi configuration.
///
/// Usually built with [`ConfigLoader`](crate::ConfigLoader):
///
/// ```toml
/// [resolver]
/// ignore_servers = true
/// extension_prefix = "x-acme"
///
/// [logging]
/// level = "debug"
/// json_format = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DelphiConfig {
    /// Resolver behaviour.
    pub resolver: ResolverConfig,
    /// Subscriber setup.
    pub logging: LogConfig,
}

impl DelphiConfig {
    /// Development preset: human-readable debug logs, servers ignored.
    #[must_use]
    pub fn development() -> Self {
        Self {
            resolver: ResolverConfig::permissive(),
            logging: LogConfig::development(),
        }
    }

    /// Production preset: JSON logs, strict resolver.
    #[must_use]
    pub fn production() -> Self {
        Self {
            resolver: ResolverConfig::strict(),
            logging: LogConfig::production(),
        }
    }

    /// Checks values serde cannot check.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unparseable log level or
    /// filter, or an extension prefix that does not start with `x-`.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.resolver.extension_prefix.starts_with("x-") || self.resolver.extension_prefix.len() < 3 {
            return Err(ConfigError::invalid_value(
                "resolver.extension_prefix",
                format!("'{}' must start with 'x-'", self.resolver.extension_prefix),
            ));
        }

        if self.logging.enabled {
            EnvFilter::try_new(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
            if let Some(directives) = &self.logging.filter_directives {
                EnvFilter::try_new(directives)
                    .map_err(|e| ConfigError::invalid_value("logging.filter_directives", e.to_string()))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(DelphiConfig::default().validate().is_ok());
        assert!(DelphiConfig::development().validate().is_ok());
        assert!(DelphiConfig::production().validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let config = DelphiConfig::development();
        assert!(config.resolver.ignore_servers);
        assert_eq!(config.logging.level, "debug");

        let config = DelphiConfig::production();
        assert!(!config.resolver.allow_missing_controllers);
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_bad_extension_prefix() {
        let mut config = DelphiConfig::default();
        config.resolver.extension_prefix = "acme".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "resolver.extension_prefix"));
    }

    #[test]
    fn test_bad_level() {
        let mut config = DelphiConfig::default();
        config.logging.level = "delphi=loud".to_string();
        assert!(config.validate().is_err());

        config.logging.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result: Result<DelphiConfig, _> = serde_json::from_str(r#"{"server": {}}"#);
        assert!(result.is_err());
    }
}

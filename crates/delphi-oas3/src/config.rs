//! Resolver configuration.

use serde::{Deserialize, Serialize};

/// Default prefix of Delphi vendor extensions.
pub const DEFAULT_EXTENSION_PREFIX: &str = "x-delphi";

/// Configuration for building an [`Oas3Api`](crate::Oas3Api).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Skip server matching and route on the whole request path.
    pub ignore_servers: bool,
    /// Accept operations with no registered controller.
    pub allow_missing_controllers: bool,
    /// Report every schema violation of a value instead of the first.
    pub all_errors: bool,
    /// Prefix of the controller and operation id extensions.
    pub extension_prefix: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ignore_servers: false,
            allow_missing_controllers: true,
            all_errors: false,
            extension_prefix: DEFAULT_EXTENSION_PREFIX.to_string(),
        }
    }
}

impl ResolverConfig {
    /// Every operation needs a controller and every violation is reported.
    pub fn strict() -> Self {
        Self {
            allow_missing_controllers: false,
            all_errors: true,
            ..Self::default()
        }
    }

    /// Servers are ignored and controllers are optional.
    pub fn permissive() -> Self {
        Self {
            ignore_servers: true,
            allow_missing_controllers: true,
            ..Self::default()
        }
    }

    /// Sets the extension prefix.
    pub fn with_extension_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.extension_prefix = prefix.into();
        self
    }

    /// Name of the controller extension, e.g. `x-delphi-controller`.
    pub fn controller_extension(&self) -> String {
        format!("{}-controller", self.extension_prefix)
    }

    /// Name of the operation id extension, e.g. `x-delphi-operationId`.
    pub fn operation_id_extension(&self) -> String {
        format!("{}-operationId", self.extension_prefix)
    }
}

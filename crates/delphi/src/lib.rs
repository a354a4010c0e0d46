//! # Delphi
//!
//! **OpenAPI request resolution and validation**
//!
//! Delphi answers one question for an incoming HTTP request: which operation
//! of an OpenAPI document does it address, with which parameters and body?
//!
//! - **Routing** against server URLs and path templates, with 404 and 405
//!   distinguished
//! - **Parameter deserialization** for every `style`/`explode` combination
//! - **Aggregated validation** with JSON pointers into the document
//! - **Body negotiation** by media type specificity
//! - **Controller binding** through vendor extensions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use delphi::prelude::*;
//! use http::HeaderMap;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("delphi.toml")?
//!         .with_env_prefix("DELPHI")
//!         .load()?;
//!     init_logging(&config.logging)?;
//!
//!     let api = delphi::load_api("openapi.yaml", &config).await?;
//!     match api.resolve("GET", "/v1/pets/42", &HeaderMap::new()) {
//!         Resolution::Resolved(resolved) => {
//!             let parsed = resolved.parse_parameters()?;
//!             println!("{} {:?}", resolved.operation_id(), parsed.path);
//!         }
//!         miss => println!("{:?}", miss.miss_status()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Crates
//!
//! ```text
//! delphi-core    contract: Resolution, errors, validation, bodies, controllers
//! delphi-router  path templates and the radix router
//! delphi-oas3    OpenAPI 3 resolver (Oas3Api)
//! delphi         this facade: configuration, logging, document loading
//! ```

#![doc(html_root_url = "https://docs.rs/delphi/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::path::Path;

use tracing::info;

pub mod config;
pub mod error;
pub mod loader;
pub mod logging;

pub use config::DelphiConfig;
pub use error::{ConfigError, ConfigResult, LoggingError};
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};

// Re-export the contract
pub use delphi_core as core;

// Re-export the router
pub use delphi_router as router;

// Re-export the OpenAPI 3 resolver
pub use delphi_oas3 as oas3;

use delphi_core::{ControllerRegistry, DelphiResult};
use delphi_oas3::{ApiDocument, Oas3Api};

/// Loads an API document (JSON or YAML) and builds a resolver for it.
///
/// # Errors
///
/// Fails if the file cannot be read, the document is invalid, or the
/// resolver cannot be compiled under `config.resolver`.
pub async fn load_api(path: impl AsRef<Path>, config: &DelphiConfig) -> DelphiResult<Oas3Api> {
    load_api_with_controllers(path, config, ControllerRegistry::new()).await
}

/// Like [`load_api`], binding operations to `controllers`.
///
/// # Errors
///
/// See [`load_api`]; with `allow_missing_controllers` off, an unbound
/// operation is also an error.
pub async fn load_api_with_controllers(
    path: impl AsRef<Path>,
    config: &DelphiConfig,
    controllers: ControllerRegistry,
) -> DelphiResult<Oas3Api> {
    let path = path.as_ref();
    let document = ApiDocument::from_file(path).await?;
    let api = Oas3Api::builder(document)
        .config(config.resolver.clone())
        .controllers(controllers)
        .build()?;
    info!(path = %path.display(), operations = api.operation_count(), "API loaded");
    Ok(api)
}

/// Prelude module for convenient imports.
///
/// ```rust
/// use delphi::prelude::*;
/// ```
pub mod prelude {
    pub use delphi_core::{
        ApiInterface, Controller, ControllerRegistry, DelphiError, DelphiResult, MethodNotAllowed,
        ParameterLocation, ParsedParameters, Resolution, ResolvedBody, ResolvedPath, ValidationError,
    };

    pub use delphi_oas3::{ApiDocument, Oas3Api, Oas3Context, ResolverConfig};

    pub use crate::logging::{init_logging, LogConfig};
    pub use crate::{load_api, load_api_with_controllers, ConfigLoader, DelphiConfig};
}

//! # Delphi Core
//!
//! The description-independent contract of the Delphi request resolver.
//!
//! This crate defines what every API description family implements and what
//! every caller consumes:
//!
//! - [`ApiInterface`] - Resolves `(method, url, headers)` to a [`Resolution`]
//! - [`ResolvedPath`] - Per-request result with lazy parameter and body handling
//! - [`ParametersByLocation`] - Values grouped by query/header/server/path/cookie
//! - [`ValidationError`] - One violated constraint, with its location
//! - [`ValidatorFunction`] / [`ValidatorFactory`] - Schema validation capability
//! - [`BodyParser`] / [`BodyParserRegistry`] - Body decoding capability
//! - [`ControllerRegistry`] - Opaque controller references
//! - [`DelphiError`] - Errors for inconsistent descriptions and uninterpretable input

#![doc(html_root_url = "https://docs.rs/delphi-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod body;
mod controller;
mod error;
mod location;
pub mod media_type;
pub mod pointer;
mod resolution;
mod validation;

pub use body::{BodyParseError, BodyParser, BodyParserRegistry, FormBodyParser, JsonBodyParser, TextBodyParser};
pub use controller::{Controller, ControllerRegistry};
pub use error::{DelphiError, DelphiResult};
pub use location::{ParameterLocation, ParametersByLocation, ParametersMap, ParsedParameters};
pub use media_type::{MediaTypeMap, Specificity};
pub use resolution::{ApiInterface, MethodNotAllowed, ParameterParser, Resolution, ResolvedBody, ResolvedPath};
pub use validation::{
    into_errors, ErrorLocation, ErrorSource, ValidationError, ValidationTarget, ValidatorFactory,
    ValidatorFunction,
};

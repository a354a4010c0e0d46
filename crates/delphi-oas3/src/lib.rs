//! # Delphi OAS3
//!
//! OpenAPI 3.x request resolution for Delphi.
//!
//! An [`ApiDocument`] is compiled once into an [`Oas3Api`]; every request is
//! then resolved against the compiled indexes without touching the document
//! again.
//!
//! - [`ServerMatcher`] - Base server selection and server variables
//! - [`OperationLocator`] - Path template and method lookup
//! - [`ParameterExtractor`] - Style-aware parameter deserialization
//! - [`ParameterValidator`] - Aggregated parameter validation
//! - [`RequestBodyResolver`] - Media type negotiation for request bodies
//! - [`ControllerResolver`] - Operation to controller binding
//! - [`SchemaValidatorFactory`] - The default JSON Schema validator
//!
//! # Example
//!
//! ```rust
//! use delphi_core::ApiInterface;
//! use delphi_oas3::{ApiDocument, Oas3Api, ResolverConfig};
//! use http::HeaderMap;
//!
//! let document = ApiDocument::from_yaml(r#"
//! openapi: 3.0.3
//! info: { title: Users, version: "1.0" }
//! paths:
//!   /users/{id}:
//!     get:
//!       operationId: getUser
//!       parameters:
//!         - { name: id, in: path, required: true, schema: { type: integer } }
//!         - { name: fields, in: query, schema: { type: array, items: { type: string } } }
//! "#).unwrap();
//!
//! let api = Oas3Api::new(document, ResolverConfig::default()).unwrap();
//! let resolved = api
//!     .resolve("GET", "/users/7?fields=name&fields=email", &HeaderMap::new())
//!     .into_resolved()
//!     .unwrap();
//!
//! let parsed = resolved.parse_parameters().unwrap();
//! assert_eq!(parsed.path["id"], 7);
//! assert_eq!(parsed.query["fields"], serde_json::json!(["name", "email"]));
//! assert!(resolved.validate_parameters(&parsed).is_none());
//! ```

#![doc(html_root_url = "https://docs.rs/delphi-oas3/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod body;
mod config;
mod context;
pub mod controllers;
pub mod document;
pub mod fixtures;
mod operation;
pub mod parameters;
mod resolver;
pub mod schema;
mod servers;
mod validation;

pub use body::{NegotiatedBody, RequestBodyResolver};
pub use config::{ResolverConfig, DEFAULT_EXTENSION_PREFIX};
pub use context::Oas3Context;
pub use controllers::{ControllerResolver, ControllerSelection};
pub use document::ApiDocument;
pub use operation::{CompiledOperation, Located, OperationInfo, OperationLocator};
pub use parameters::{ParameterDeclaration, ParameterExtractor, RequestSources};
pub use resolver::{Oas3Api, Oas3ApiBuilder};
pub use schema::{SchemaValidator, SchemaValidatorFactory};
pub use servers::{MatchedServer, ServerMatcher};
pub use validation::ParameterValidator;

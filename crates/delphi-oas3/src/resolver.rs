//! The OpenAPI 3 request resolver.
//!
//! [`Oas3Api`] owns every compiled index and implements
//! [`ApiInterface`]. A call to `resolve` walks four stages:
//!
//! ```text
//!   (method, url, headers)
//!            │
//!   ┌────────▼────────┐  no match
//!   │  ServerMatcher  │──────────► NotFound
//!   └────────┬────────┘
//!            │ server-relative path
//!   ┌────────▼────────┐  no template / no method
//!   │ OperationLocator│──────────► NotFound / MethodNotAllowed
//!   └────────┬────────┘
//!            │ compiled operation + raw path values
//!   ┌────────▼────────┐
//!   │  ResolvedPath   │  lazy parameters, negotiated body, controller
//!   └─────────────────┘
//! ```
//!
//! Nothing is parsed or validated during resolution.

use std::fmt;
use std::sync::Arc;

use delphi_core::{
    ApiInterface, BodyParserRegistry, ControllerRegistry, DelphiResult, MethodNotAllowed, Resolution,
    ResolvedPath, ValidatorFactory,
};
use http::header::{CONTENT_TYPE, HOST};
use http::{HeaderMap, Method};
use tracing::{debug, info};
use url::Url;

use crate::config::ResolverConfig;
use crate::context::Oas3Context;
use crate::document::ApiDocument;
use crate::operation::{CompiledOperation, Located, OperationLocator};
use crate::parameters::{ParameterExtractor, RequestSources};
use crate::schema::SchemaValidatorFactory;
use crate::servers::{MatchedServer, ServerMatcher};

/// An OpenAPI 3 document compiled for request resolution.
///
/// Build once and share; `resolve` takes `&self` and never blocks.
///
/// # Example
///
/// ```rust
/// use delphi_core::{ApiInterface, Resolution};
/// use delphi_oas3::{fixtures, Oas3Api, ResolverConfig};
/// use http::HeaderMap;
///
/// let api = Oas3Api::new(fixtures::pet_store().unwrap(), ResolverConfig::default()).unwrap();
///
/// let resolved = api
///     .resolve("get", "https://petstore.example.com/v1/pets/42", &HeaderMap::new())
///     .into_resolved()
///     .unwrap();
/// assert_eq!(resolved.operation_id(), "getPet");
///
/// let parsed = resolved.parse_parameters().unwrap();
/// assert_eq!(parsed.path["petId"], 42);
///
/// assert!(matches!(
///     api.resolve("PUT", "/v1/pets", &HeaderMap::new()),
///     Resolution::MethodNotAllowed(_)
/// ));
/// ```
pub struct Oas3Api {
    document: Arc<ApiDocument>,
    config: ResolverConfig,
    servers: ServerMatcher,
    locator: OperationLocator,
    body_parsers: BodyParserRegistry,
}

/// Builder for [`Oas3Api`].
pub struct Oas3ApiBuilder {
    document: Arc<ApiDocument>,
    config: ResolverConfig,
    controllers: ControllerRegistry,
    validator_factory: Option<Box<dyn ValidatorFactory>>,
    body_parsers: BodyParserRegistry,
}

impl Oas3ApiBuilder {
    /// Sets the resolver configuration.
    #[must_use]
    pub fn config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the controllers operations are bound to.
    #[must_use]
    pub fn controllers(mut self, controllers: ControllerRegistry) -> Self {
        self.controllers = controllers;
        self
    }

    /// Replaces the default schema validator.
    #[must_use]
    pub fn validator_factory(mut self, factory: impl ValidatorFactory + 'static) -> Self {
        self.validator_factory = Some(Box::new(factory));
        self
    }

    /// Replaces the default body parsers.
    #[must_use]
    pub fn body_parsers(mut self, parsers: BodyParserRegistry) -> Self {
        self.body_parsers = parsers;
        self
    }

    /// Compiles the document.
    ///
    /// # Errors
    ///
    /// Fails on any inconsistency in the document: invalid server or path
    /// templates, unresolvable references, disallowed parameter styles,
    /// duplicate parameters, invalid schemas, or missing controllers when
    /// those are not allowed.
    pub fn build(self) -> DelphiResult<Oas3Api> {
        let default_factory = SchemaValidatorFactory::new(self.config.all_errors);
        let factory: &dyn ValidatorFactory = match &self.validator_factory {
            Some(factory) => factory.as_ref(),
            None => &default_factory,
        };

        let servers = ServerMatcher::compile(&self.document, &self.config, factory)?;
        let locator = OperationLocator::compile(&self.document, &self.config, &self.controllers, factory)?;

        info!(
            title = %self.document.model().info.title,
            version = self.document.version(),
            servers = servers.len(),
            paths = locator.template_count(),
            operations = locator.len(),
            "API resolver built"
        );

        Ok(Oas3Api {
            document: self.document,
            config: self.config,
            servers,
            locator,
            body_parsers: self.body_parsers,
        })
    }
}

impl Oas3Api {
    /// Starts building a resolver for `document`.
    pub fn builder(document: impl Into<Arc<ApiDocument>>) -> Oas3ApiBuilder {
        Oas3ApiBuilder {
            document: document.into(),
            config: ResolverConfig::default(),
            controllers: ControllerRegistry::new(),
            validator_factory: None,
            body_parsers: BodyParserRegistry::default(),
        }
    }

    /// Builds a resolver with default collaborators.
    ///
    /// # Errors
    ///
    /// See [`Oas3ApiBuilder::build`].
    pub fn new(document: impl Into<Arc<ApiDocument>>, config: ResolverConfig) -> DelphiResult<Self> {
        Self::builder(document).config(config).build()
    }

    /// The compiled document.
    #[must_use]
    pub fn document(&self) -> &Arc<ApiDocument> {
        &self.document
    }

    /// The configuration the resolver was built with.
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Compiled operations, in document order.
    pub fn operations(&self) -> impl Iterator<Item = &CompiledOperation> {
        self.locator.operations()
    }

    /// Number of compiled operations.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.locator.len()
    }

    fn build_resolved(
        &self,
        server: MatchedServer,
        operation: &CompiledOperation,
        params: delphi_router::Params,
        query: Option<&str>,
        headers: &HeaderMap,
    ) -> ResolvedPath<Oas3Context> {
        let sources = RequestSources::new(query, headers.clone(), params, server.params.clone());
        let extractor = ParameterExtractor::new(
            Arc::clone(&server.parameters),
            Arc::clone(&operation.parameters),
            sources,
        );

        let content_type = headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok());
        let negotiated = operation
            .body
            .as_ref()
            .map(|body| body.negotiate(content_type, &self.body_parsers));

        let context = Oas3Context::new(
            Arc::clone(&self.document),
            Arc::clone(&operation.info),
            server.index,
            negotiated.as_ref().and_then(|n| n.media_type_pointer.clone()),
        );

        let resolved = ResolvedPath::new(operation.controller.operation_id.clone(), Box::new(extractor), context)
            .with_controller(
                operation.controller.controller_name.clone(),
                operation.controller.controller.clone(),
            )
            .with_server_params(server.params);

        match negotiated {
            Some(negotiated) => resolved.with_body(negotiated.body),
            None => resolved,
        }
    }
}

impl ApiInterface for Oas3Api {
    type Context = Oas3Context;

    fn resolve(&self, method: &str, url: &str, headers: &HeaderMap) -> Resolution<Oas3Context> {
        let target = RequestTarget::parse(url, headers);

        let Some(server) = self.servers.match_request(target.host.as_deref(), &target.path) else {
            debug!(url, stage = "server", "no server matched");
            return Resolution::NotFound;
        };
        debug!(server = ?server.index, path = %server.path, "server matched");

        // CONNECT is never declared, so an unparseable method still reports
        // the path's allowed methods.
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes()).unwrap_or(Method::CONNECT);

        match self.locator.locate(&method, &server.path) {
            Located::NotFound => {
                debug!(path = %server.path, stage = "path", "no path template matched");
                Resolution::NotFound
            }
            Located::MethodNotAllowed { template, allowed } => {
                debug!(method = %method, template, stage = "method", "method not allowed");
                Resolution::MethodNotAllowed(MethodNotAllowed {
                    path_template: template.to_string(),
                    allowed,
                })
            }
            Located::Found { operation, params } => {
                debug!(
                    method = %method,
                    template = %operation.info.path_template,
                    operation_id = %operation.controller.operation_id,
                    "operation resolved"
                );
                let resolved = self.build_resolved(server, operation, params, target.query.as_deref(), headers);
                Resolution::Resolved(Box::new(resolved))
            }
        }
    }
}

impl fmt::Debug for Oas3Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Oas3Api")
            .field("version", &self.document.version())
            .field("config", &self.config)
            .field("servers", &self.servers)
            .field("locator", &self.locator)
            .field("body_parsers", &self.body_parsers)
            .finish()
    }
}

/// The parts of a request URL resolution needs.
#[derive(Debug, PartialEq, Eq)]
struct RequestTarget {
    host: Option<String>,
    path: String,
    query: Option<String>,
}

impl RequestTarget {
    /// Splits an absolute URL or an origin-form target. The host falls back
    /// to the `Host` header. Both forms go through the same URL parser, so
    /// dot segments are removed and unsafe characters escaped either way.
    fn parse(url: &str, headers: &HeaderMap) -> Self {
        let header_host = || {
            headers
                .get(HOST)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        if url.contains("://") {
            if let Ok(parsed) = Url::parse(url) {
                let host = parsed.host_str().map(|host| match parsed.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_string(),
                });
                return Self {
                    host: host.or_else(header_host),
                    path: non_empty_path(parsed.path()),
                    query: parsed.query().map(str::to_string),
                };
            }
        }

        let separator = if url.starts_with('/') { "" } else { "/" };
        if let Ok(parsed) = Url::parse(&format!("{ORIGIN_PLACEHOLDER}{separator}{url}")) {
            return Self {
                host: header_host(),
                path: non_empty_path(parsed.path()),
                query: parsed.query().map(str::to_string),
            };
        }

        let without_fragment = url.split_once('#').map_or(url, |(before, _)| before);
        let (path, query) = match without_fragment.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (without_fragment, None),
        };
        Self {
            host: header_host(),
            path: non_empty_path(path),
            query,
        }
    }
}

/// Stands in for the authority when parsing origin-form targets.
const ORIGIN_PLACEHOLDER: &str = "http://origin.invalid";

fn non_empty_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(*name, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn test_request_target_absolute() {
        let target = RequestTarget::parse("https://api.example.com:8443/v1/pets?limit=5#top", &HeaderMap::new());
        assert_eq!(
            target,
            RequestTarget {
                host: Some("api.example.com:8443".to_string()),
                path: "/v1/pets".to_string(),
                query: Some("limit=5".to_string()),
            }
        );
    }

    #[test]
    fn test_request_target_origin_form() {
        let target = RequestTarget::parse("/v1/pets?tag=a&tag=b#x", &headers(&[("host", "petstore.example.com")]));
        assert_eq!(target.host.as_deref(), Some("petstore.example.com"));
        assert_eq!(target.path, "/v1/pets");
        assert_eq!(target.query.as_deref(), Some("tag=a&tag=b"));

        let target = RequestTarget::parse("", &HeaderMap::new());
        assert_eq!(target.path, "/");
        assert_eq!(target.host, None);
        assert_eq!(target.query, None);
    }

    #[test]
    fn test_dot_segments_normalised_in_both_forms() {
        let origin = RequestTarget::parse("/v1/../v1/./pets?x=1", &HeaderMap::new());
        assert_eq!(origin.path, "/v1/pets");
        assert_eq!(origin.query.as_deref(), Some("x=1"));

        let absolute = RequestTarget::parse("http://localhost/v1/../v1/./pets?x=1", &HeaderMap::new());
        assert_eq!(absolute.path, origin.path);
        assert_eq!(absolute.query, origin.query);

        let api = Oas3Api::new(fixtures::pet_store().unwrap(), ResolverConfig::default()).unwrap();
        let resolved = api.resolve("GET", "/v1/admin/../pets", &HeaderMap::new()).into_resolved().unwrap();
        assert_eq!(resolved.operation_id(), "listPets");
    }

    #[test]
    fn test_method_is_case_insensitive() {
        let api = Oas3Api::new(fixtures::pet_store().unwrap(), ResolverConfig::default()).unwrap();
        let resolved = api.resolve("get", "/v1/pets", &HeaderMap::new()).into_resolved().unwrap();
        assert_eq!(resolved.operation_id(), "listPets");
        assert_eq!(resolved.openapi().method(), &Method::GET);
    }

    #[test]
    fn test_invalid_method_is_not_allowed() {
        let api = Oas3Api::new(fixtures::pet_store().unwrap(), ResolverConfig::default()).unwrap();
        match api.resolve("NOT A METHOD", "/v1/pets", &HeaderMap::new()) {
            Resolution::MethodNotAllowed(miss) => assert_eq!(miss.path_template, "/pets"),
            other => panic!("expected 405, got {other:?}"),
        }
    }

    #[test]
    fn test_builder_with_strict_config() {
        let err = Oas3Api::builder(fixtures::pet_store().unwrap())
            .config(ResolverConfig::strict())
            .build()
            .unwrap_err();
        assert!(err.is_document_error());
    }
}

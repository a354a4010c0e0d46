//! The resolution contract.
//!
//! [`ApiInterface`] is the one entry point callers use. Each API description
//! family supplies its own implementation and its own context type; callers
//! only ever see [`Resolution`] and [`ResolvedPath`].

use std::fmt;
use std::sync::Arc;

use http::{HeaderMap, Method, StatusCode};
use mime::Mime;
use serde_json::Value;

use crate::body::BodyParser;
use crate::controller::Controller;
use crate::error::DelphiResult;
use crate::location::{ParametersMap, ParsedParameters};
use crate::media_type;
use crate::validation::{into_errors, ErrorSource, ValidationError, ValidationTarget, ValidatorFunction};

/// Resolves raw requests against an API description.
pub trait ApiInterface: Send + Sync {
    /// Description-specific data attached to every resolved request.
    type Context: Send + Sync;

    /// Resolves a request.
    ///
    /// Routing misses are returned as [`Resolution::NotFound`] or
    /// [`Resolution::MethodNotAllowed`], never as errors. Nothing is parsed
    /// eagerly; the body is never touched.
    fn resolve(&self, method: &str, url: &str, headers: &HeaderMap) -> Resolution<Self::Context>;
}

/// Deferred parameter handling bound to one request.
pub trait ParameterParser: Send + Sync {
    /// Extracts and deserializes every declared parameter.
    ///
    /// Pure and repeatable.
    ///
    /// # Errors
    ///
    /// Returns [`DelphiError::MalformedParameter`](crate::DelphiError::MalformedParameter)
    /// when a value cannot be split according to its declared style.
    fn parse(&self) -> DelphiResult<ParsedParameters>;

    /// Validates previously parsed parameters; `None` means valid.
    fn validate(&self, parsed: &ParsedParameters) -> Option<Vec<ValidationError>>;
}

/// The path matched but the method is not declared on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodNotAllowed {
    /// The matched path template.
    pub path_template: String,
    /// Methods declared on the template.
    pub allowed: Vec<Method>,
}

impl MethodNotAllowed {
    /// Value for an `Allow` response header.
    #[must_use]
    pub fn allow_header(&self) -> String {
        self.allowed
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Outcome of [`ApiInterface::resolve`].
#[derive(Debug)]
pub enum Resolution<C> {
    /// An operation was found.
    Resolved(Box<ResolvedPath<C>>),
    /// The path exists, the method does not.
    MethodNotAllowed(MethodNotAllowed),
    /// No server or path matched.
    NotFound,
}

impl<C> Resolution<C> {
    /// Returns the resolved path, discarding miss details.
    #[must_use]
    pub fn into_resolved(self) -> Option<ResolvedPath<C>> {
        match self {
            Self::Resolved(resolved) => Some(*resolved),
            _ => None,
        }
    }

    /// Borrows the resolved path, if any.
    #[must_use]
    pub fn as_resolved(&self) -> Option<&ResolvedPath<C>> {
        match self {
            Self::Resolved(resolved) => Some(resolved),
            _ => None,
        }
    }

    /// Returns true if an operation was found.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Status code for a miss: 404 or 405. `None` when resolved.
    #[must_use]
    pub const fn miss_status(&self) -> Option<StatusCode> {
        match self {
            Self::Resolved(_) => None,
            Self::MethodNotAllowed(_) => Some(StatusCode::METHOD_NOT_ALLOWED),
            Self::NotFound => Some(StatusCode::NOT_FOUND),
        }
    }
}

/// Lazily evaluated request-body handling.
///
/// Holds the outcome of media-type negotiation. Parsing and validation run
/// only when called, and negotiation failures surface there as validation
/// errors.
#[derive(Clone)]
pub struct ResolvedBody {
    required: bool,
    content_type: Option<Mime>,
    media_type: Option<String>,
    parser: Option<Arc<dyn BodyParser>>,
    validator: Option<Arc<dyn ValidatorFunction>>,
    target: ValidationTarget,
}

impl ResolvedBody {
    /// Creates a body handle. `doc_path` points at the request body
    /// declaration.
    #[must_use]
    pub fn new(required: bool, content_type: Option<&str>, doc_path: impl Into<String>) -> Self {
        Self {
            required,
            content_type: content_type.and_then(media_type::parse),
            media_type: None,
            parser: None,
            validator: None,
            target: ValidationTarget::new(ErrorSource::Request, "body", doc_path),
        }
    }

    /// Records the negotiated media type and its schema validator.
    #[must_use]
    pub fn negotiated(
        mut self,
        media_type: impl Into<String>,
        validator: Option<Arc<dyn ValidatorFunction>>,
    ) -> Self {
        self.media_type = Some(media_type.into());
        self.validator = validator;
        self
    }

    /// Records the parser selected for the request's content type.
    #[must_use]
    pub fn with_parser(mut self, parser: Option<Arc<dyn BodyParser>>) -> Self {
        self.parser = parser;
        self
    }

    /// Returns true if the operation requires a body.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the negotiated declared media type.
    #[must_use]
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    /// Returns the request's parsed `Content-Type`.
    #[must_use]
    pub const fn content_type(&self) -> Option<&Mime> {
        self.content_type.as_ref()
    }

    /// Returns the parser capability, if one matched.
    #[must_use]
    pub fn parser(&self) -> Option<&Arc<dyn BodyParser>> {
        self.parser.as_ref()
    }

    /// Parses raw body bytes.
    ///
    /// An empty body yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns validation errors if negotiation failed, no parser handles the
    /// content type, or the bytes do not decode.
    pub fn parse(&self, body: &[u8]) -> Result<Option<Value>, Vec<ValidationError>> {
        if body.is_empty() {
            return Ok(None);
        }
        let content_type = match (&self.content_type, &self.media_type) {
            (Some(content_type), Some(_)) => content_type,
            _ => return Err(vec![self.unsupported()]),
        };
        let parser = self.parser.as_ref().ok_or_else(|| {
            vec![self.target.error(
                "",
                format!("No body parser available for content type '{content_type}'"),
            )]
        })?;
        parser
            .parse(content_type, body)
            .map(Some)
            .map_err(|e| vec![self.target.error("", format!("Could not parse request body: {e}"))])
    }

    /// Validates a parsed body; `None` means valid.
    #[must_use]
    pub fn validate(&self, body: Option<&Value>) -> Option<Vec<ValidationError>> {
        let Some(body) = body else {
            return self
                .required
                .then(|| vec![self.target.error("", "Missing required request body")]);
        };
        if self.media_type.is_none() {
            return Some(vec![self.unsupported()]);
        }
        self.validator
            .as_ref()
            .and_then(|validator| validator.validate(body))
            .and_then(into_errors)
    }

    fn unsupported(&self) -> ValidationError {
        let message = match &self.content_type {
            Some(content_type) => format!("Unsupported content type '{content_type}'"),
            None => "Missing or invalid Content-Type header".to_string(),
        };
        self.target.error("", message)
    }
}

impl fmt::Debug for ResolvedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedBody")
            .field("required", &self.required)
            .field("content_type", &self.content_type.as_ref().map(ToString::to_string))
            .field("media_type", &self.media_type)
            .field("has_parser", &self.parser.is_some())
            .field("has_validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

/// A request resolved to an operation.
///
/// Created fresh by every [`ApiInterface::resolve`] call and never cached.
pub struct ResolvedPath<C> {
    operation_id: String,
    controller_name: Option<String>,
    controller: Option<Controller>,
    server_params: Option<ParametersMap<String>>,
    parameters: Box<dyn ParameterParser>,
    body: Option<ResolvedBody>,
    context: C,
}

impl<C> ResolvedPath<C> {
    /// Creates a resolved path.
    #[must_use]
    pub fn new(
        operation_id: impl Into<String>,
        parameters: Box<dyn ParameterParser>,
        context: C,
    ) -> Self {
        Self {
            operation_id: operation_id.into(),
            controller_name: None,
            controller: None,
            server_params: None,
            parameters,
            body: None,
            context,
        }
    }

    /// Attaches the selected controller.
    #[must_use]
    pub fn with_controller(
        mut self,
        controller_name: Option<String>,
        controller: Option<Controller>,
    ) -> Self {
        self.controller_name = controller_name;
        self.controller = controller;
        self
    }

    /// Attaches raw server variables.
    #[must_use]
    pub fn with_server_params(mut self, server_params: ParametersMap<String>) -> Self {
        self.server_params = Some(server_params);
        self
    }

    /// Attaches body handling.
    #[must_use]
    pub fn with_body(mut self, body: ResolvedBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Raw server variables of the matched server.
    #[must_use]
    pub const fn server_params(&self) -> Option<&ParametersMap<String>> {
        self.server_params.as_ref()
    }

    /// Extracts and deserializes all declared parameters.
    ///
    /// # Errors
    ///
    /// See [`ParameterParser::parse`].
    pub fn parse_parameters(&self) -> DelphiResult<ParsedParameters> {
        self.parameters.parse()
    }

    /// Validates parsed parameters; `None` means valid.
    #[must_use]
    pub fn validate_parameters(&self, parsed: &ParsedParameters) -> Option<Vec<ValidationError>> {
        self.parameters.validate(parsed)
    }

    /// Body handling, absent when the operation declares no body.
    #[must_use]
    pub const fn body(&self) -> Option<&ResolvedBody> {
        self.body.as_ref()
    }

    /// Name of the controller the operation belongs to.
    #[must_use]
    pub fn controller_name(&self) -> Option<&str> {
        self.controller_name.as_deref()
    }

    /// The operation id used for controller lookup.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// The selected controller, if one is registered.
    #[must_use]
    pub const fn controller(&self) -> Option<&Controller> {
        self.controller.as_ref()
    }

    /// Description-specific context.
    #[must_use]
    pub const fn openapi(&self) -> &C {
        &self.context
    }
}

impl<C: fmt::Debug> fmt::Debug for ResolvedPath<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedPath")
            .field("operation_id", &self.operation_id)
            .field("controller_name", &self.controller_name)
            .field("has_controller", &self.controller.is_some())
            .field("server_params", &self.server_params)
            .field("body", &self.body)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

//! Operation compilation and lookup.
//!
//! Every operation in the document is compiled once: parameters are merged
//! and compiled, the request body is compiled and the controller is bound.
//! The [`OperationLocator`] then maps `(method, path)` onto those compiled
//! operations through a [`Router`].

use std::fmt;
use std::sync::Arc;

use delphi_core::{pointer, ControllerRegistry, DelphiError, DelphiResult, ParameterLocation, ValidatorFactory};
use delphi_router::{MethodRouter, Params, PathTemplate, RouteOutcome, Router};
use http::Method;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::body::RequestBodyResolver;
use crate::config::ResolverConfig;
use crate::controllers::{ControllerResolver, ControllerSelection};
use crate::document::{ApiDocument, Operation, Parameter, ParameterIn, PathItem, RefOr, SecurityRequirement};
use crate::parameters::ParameterDeclaration;

/// Header parameters that describe the HTTP exchange itself and are never
/// extracted.
const RESERVED_HEADERS: [&str; 3] = ["accept", "content-type", "authorization"];

/// Static facts about one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationInfo {
    /// The declared method.
    pub method: Method,
    /// The path template the operation is declared on.
    pub path_template: String,
    /// JSON pointer to the path item.
    pub path_pointer: String,
    /// JSON pointer to the operation.
    pub operation_pointer: String,
    /// Whether the operation is deprecated.
    pub deprecated: bool,
    /// Operation tags.
    pub tags: Vec<String>,
    /// Effective security requirements: the operation's, else the
    /// document's.
    pub security: Option<Vec<SecurityRequirement>>,
}

/// One operation, compiled.
#[derive(Clone)]
pub struct CompiledOperation {
    /// Static facts.
    pub info: Arc<OperationInfo>,
    /// Merged parameter declarations.
    pub parameters: Arc<[ParameterDeclaration]>,
    /// Request body, when declared.
    pub body: Option<RequestBodyResolver>,
    /// The bound controller.
    pub controller: ControllerSelection,
}

impl CompiledOperation {
    #[allow(clippy::too_many_arguments)]
    fn compile(
        document: &ApiDocument,
        template: &str,
        path_item: &PathItem,
        key: &str,
        method: &Method,
        operation: &Operation,
        controllers: &ControllerResolver<'_>,
        factory: &dyn ValidatorFactory,
    ) -> DelphiResult<Self> {
        let path_pointer = pointer::join("/paths", &[template]);
        let operation_pointer = pointer::join(&path_pointer, &[key]);

        let parameters = merge_parameters(
            document,
            [
                (&path_item.parameters, path_pointer.as_str()),
                (&operation.parameters, operation_pointer.as_str()),
            ],
            factory,
        )?;
        warn_undeclared_placeholders(template, &parameters);

        let body = match &operation.request_body {
            Some(body) => {
                let at = pointer::join(&operation_pointer, &["requestBody"]);
                let (body, at) = document.resolve(body, &at)?;
                Some(RequestBodyResolver::compile(&body, &at, document, factory)?)
            }
            None => None,
        };

        let controller = controllers.resolve(
            document.model(),
            path_item,
            template,
            method,
            operation,
            &operation_pointer,
        )?;

        debug!(
            method = %method,
            path = template,
            operation_id = %controller.operation_id,
            parameters = parameters.len(),
            has_body = body.is_some(),
            "operation compiled"
        );

        Ok(Self {
            info: Arc::new(OperationInfo {
                method: method.clone(),
                path_template: template.to_string(),
                path_pointer,
                operation_pointer,
                deprecated: operation.deprecated,
                tags: operation.tags.clone(),
                security: operation
                    .security
                    .clone()
                    .or_else(|| document.model().security.clone()),
            }),
            parameters: Arc::from(parameters),
            body,
            controller,
        })
    }
}

impl fmt::Debug for CompiledOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledOperation")
            .field("method", &self.info.method)
            .field("path_template", &self.info.path_template)
            .field("parameters", &self.parameters.len())
            .field("body", &self.body)
            .field("controller", &self.controller)
            .finish()
    }
}

/// Merges parameter lists, path item first. A later list replaces entries
/// with the same name and location; duplicates within one list are an error.
fn merge_parameters<'a>(
    document: &ApiDocument,
    lists: [(&'a Vec<RefOr<Parameter>>, &'a str); 2],
    factory: &dyn ValidatorFactory,
) -> DelphiResult<Vec<ParameterDeclaration>> {
    let mut merged: Vec<ParameterDeclaration> = Vec::new();
    for (list, base) in lists {
        let mut seen: Vec<(ParameterLocation, String)> = Vec::with_capacity(list.len());
        for (index, item) in list.iter().enumerate() {
            let at = pointer::join(base, &["parameters", &index.to_string()]);
            let (parameter, target) = document.resolve(item, &at)?;

            if parameter.location == ParameterIn::Header
                && RESERVED_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(&parameter.name))
            {
                warn!(parameter = %parameter.name, pointer = %at, "reserved header parameter ignored");
                continue;
            }

            let declaration = ParameterDeclaration::compile(&parameter, &target, document, factory)?;
            if seen.iter().any(|(location, name)| declaration.is(*location, name)) {
                return Err(DelphiError::invalid_document_at(
                    format!(
                        "duplicate {} parameter '{}'",
                        declaration.location(),
                        declaration.name()
                    ),
                    at,
                ));
            }
            seen.push((declaration.location(), declaration.name().to_string()));

            match merged
                .iter_mut()
                .find(|existing| existing.is(declaration.location(), declaration.name()))
            {
                Some(existing) => *existing = declaration,
                None => merged.push(declaration),
            }
        }
    }
    Ok(merged)
}

fn warn_undeclared_placeholders(template: &str, parameters: &[ParameterDeclaration]) {
    let Ok(parsed) = PathTemplate::parse(template) else {
        return;
    };
    for name in parsed.param_names() {
        if !parameters.iter().any(|p| p.is(ParameterLocation::Path, name)) {
            warn!(path = template, placeholder = %name, "path placeholder has no parameter declaration");
        }
    }
}

/// Outcome of [`OperationLocator::locate`].
#[derive(Debug)]
pub enum Located<'a> {
    /// The operation declared for the method on the matched template.
    Found {
        /// The compiled operation.
        operation: &'a CompiledOperation,
        /// Raw path placeholder values.
        params: Params,
    },
    /// The template matched; the method is not declared on it.
    MethodNotAllowed {
        /// The matched template.
        template: &'a str,
        /// Declared methods.
        allowed: Vec<Method>,
    },
    /// No template matched.
    NotFound,
}

/// Finds the compiled operation for a method and server-relative path.
pub struct OperationLocator {
    router: Router<MethodRouter<usize>>,
    operations: Vec<CompiledOperation>,
}

impl OperationLocator {
    /// Compiles every operation of the document.
    ///
    /// # Errors
    ///
    /// Fails on invalid or conflicting templates, invalid parameter or body
    /// declarations, and missing controllers when they are not allowed.
    pub fn compile(
        document: &ApiDocument,
        config: &ResolverConfig,
        registry: &ControllerRegistry,
        factory: &dyn ValidatorFactory,
    ) -> DelphiResult<Self> {
        let controllers = ControllerResolver::new(config, registry);
        let mut operations = Vec::new();
        let mut tables: IndexMap<&str, MethodRouter<usize>> = IndexMap::new();

        for (template, path_item) in &document.model().paths {
            let table = tables.entry(template.as_str()).or_default();
            for (key, method, operation) in path_item.operations() {
                let compiled = CompiledOperation::compile(
                    document,
                    template,
                    path_item,
                    key,
                    method,
                    operation,
                    &controllers,
                    factory,
                )?;
                table.insert(method, operations.len());
                operations.push(compiled);
            }
        }

        let mut router = Router::new();
        for (template, table) in tables {
            if !table.has_any_method() {
                warn!(path = template, "path item declares no operations");
                continue;
            }
            router
                .insert(template, table)
                .map_err(|e| DelphiError::invalid_template(template, e.to_string()))?;
        }

        Ok(Self { router, operations })
    }

    /// Locates the operation for `method` on `path`.
    #[must_use]
    pub fn locate(&self, method: &Method, path: &str) -> Located<'_> {
        match self.router.match_route(method, path) {
            RouteOutcome::Matched(matched) => match self.operations.get(*matched.operation) {
                Some(operation) => Located::Found {
                    operation,
                    params: matched.params,
                },
                None => Located::NotFound,
            },
            RouteOutcome::MethodNotAllowed { template, allowed } => Located::MethodNotAllowed { template, allowed },
            RouteOutcome::NotFound => Located::NotFound,
        }
    }

    /// Compiled operations in document order.
    pub fn operations(&self) -> impl Iterator<Item = &CompiledOperation> {
        self.operations.iter()
    }

    /// Number of routed templates.
    #[must_use]
    pub fn template_count(&self) -> usize {
        self.router.len()
    }

    /// Number of compiled operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if the document declares no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl fmt::Debug for OperationLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationLocator")
            .field("templates", &self.router.templates())
            .field("operations", &self.operations.len())
            .finish()
    }
}

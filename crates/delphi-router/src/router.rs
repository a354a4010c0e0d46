//! High-level router API.
//!
//! This module provides the [`Router`] struct, the primary interface for
//! registering path templates and matching request paths against them.

use http::Method;

use crate::error::TemplateError;
use crate::method_router::MethodRouter;
use crate::node::Node;
use crate::params::Params;
use crate::template::PathTemplate;
use crate::{PathMatch, RouteMatch, RouteOutcome};

/// A radix tree router over path templates.
///
/// # Example
///
/// ```rust
/// use delphi_router::{MethodRouter, RouteOutcome, Router};
/// use http::Method;
///
/// let mut router = Router::new();
/// router.insert("/pets", MethodRouter::new().get("listPets")).unwrap();
/// router.insert("/pets/{petId}", MethodRouter::new().get("showPet")).unwrap();
///
/// match router.match_route(&Method::GET, "/pets/42") {
///     RouteOutcome::Matched(m) => {
///         assert_eq!(*m.operation, "showPet");
///         assert_eq!(m.params.get("petId"), Some("42"));
///     }
///     other => panic!("unexpected outcome: {other:?}"),
/// }
/// ```
///
/// # Route Priority
///
/// When several templates match the same path:
///
/// 1. the template with more literal segments wins (`/users/me` beats
///    `/users/{id}`);
/// 2. on equal literals, more pattern segments win (`/files/{name}.{ext}`
///    beats `/files/{file}`);
/// 3. otherwise the template whose first literal comes earliest wins
///    (`/a/{y}` beats `/{x}/b` for `/a/b`).
///
/// Two templates with the same shape are rejected at insertion.
#[derive(Debug, Clone)]
pub struct Router<T> {
    root: Node<T>,
    templates: Vec<String>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            templates: Vec::new(),
        }
    }

    /// Registers a template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if the template is malformed or has the same
    /// shape as one already registered.
    pub fn insert(&mut self, template: &str, value: T) -> Result<(), TemplateError> {
        let parsed = PathTemplate::parse(template)?;
        self.root.insert(&parsed, value)?;
        self.templates.push(template.to_string());
        Ok(())
    }

    /// Matches a request path, ignoring methods.
    ///
    /// Empty segments are skipped, so trailing slashes are tolerated.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<PathMatch<'_, T>> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut captured = Vec::with_capacity(segments.len());
        let mut best = None;
        self.root.find(&segments, &mut captured, &mut best);

        best.map(|candidate| PathMatch {
            template: candidate.leaf.template.as_str(),
            value: &candidate.leaf.value,
            params: Params::bind(&candidate.leaf.names, &candidate.values),
        })
    }

    /// Returns registered templates in insertion order.
    #[must_use]
    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    /// Returns the number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns true if no templates are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl<T> Router<MethodRouter<T>> {
    /// Matches a path and method.
    ///
    /// A path that matches with no value for `method` yields
    /// [`RouteOutcome::MethodNotAllowed`] so callers can tell 405 from 404.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> RouteOutcome<'_, T> {
        let Some(matched) = self.match_path(path) else {
            return RouteOutcome::NotFound;
        };

        match matched.value.get_operation(method) {
            Some(operation) => RouteOutcome::Matched(RouteMatch {
                template: matched.template,
                operation,
                params: matched.params,
            }),
            None => RouteOutcome::MethodNotAllowed {
                template: matched.template,
                allowed: matched.value.allowed_methods(),
            },
        }
    }
}

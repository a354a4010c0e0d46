//! Per-request OpenAPI context.

use std::fmt;
use std::sync::Arc;

use delphi_core::pointer;
use http::Method;

use crate::document::{ApiDocument, Operation, PathItem, SecurityRequirement, Server};
use crate::operation::OperationInfo;

/// OpenAPI-specific data attached to a resolved request.
///
/// Everything here is shared with the resolver; cloning is cheap.
#[derive(Clone)]
pub struct Oas3Context {
    document: Arc<ApiDocument>,
    operation: Arc<OperationInfo>,
    server_index: Option<usize>,
    media_type_pointer: Option<String>,
}

impl Oas3Context {
    pub(crate) fn new(
        document: Arc<ApiDocument>,
        operation: Arc<OperationInfo>,
        server_index: Option<usize>,
        media_type_pointer: Option<String>,
    ) -> Self {
        Self {
            document,
            operation,
            server_index,
            media_type_pointer,
        }
    }

    /// The whole document.
    #[must_use]
    pub fn document(&self) -> &ApiDocument {
        &self.document
    }

    /// The method the operation is declared for.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.operation.method
    }

    /// The matched path template.
    #[must_use]
    pub fn path_template(&self) -> &str {
        &self.operation.path_template
    }

    /// The matched server, `None` for the implicit root server or when
    /// servers are ignored.
    #[must_use]
    pub fn server(&self) -> Option<&Server> {
        self.server_index
            .and_then(|index| self.document.model().servers.get(index))
    }

    /// JSON pointer to the matched server.
    #[must_use]
    pub fn server_pointer(&self) -> Option<String> {
        self.server_index
            .map(|index| pointer::join("/servers", &[&index.to_string()]))
    }

    /// The matched path item.
    #[must_use]
    pub fn path_item(&self) -> Option<&PathItem> {
        self.document.model().paths.get(&self.operation.path_template)
    }

    /// JSON pointer to the matched path item.
    #[must_use]
    pub fn path_item_pointer(&self) -> &str {
        &self.operation.path_pointer
    }

    /// The matched operation.
    #[must_use]
    pub fn operation(&self) -> Option<&Operation> {
        self.path_item()
            .and_then(|item| item.operation(&self.operation.method))
    }

    /// JSON pointer to the matched operation.
    #[must_use]
    pub fn operation_pointer(&self) -> &str {
        &self.operation.operation_pointer
    }

    /// JSON pointer to the negotiated request body media type.
    #[must_use]
    pub fn media_type_pointer(&self) -> Option<&str> {
        self.media_type_pointer.as_deref()
    }

    /// Effective security requirements.
    #[must_use]
    pub fn security(&self) -> Option<&[SecurityRequirement]> {
        self.operation.security.as_deref()
    }

    /// Whether the operation is deprecated.
    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        self.operation.deprecated
    }

    /// Operation tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.operation.tags
    }
}

impl fmt::Debug for Oas3Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Oas3Context")
            .field("method", &self.operation.method)
            .field("path_template", &self.operation.path_template)
            .field("server_index", &self.server_index)
            .field("operation_pointer", &self.operation.operation_pointer)
            .field("media_type_pointer", &self.media_type_pointer)
            .finish_non_exhaustive()
    }
}

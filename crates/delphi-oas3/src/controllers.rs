//! Controller selection.
//!
//! Each operation is bound to a controller name, an operation id and,
//! when one is registered, a controller reference. Binding happens once,
//! when the API is built.

use delphi_core::{Controller, ControllerRegistry, DelphiError, DelphiResult};
use http::Method;
use serde_json::Value;

use crate::config::ResolverConfig;
use crate::document::{Extensions, OpenApi, Operation, PathItem};

/// The controller bound to one operation.
#[derive(Clone)]
pub struct ControllerSelection {
    /// Controller name from the `<prefix>-controller` extension.
    pub controller_name: Option<String>,
    /// Operation id used for lookup.
    pub operation_id: String,
    /// The registered controller, if any.
    pub controller: Option<Controller>,
}

impl std::fmt::Debug for ControllerSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerSelection")
            .field("controller_name", &self.controller_name)
            .field("operation_id", &self.operation_id)
            .field("registered", &self.controller.is_some())
            .finish()
    }
}

/// Binds operations to controllers.
#[derive(Debug)]
pub struct ControllerResolver<'a> {
    config: &'a ResolverConfig,
    registry: &'a ControllerRegistry,
}

impl<'a> ControllerResolver<'a> {
    /// Creates a resolver over a registry.
    #[must_use]
    pub const fn new(config: &'a ResolverConfig, registry: &'a ControllerRegistry) -> Self {
        Self { config, registry }
    }

    /// Selects the controller for the operation declared for `method` on
    /// `template`. `pointer` locates the operation, for error reporting.
    ///
    /// # Errors
    ///
    /// Fails if an extension is not a string, or if no controller is
    /// registered and missing controllers are not allowed.
    pub fn resolve(
        &self,
        document: &OpenApi,
        path_item: &PathItem,
        template: &str,
        method: &Method,
        operation: &Operation,
        pointer: &str,
    ) -> DelphiResult<ControllerSelection> {
        let controller_key = self.config.controller_extension();
        let controller_name = [&operation.extensions, &path_item.extensions, &document.extensions]
            .into_iter()
            .find_map(|extensions| string_extension(extensions, &controller_key, pointer).transpose())
            .transpose()?;

        let operation_id = match string_extension(&operation.extensions, &self.config.operation_id_extension(), pointer)? {
            Some(id) => id,
            None => operation
                .operation_id
                .clone()
                .unwrap_or_else(|| fallback_operation_id(method, template)),
        };

        let controller = self.registry.find(controller_name.as_deref(), &operation_id);
        if controller.is_none() && !self.config.allow_missing_controllers {
            return Err(DelphiError::MissingController {
                controller: controller_name,
                operation_id,
            });
        }

        Ok(ControllerSelection {
            controller_name,
            operation_id,
            controller,
        })
    }
}

fn string_extension(extensions: &Extensions, key: &str, pointer: &str) -> DelphiResult<Option<String>> {
    match extensions.get(key) {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(DelphiError::invalid_document_at(
            format!("extension '{key}' must be a string"),
            pointer,
        )),
    }
}

/// Operation id for operations that declare none: the lowercase method
/// followed by each path segment capitalised, placeholders as `By<Name>`.
///
/// ```rust
/// use delphi_oas3::controllers::fallback_operation_id;
/// use http::Method;
///
/// assert_eq!(fallback_operation_id(&Method::GET, "/users/{id}/orders"), "getUsersByIdOrders");
/// assert_eq!(fallback_operation_id(&Method::POST, "/"), "post");
/// ```
#[must_use]
pub fn fallback_operation_id(method: &Method, template: &str) -> String {
    let mut id = method.as_str().to_ascii_lowercase();
    for segment in template.split('/').filter(|s| !s.is_empty()) {
        let mut rest = segment;
        while !rest.is_empty() {
            match rest.find('{') {
                Some(0) => {
                    let end = rest.find('}').unwrap_or(rest.len());
                    id.push_str("By");
                    id.push_str(&capitalise(&rest[1..end]));
                    rest = rest.get(end + 1..).unwrap_or_default();
                }
                Some(start) => {
                    id.push_str(&capitalise(&rest[..start]));
                    rest = &rest[start..];
                }
                None => {
                    id.push_str(&capitalise(rest));
                    rest = "";
                }
            }
        }
    }
    id
}

/// Capitalises each alphanumeric run: `pet-owners` → `PetOwners`.
fn capitalise(text: &str) -> String {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + chars.as_str()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> OpenApi {
        serde_json::from_value(json!({
            "openapi": "3.0.3",
            "x-delphi-controller": "root",
            "paths": {
                "/pets": {
                    "x-delphi-controller": "pets",
                    "get": {"operationId": "listPets"},
                    "post": {"x-delphi-operationId": "createPet", "operationId": "ignored"},
                    "delete": {"x-delphi-controller": "admin"}
                },
                "/health": {"get": {"x-delphi-controller": 5}}
            }
        }))
        .unwrap()
    }

    fn select(config: &ResolverConfig, registry: &ControllerRegistry, path: &str, method: &Method) -> DelphiResult<ControllerSelection> {
        let document = document();
        let item = &document.paths[path];
        let operation = item.operation(method).unwrap();
        ControllerResolver::new(config, registry).resolve(&document, item, path, method, operation, "/op")
    }

    #[test]
    fn test_extension_precedence() {
        let config = ResolverConfig::default();
        let registry = ControllerRegistry::new().with_controller("pets", "listPets", 1_u8);

        let selection = select(&config, &registry, "/pets", &Method::GET).unwrap();
        assert_eq!(selection.controller_name.as_deref(), Some("pets"));
        assert_eq!(selection.operation_id, "listPets");
        assert!(selection.controller.is_some());

        let selection = select(&config, &registry, "/pets", &Method::POST).unwrap();
        assert_eq!(selection.operation_id, "createPet");
        assert!(selection.controller.is_none());

        let selection = select(&config, &registry, "/pets", &Method::DELETE).unwrap();
        assert_eq!(selection.controller_name.as_deref(), Some("admin"));
        assert_eq!(selection.operation_id, "deletePets");
    }

    #[test]
    fn test_missing_controller_when_disallowed() {
        let config = ResolverConfig::strict();
        let err = select(&config, &ControllerRegistry::new(), "/pets", &Method::GET).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No controller registered for operation 'listPets' in 'pets'"
        );
    }

    #[test]
    fn test_non_string_extension() {
        let err = select(&ResolverConfig::default(), &ControllerRegistry::new(), "/health", &Method::GET).unwrap_err();
        assert!(matches!(err, DelphiError::InvalidDocument { pointer: Some(ref p), .. } if p == "/op"));
    }

    #[test]
    fn test_fallback_operation_ids() {
        assert_eq!(fallback_operation_id(&Method::GET, "/users/{id}/orders"), "getUsersByIdOrders");
        assert_eq!(fallback_operation_id(&Method::DELETE, "/pet-owners/{owner_id}"), "deletePetOwnersByOwnerId");
        assert_eq!(fallback_operation_id(&Method::GET, "/files/{name}.{ext}"), "getFilesByNameByExt");
        assert_eq!(fallback_operation_id(&Method::PUT, ""), "put");
    }
}

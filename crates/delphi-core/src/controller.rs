//! Controller references.
//!
//! A controller is opaque to the resolver: it is stored, selected and handed
//! back, never called. Callers downcast it to whatever handler type they
//! registered.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

/// An opaque, shareable controller reference.
pub type Controller = Arc<dyn Any + Send + Sync>;

/// Controllers keyed by controller name and operation id.
///
/// Operations whose description names a controller are looked up in that
/// controller's table; the rest are looked up by operation id alone.
///
/// # Example
///
/// ```rust
/// use delphi_core::ControllerRegistry;
///
/// fn list_pets() -> &'static str { "[]" }
///
/// let registry = ControllerRegistry::new()
///     .with_controller("pets", "listPets", list_pets as fn() -> &'static str)
///     .with_operation("health", "ok");
///
/// let controller = registry.find(Some("pets"), "listPets").unwrap();
/// let handler = controller.downcast_ref::<fn() -> &'static str>().unwrap();
/// assert_eq!(handler(), "[]");
///
/// assert!(registry.find(None, "health").is_some());
/// assert!(registry.find(Some("pets"), "health").is_none());
/// ```
#[derive(Clone, Default)]
pub struct ControllerRegistry {
    controllers: IndexMap<String, IndexMap<String, Controller>>,
    operations: IndexMap<String, Controller>,
}

impl ControllerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `controller` for an operation inside a named controller.
    pub fn register(
        &mut self,
        controller_name: impl Into<String>,
        operation_id: impl Into<String>,
        controller: impl Any + Send + Sync,
    ) {
        self.controllers
            .entry(controller_name.into())
            .or_default()
            .insert(operation_id.into(), Arc::new(controller));
    }

    /// Registers `controller` for an operation id with no controller name.
    pub fn register_operation(
        &mut self,
        operation_id: impl Into<String>,
        controller: impl Any + Send + Sync,
    ) {
        self.operations
            .insert(operation_id.into(), Arc::new(controller));
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with_controller(
        mut self,
        controller_name: impl Into<String>,
        operation_id: impl Into<String>,
        controller: impl Any + Send + Sync,
    ) -> Self {
        self.register(controller_name, operation_id, controller);
        self
    }

    /// Builder form of [`register_operation`](Self::register_operation).
    #[must_use]
    pub fn with_operation(
        mut self,
        operation_id: impl Into<String>,
        controller: impl Any + Send + Sync,
    ) -> Self {
        self.register_operation(operation_id, controller);
        self
    }

    /// Finds the controller for an operation.
    #[must_use]
    pub fn find(&self, controller_name: Option<&str>, operation_id: &str) -> Option<Controller> {
        let controller = match controller_name {
            Some(name) => self.controllers.get(name)?.get(operation_id),
            None => self.operations.get(operation_id),
        };
        controller.cloned()
    }

    /// Returns the number of registered controllers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len() + self.controllers.values().map(IndexMap::len).sum::<usize>()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let controllers: IndexMap<&str, Vec<&str>> = self
            .controllers
            .iter()
            .map(|(name, ops)| (name.as_str(), ops.keys().map(String::as_str).collect()))
            .collect();
        f.debug_struct("ControllerRegistry")
            .field("controllers", &controllers)
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_empty() {
        let registry = ControllerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.find(None, "anything").is_none());
    }

    #[test]
    fn test_register_and_find() {
        let mut registry = ControllerRegistry::new();
        registry.register("pets", "listPets", 1_u32);
        registry.register("pets", "showPet", 2_u32);
        registry.register_operation("health", 3_u32);

        assert_eq!(registry.len(), 3);
        let controller = registry.find(Some("pets"), "showPet").unwrap();
        assert_eq!(controller.downcast_ref::<u32>(), Some(&2));
        assert!(registry.find(Some("owners"), "showPet").is_none());
        assert!(registry.find(None, "showPet").is_none());
        assert_eq!(
            registry.find(None, "health").unwrap().downcast_ref::<u32>(),
            Some(&3)
        );
    }

    #[test]
    fn test_find_returns_shared_reference() {
        let registry = ControllerRegistry::new().with_operation("ping", String::from("pong"));
        let first = registry.find(None, "ping").unwrap();
        let second = registry.find(None, "ping").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_debug_lists_names() {
        let registry = ControllerRegistry::new().with_controller("pets", "listPets", ());
        let debug = format!("{registry:?}");
        assert!(debug.contains("pets"));
        assert!(debug.contains("listPets"));
    }
}

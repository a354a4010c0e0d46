//! Per-template method table.
//!
//! Maps the eight HTTP methods an API description can declare on a path to
//! the value registered for each one.

use http::Method;

/// Maps HTTP methods to values for a single path template.
///
/// # Example
///
/// ```rust
/// use delphi_router::MethodRouter;
/// use http::Method;
///
/// let router = MethodRouter::new().get("listPets").post("createPet");
///
/// assert_eq!(router.get_operation(&Method::GET), Some(&"listPets"));
/// assert_eq!(router.get_operation(&Method::DELETE), None);
/// assert_eq!(router.allowed_methods(), vec![Method::GET, Method::POST]);
/// ```
#[derive(Debug, Clone)]
pub struct MethodRouter<T> {
    get: Option<T>,
    put: Option<T>,
    post: Option<T>,
    delete: Option<T>,
    options: Option<T>,
    head: Option<T>,
    patch: Option<T>,
    trace: Option<T>,
}

impl<T> Default for MethodRouter<T> {
    fn default() -> Self {
        Self {
            get: None,
            put: None,
            post: None,
            delete: None,
            options: None,
            head: None,
            patch: None,
            trace: None,
        }
    }
}

impl<T> MethodRouter<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a GET value.
    #[must_use]
    pub fn get(mut self, value: T) -> Self {
        self.get = Some(value);
        self
    }

    /// Registers a PUT value.
    #[must_use]
    pub fn put(mut self, value: T) -> Self {
        self.put = Some(value);
        self
    }

    /// Registers a POST value.
    #[must_use]
    pub fn post(mut self, value: T) -> Self {
        self.post = Some(value);
        self
    }

    /// Registers a DELETE value.
    #[must_use]
    pub fn delete(mut self, value: T) -> Self {
        self.delete = Some(value);
        self
    }

    /// Registers a PATCH value.
    #[must_use]
    pub fn patch(mut self, value: T) -> Self {
        self.patch = Some(value);
        self
    }

    /// Registers a value for an arbitrary method.
    ///
    /// Methods outside the eight an API path can declare are ignored.
    #[must_use]
    pub fn method(mut self, method: &Method, value: T) -> Self {
        self.insert(method, value);
        self
    }

    /// Registers a value in place, returning the previous one.
    pub fn insert(&mut self, method: &Method, value: T) -> Option<T> {
        self.slot_mut(method).and_then(|slot| slot.replace(value))
    }

    /// Returns the value registered for `method`.
    #[must_use]
    pub fn get_operation(&self, method: &Method) -> Option<&T> {
        match *method {
            Method::GET => self.get.as_ref(),
            Method::PUT => self.put.as_ref(),
            Method::POST => self.post.as_ref(),
            Method::DELETE => self.delete.as_ref(),
            Method::OPTIONS => self.options.as_ref(),
            Method::HEAD => self.head.as_ref(),
            Method::PATCH => self.patch.as_ref(),
            Method::TRACE => self.trace.as_ref(),
            _ => None,
        }
    }

    /// Returns true if any method is registered.
    #[must_use]
    pub fn has_any_method(&self) -> bool {
        self.iter().next().is_some()
    }

    /// Returns the registered methods in declaration order of the table.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        self.iter().map(|(method, _)| method).collect()
    }

    /// Iterates over registered `(method, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Method, &T)> {
        [
            (Method::GET, self.get.as_ref()),
            (Method::PUT, self.put.as_ref()),
            (Method::POST, self.post.as_ref()),
            (Method::DELETE, self.delete.as_ref()),
            (Method::OPTIONS, self.options.as_ref()),
            (Method::HEAD, self.head.as_ref()),
            (Method::PATCH, self.patch.as_ref()),
            (Method::TRACE, self.trace.as_ref()),
        ]
        .into_iter()
        .filter_map(|(method, value)| value.map(|v| (method, v)))
    }

    fn slot_mut(&mut self, method: &Method) -> Option<&mut Option<T>> {
        match *method {
            Method::GET => Some(&mut self.get),
            Method::PUT => Some(&mut self.put),
            Method::POST => Some(&mut self.post),
            Method::DELETE => Some(&mut self.delete),
            Method::OPTIONS => Some(&mut self.options),
            Method::HEAD => Some(&mut self.head),
            Method::PATCH => Some(&mut self.patch),
            Method::TRACE => Some(&mut self.trace),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_router_new() {
        let router: MethodRouter<u8> = MethodRouter::new();
        assert!(!router.has_any_method());
        assert!(router.allowed_methods().is_empty());
    }

    #[test]
    fn test_method_router_builders() {
        let router = MethodRouter::new()
            .get(1)
            .put(2)
            .post(3)
            .delete(4)
            .patch(5);

        assert_eq!(router.get_operation(&Method::GET), Some(&1));
        assert_eq!(router.get_operation(&Method::PUT), Some(&2));
        assert_eq!(router.get_operation(&Method::POST), Some(&3));
        assert_eq!(router.get_operation(&Method::DELETE), Some(&4));
        assert_eq!(router.get_operation(&Method::PATCH), Some(&5));
        assert_eq!(router.get_operation(&Method::HEAD), None);
    }

    #[test]
    fn test_method_router_generic_method() {
        let router = MethodRouter::new()
            .method(&Method::TRACE, "trace")
            .method(&Method::OPTIONS, "options");
        assert_eq!(router.get_operation(&Method::TRACE), Some(&"trace"));
        assert_eq!(router.get_operation(&Method::OPTIONS), Some(&"options"));
    }

    #[test]
    fn test_method_router_ignores_connect() {
        let router = MethodRouter::new().method(&Method::CONNECT, "tunnel");
        assert!(!router.has_any_method());
    }

    #[test]
    fn test_method_router_insert_replaces() {
        let mut router = MethodRouter::new().get("old");
        assert_eq!(router.insert(&Method::GET, "new"), Some("old"));
        assert_eq!(router.get_operation(&Method::GET), Some(&"new"));
    }

    #[test]
    fn test_method_router_allowed_methods_order() {
        let router = MethodRouter::new().patch(()).get(()).delete(());
        assert_eq!(
            router.allowed_methods(),
            vec![Method::GET, Method::DELETE, Method::PATCH]
        );
    }
}

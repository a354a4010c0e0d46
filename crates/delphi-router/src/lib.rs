//! Path template matching for Delphi.
//!
//! This crate maps request paths onto the URL templates declared by an API
//! description. Templates are compiled once into a radix tree; matching is a
//! depth-first search that keeps the most specific complete match.
//!
//! # Features
//!
//! - **Literal, placeholder and pattern segments**: `/users`, `/users/{id}`,
//!   `/files/{name}.{ext}`
//! - **Specificity ranking**: templates with more literal segments win
//! - **Method tables**: [`MethodRouter`] distinguishes "no such path" from
//!   "path exists, method not declared"
//! - **Raw bindings**: placeholder values are returned exactly as received
//!
//! # Example
//!
//! ```rust
//! use delphi_router::{MethodRouter, RouteOutcome, Router};
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.insert("/users/{id}", MethodRouter::new().get(1_usize)).unwrap();
//! router.insert("/users/me", MethodRouter::new().get(2_usize)).unwrap();
//!
//! let RouteOutcome::Matched(m) = router.match_route(&Method::GET, "/users/me") else {
//!     panic!("expected a match");
//! };
//! assert_eq!(*m.operation, 2);
//!
//! assert!(matches!(
//!     router.match_route(&Method::POST, "/users/me"),
//!     RouteOutcome::MethodNotAllowed { .. }
//! ));
//! ```
//!
//! # Architecture
//!
//! ```text
//!                    (root)
//!                      │
//!                   "users"
//!              ┌───────┴───────┐
//!              │               │
//!            "me"            "{}"
//!           (leaf)          (leaf)
//!         /users/me      /users/{id}
//! ```

mod error;
mod method_router;
mod node;
mod params;
mod router;
mod template;

pub use error::TemplateError;
pub use method_router::MethodRouter;
pub use params::Params;
pub use router::Router;
pub use template::{PathTemplate, Segment};

use http::Method;

/// A path match, before method selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch<'a, T> {
    /// The template as declared.
    pub template: &'a str,
    /// The value registered for the template.
    pub value: &'a T,
    /// Raw placeholder bindings.
    pub params: Params,
}

/// A path and method match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a, T> {
    /// The template as declared.
    pub template: &'a str,
    /// The value registered for the method.
    pub operation: &'a T,
    /// Raw placeholder bindings.
    pub params: Params,
}

/// Result of matching a path and method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome<'a, T> {
    /// Path and method both matched.
    Matched(RouteMatch<'a, T>),
    /// The path matched but the method is not declared on it.
    MethodNotAllowed {
        /// The matched template.
        template: &'a str,
        /// Methods declared on the template.
        allowed: Vec<Method>,
    },
    /// No template matched.
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_routing() {
        let mut router = Router::new();
        router.insert("/users", MethodRouter::new().get("listUsers")).unwrap();
        router.insert("/users/{id}", MethodRouter::new().get("getUser")).unwrap();

        let m = router.match_path("/users").unwrap();
        assert_eq!(m.template, "/users");
        assert!(m.params.is_empty());

        let m = router.match_path("/users/123").unwrap();
        assert_eq!(m.template, "/users/{id}");
        assert_eq!(m.params.get("id"), Some("123"));
    }

    #[test]
    fn test_param_names_per_template() {
        let mut router = Router::new();
        router.insert("/a/{first}", MethodRouter::new().get(1)).unwrap();
        router.insert("/a/{second}/b", MethodRouter::new().get(2)).unwrap();

        assert_eq!(router.match_path("/a/x").unwrap().params.get("first"), Some("x"));
        let m = router.match_path("/a/y/b").unwrap();
        assert_eq!(m.params.get("second"), Some("y"));
        assert_eq!(m.params.get("first"), None);
    }

    #[test]
    fn test_multiple_params() {
        let mut router = Router::new();
        router
            .insert("/orgs/{orgId}/users/{userId}", MethodRouter::new().get("getOrgUser"))
            .unwrap();

        let m = router.match_path("/orgs/acme/users/123").unwrap();
        assert_eq!(m.params.get("orgId"), Some("acme"));
        assert_eq!(m.params.get("userId"), Some("123"));
    }

    #[test]
    fn test_pattern_segment_binding() {
        let mut router = Router::new();
        router
            .insert("/reports/{year}-{month}.{format}", MethodRouter::new().get("report"))
            .unwrap();

        let m = router.match_path("/reports/2024-05.csv").unwrap();
        assert_eq!(m.params.get("year"), Some("2024"));
        assert_eq!(m.params.get("month"), Some("05"));
        assert_eq!(m.params.get("format"), Some("csv"));
    }
}

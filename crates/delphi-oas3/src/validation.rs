//! Aggregated parameter validation.

use delphi_core::{into_errors, ParameterLocation, ParsedParameters, ValidationError};

use crate::parameters::ParameterDeclaration;

/// Validates extracted parameters against their declarations.
///
/// Every declaration is checked; violations are collected in location
/// order (query, header, server, path, cookie) and declaration order within
/// a location. A missing required parameter yields exactly one error and
/// its schema is not consulted.
#[derive(Debug)]
pub struct ParameterValidator<'a> {
    declarations: Vec<&'a ParameterDeclaration>,
}

impl<'a> ParameterValidator<'a> {
    /// Creates a validator over `declarations`.
    pub fn new(declarations: impl IntoIterator<Item = &'a ParameterDeclaration>) -> Self {
        Self {
            declarations: declarations.into_iter().collect(),
        }
    }

    /// Returns every violation, or `None` when all parameters are valid.
    #[must_use]
    pub fn validate(&self, parsed: &ParsedParameters) -> Option<Vec<ValidationError>> {
        let errors = ParameterLocation::ALL
            .into_iter()
            .flat_map(|location| {
                self.declarations
                    .iter()
                    .filter(move |declaration| declaration.location() == location)
            })
            .fold(Vec::new(), |mut errors, declaration| {
                match parsed.find(declaration.location(), declaration.name()) {
                    None if declaration.is_required() => errors.push(ValidationError::missing_parameter(
                        declaration.location(),
                        declaration.name(),
                        declaration.doc_path(),
                    )),
                    None => {}
                    Some(value) => {
                        if let Some(found) = declaration.validator().and_then(|v| v.validate(value)) {
                            errors.extend(found);
                        }
                    }
                }
                errors
            });
        into_errors(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ApiDocument, Parameter};
    use crate::schema::SchemaValidatorFactory;
    use delphi_core::ErrorSource;
    use serde_json::{json, Value};

    fn declarations(parameters: Value) -> Vec<ParameterDeclaration> {
        let document = ApiDocument::from_value(json!({"openapi": "3.0.3", "paths": {}})).unwrap();
        let parameters: Vec<Parameter> = serde_json::from_value(parameters).unwrap();
        parameters
            .iter()
            .enumerate()
            .map(|(i, p)| {
                ParameterDeclaration::compile(p, &format!("/p/{i}"), &document, &SchemaValidatorFactory::default())
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_missing_required_is_one_error() {
        let declarations = declarations(json!([
            {"name": "tag", "in": "query", "required": true, "schema": {"type": "string", "minLength": 3}}
        ]));
        let errors = ParameterValidator::new(&declarations)
            .validate(&ParsedParameters::default())
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Missing required query parameter \"tag\"");
        let location = errors[0].location.as_ref().unwrap();
        assert_eq!(location.source, ErrorSource::Query);
        assert_eq!(location.doc_path, "/p/0");
    }

    #[test]
    fn test_valid_parameters() {
        let declarations = declarations(json!([
            {"name": "limit", "in": "query", "schema": {"type": "integer", "minimum": 1}}
        ]));
        let mut parsed = ParsedParameters::default();
        parsed.query.insert("limit".to_string(), json!(5));
        assert!(ParameterValidator::new(&declarations).validate(&parsed).is_none());
        assert!(ParameterValidator::new(&declarations)
            .validate(&ParsedParameters::default())
            .is_none());
    }

    #[test]
    fn test_errors_are_ordered_by_location() {
        let declarations = declarations(json!([
            {"name": "session", "in": "cookie", "required": true, "schema": {"type": "string"}},
            {"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}},
            {"name": "x-rate", "in": "header", "required": true, "schema": {"type": "integer"}},
            {"name": "limit", "in": "query", "schema": {"type": "integer"}},
            {"name": "tag", "in": "query", "required": true, "schema": {"type": "string"}}
        ]));
        let mut parsed = ParsedParameters::default();
        parsed.query.insert("limit".to_string(), json!("ten"));
        parsed.path.insert("id".to_string(), json!("abc"));

        let errors = ParameterValidator::new(&declarations).validate(&parsed).unwrap();
        let sources: Vec<_> = errors
            .iter()
            .map(|e| {
                let location = e.location.as_ref().unwrap();
                (location.source, location.name.as_str())
            })
            .collect();
        assert_eq!(
            sources,
            vec![
                (ErrorSource::Query, "limit"),
                (ErrorSource::Query, "tag"),
                (ErrorSource::Header, "x-rate"),
                (ErrorSource::Path, "id"),
                (ErrorSource::Cookie, "session"),
            ]
        );
    }
}

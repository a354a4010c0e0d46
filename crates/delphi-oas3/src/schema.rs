//! Default schema validation.
//!
//! [`SchemaValidatorFactory`] compiles OpenAPI schema objects into
//! [`SchemaValidator`]s. References are resolved against the whole document
//! and patterns are compiled up front, so a schema that compiles cannot fail
//! for reasons of its own at request time.
//!
//! Supported keywords: `$ref`, `type` (single or list), `nullable`, `enum`,
//! `const`, `properties`, `required`, `additionalProperties`,
//! `minProperties`, `maxProperties`, `items`, `minItems`, `maxItems`,
//! `uniqueItems`, `minimum`, `maximum`, `exclusiveMinimum`,
//! `exclusiveMaximum`, `multipleOf`, `minLength`, `maxLength`, `pattern`,
//! `format`, `allOf`, `anyOf`, `oneOf` and `not`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use delphi_core::{
    into_errors, pointer, DelphiError, DelphiResult, ValidationError, ValidationTarget, ValidatorFactory,
    ValidatorFunction,
};
use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::{Map, Number, Value};
use uuid::Uuid;

/// Deepest schema nesting evaluated, guarding recursive schemas.
const MAX_DEPTH: usize = 64;

/// Keywords whose value is a single subschema.
const SCHEMA_KEYWORDS: [&str; 3] = ["additionalProperties", "items", "not"];

/// Keywords whose value is a list of subschemas.
const SCHEMA_LIST_KEYWORDS: [&str; 3] = ["allOf", "anyOf", "oneOf"];

/// Compiles schemas into [`SchemaValidator`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidatorFactory {
    all_errors: bool,
}

impl SchemaValidatorFactory {
    /// Creates a factory. With `all_errors` every violation of a value is
    /// reported instead of the first.
    #[must_use]
    pub const fn new(all_errors: bool) -> Self {
        Self { all_errors }
    }

    /// Whether every violation is reported.
    #[must_use]
    pub const fn all_errors(&self) -> bool {
        self.all_errors
    }
}

impl ValidatorFactory for SchemaValidatorFactory {
    fn compile(
        &self,
        schema: &Value,
        root: &Arc<Value>,
        target: ValidationTarget,
    ) -> DelphiResult<Arc<dyn ValidatorFunction>> {
        let mut patterns = HashMap::new();
        let mut visited = HashSet::new();
        collect_patterns(schema, root, &target.doc_path, &mut patterns, &mut visited)?;

        Ok(Arc::new(SchemaValidator {
            schema: schema.clone(),
            root: Arc::clone(root),
            target,
            all_errors: self.all_errors,
            patterns,
        }))
    }
}

/// Walks a schema, checking references and compiling every `pattern`.
fn collect_patterns(
    schema: &Value,
    root: &Value,
    doc_path: &str,
    patterns: &mut HashMap<String, Regex>,
    visited: &mut HashSet<String>,
) -> DelphiResult<()> {
    let Value::Object(schema) = schema else {
        return Ok(());
    };

    if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
        let target = pointer::resolve(root, reference).ok_or_else(|| {
            DelphiError::invalid_document_at(format!("cannot resolve reference '{reference}'"), doc_path)
        })?;
        if visited.insert(reference.to_string()) {
            collect_patterns(target, root, doc_path, patterns, visited)?;
        }
    }

    if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
        if !patterns.contains_key(pattern) {
            let regex = Regex::new(pattern).map_err(|e| {
                DelphiError::invalid_document_at(format!("invalid pattern '{pattern}': {e}"), doc_path)
            })?;
            patterns.insert(pattern.to_string(), regex);
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for property in properties.values() {
            collect_patterns(property, root, doc_path, patterns, visited)?;
        }
    }
    for keyword in SCHEMA_KEYWORDS {
        if let Some(subschema) = schema.get(keyword) {
            collect_patterns(subschema, root, doc_path, patterns, visited)?;
        }
    }
    for keyword in SCHEMA_LIST_KEYWORDS {
        for subschema in schema.get(keyword).and_then(Value::as_array).into_iter().flatten() {
            collect_patterns(subschema, root, doc_path, patterns, visited)?;
        }
    }
    Ok(())
}

/// Validates values against one compiled schema.
pub struct SchemaValidator {
    schema: Value,
    root: Arc<Value>,
    target: ValidationTarget,
    all_errors: bool,
    patterns: HashMap<String, Regex>,
}

impl SchemaValidator {
    fn done(&self, errors: &[ValidationError]) -> bool {
        !self.all_errors && !errors.is_empty()
    }

    fn push(&self, errors: &mut Vec<ValidationError>, path: &str, message: impl Into<String>) {
        errors.push(self.target.error(path, message));
    }

    /// Returns true if `value` satisfies `schema`, without reporting.
    fn accepts(&self, schema: &Value, value: &Value, path: &str, depth: usize) -> bool {
        let mut scratch = Vec::new();
        self.check(schema, value, path, depth, &mut scratch);
        scratch.is_empty()
    }

    fn check(&self, schema: &Value, value: &Value, path: &str, depth: usize, errors: &mut Vec<ValidationError>) {
        if depth > MAX_DEPTH {
            return self.push(errors, path, "schema nesting too deep");
        }
        let schema = match schema {
            Value::Object(schema) => schema,
            Value::Bool(false) => return self.push(errors, path, "must NOT be valid"),
            _ => return,
        };

        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            match pointer::resolve(&self.root, reference) {
                Some(target) => self.check(target, value, path, depth + 1, errors),
                None => self.push(errors, path, format!("cannot resolve reference '{reference}'")),
            }
            if self.done(errors) {
                return;
            }
        }

        if value.is_null() && schema.get("nullable") == Some(&Value::Bool(true)) {
            return;
        }
        if let Some(types) = schema.get("type") {
            if !type_matches(types, value) {
                return self.push(errors, path, format!("must be {}", type_names(types)));
            }
        }
        if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
            if !allowed.iter().any(|candidate| equal(candidate, value)) {
                self.push(errors, path, "must be equal to one of the allowed values");
            }
        }
        if let Some(constant) = schema.get("const") {
            if !equal(constant, value) {
                self.push(errors, path, "must be equal to constant");
            }
        }
        if self.done(errors) {
            return;
        }

        match value {
            Value::Number(_) => self.check_number(schema, value, path, errors),
            Value::String(text) => self.check_string(schema, text, path, errors),
            Value::Array(items) => self.check_array(schema, items, path, depth, errors),
            Value::Object(object) => self.check_object(schema, object, path, depth, errors),
            Value::Null | Value::Bool(_) => {}
        }
        if self.done(errors) {
            return;
        }
        self.check_combinators(schema, value, path, depth, errors);
    }

    fn check_number(&self, schema: &Map<String, Value>, value: &Value, path: &str, errors: &mut Vec<ValidationError>) {
        let Some(number) = value.as_f64() else {
            return;
        };
        let exclusive = |key: &str| schema.get(key) == Some(&Value::Bool(true));

        let checks = [
            ("minimum", !exclusive("exclusiveMinimum"), ">="),
            ("minimum", exclusive("exclusiveMinimum"), ">"),
            ("maximum", !exclusive("exclusiveMaximum"), "<="),
            ("maximum", exclusive("exclusiveMaximum"), "<"),
            ("exclusiveMinimum", true, ">"),
            ("exclusiveMaximum", true, "<"),
        ];
        for (keyword, applies, comparison) in checks {
            let Some(limit) = schema.get(keyword).filter(|_| applies) else {
                continue;
            };
            let Some(bound) = limit.as_f64() else {
                continue;
            };
            let ok = match comparison {
                ">=" => number >= bound,
                ">" => number > bound,
                "<=" => number <= bound,
                _ => number < bound,
            };
            if !ok {
                self.push(errors, path, format!("must be {comparison} {limit}"));
                if self.done(errors) {
                    return;
                }
            }
        }

        if let Some(divisor) = schema.get("multipleOf") {
            if let Some(d) = divisor.as_f64().filter(|d| *d > 0.0) {
                let quotient = number / d;
                if (quotient - quotient.round()).abs() > 1e-9 {
                    self.push(errors, path, format!("must be multiple of {divisor}"));
                    if self.done(errors) {
                        return;
                    }
                }
            }
        }

        let in_range = match schema.get("format").and_then(Value::as_str) {
            Some("int32") => value.as_i64().is_some_and(|n| i32::try_from(n).is_ok()),
            Some("int64") => value.as_i64().is_some(),
            _ => true,
        };
        if !in_range {
            let format = schema.get("format").and_then(Value::as_str).unwrap_or_default();
            self.push(errors, path, format!("must match format \"{format}\""));
        }
    }

    fn check_string(&self, schema: &Map<String, Value>, text: &str, path: &str, errors: &mut Vec<ValidationError>) {
        let length = text.chars().count() as u64;
        if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
            if length < min {
                self.push(errors, path, format!("must NOT have fewer than {min} characters"));
            }
        }
        if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
            if length > max {
                self.push(errors, path, format!("must NOT have more than {max} characters"));
            }
        }
        if self.done(errors) {
            return;
        }
        if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
            if let Some(regex) = self.patterns.get(pattern) {
                if !regex.is_match(text) {
                    self.push(errors, path, format!("must match pattern \"{pattern}\""));
                    if self.done(errors) {
                        return;
                    }
                }
            }
        }
        if let Some(format) = schema.get("format").and_then(Value::as_str) {
            if !string_format_matches(format, text) {
                self.push(errors, path, format!("must match format \"{format}\""));
            }
        }
    }

    fn check_array(
        &self,
        schema: &Map<String, Value>,
        items: &[Value],
        path: &str,
        depth: usize,
        errors: &mut Vec<ValidationError>,
    ) {
        let count = items.len() as u64;
        if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
            if count < min {
                self.push(errors, path, format!("must NOT have fewer than {min} items"));
            }
        }
        if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
            if count > max {
                self.push(errors, path, format!("must NOT have more than {max} items"));
            }
        }
        if schema.get("uniqueItems") == Some(&Value::Bool(true)) {
            let duplicate = items
                .iter()
                .enumerate()
                .any(|(i, item)| items[..i].iter().any(|earlier| equal(earlier, item)));
            if duplicate {
                self.push(errors, path, "must NOT have duplicate items");
            }
        }
        if self.done(errors) {
            return;
        }

        if let Some(item_schema) = schema.get("items") {
            for (index, item) in items.iter().enumerate() {
                let item_path = format!("{path}/{index}");
                self.check(item_schema, item, &item_path, depth + 1, errors);
                if self.done(errors) {
                    return;
                }
            }
        }
    }

    fn check_object(
        &self,
        schema: &Map<String, Value>,
        object: &Map<String, Value>,
        path: &str,
        depth: usize,
        errors: &mut Vec<ValidationError>,
    ) {
        for required in schema.get("required").and_then(Value::as_array).into_iter().flatten() {
            let Some(name) = required.as_str() else {
                continue;
            };
            if !object.contains_key(name) {
                self.push(errors, path, format!("must have required property '{name}'"));
                if self.done(errors) {
                    return;
                }
            }
        }

        let count = object.len() as u64;
        if let Some(min) = schema.get("minProperties").and_then(Value::as_u64) {
            if count < min {
                self.push(errors, path, format!("must NOT have fewer than {min} properties"));
            }
        }
        if let Some(max) = schema.get("maxProperties").and_then(Value::as_u64) {
            if count > max {
                self.push(errors, path, format!("must NOT have more than {max} properties"));
            }
        }
        if self.done(errors) {
            return;
        }

        let properties = schema.get("properties").and_then(Value::as_object);
        let additional = schema.get("additionalProperties");
        for (key, member) in object {
            let member_path = format!("{path}/{}", pointer::escape(key));
            match (properties.and_then(|p| p.get(key)), additional) {
                (Some(property), _) => self.check(property, member, &member_path, depth + 1, errors),
                (None, Some(Value::Bool(false))) => {
                    self.push(errors, &member_path, "must NOT have additional properties");
                }
                (None, Some(extra @ Value::Object(_))) => {
                    self.check(extra, member, &member_path, depth + 1, errors);
                }
                (None, _) => {}
            }
            if self.done(errors) {
                return;
            }
        }
    }

    fn check_combinators(
        &self,
        schema: &Map<String, Value>,
        value: &Value,
        path: &str,
        depth: usize,
        errors: &mut Vec<ValidationError>,
    ) {
        for subschema in schema.get("allOf").and_then(Value::as_array).into_iter().flatten() {
            self.check(subschema, value, path, depth + 1, errors);
            if self.done(errors) {
                return;
            }
        }
        if let Some(any_of) = schema.get("anyOf").and_then(Value::as_array) {
            if !any_of.iter().any(|s| self.accepts(s, value, path, depth + 1)) {
                self.push(errors, path, "must match a schema in anyOf");
                if self.done(errors) {
                    return;
                }
            }
        }
        if let Some(one_of) = schema.get("oneOf").and_then(Value::as_array) {
            let matching = one_of
                .iter()
                .filter(|s| self.accepts(s, value, path, depth + 1))
                .count();
            if matching != 1 {
                self.push(errors, path, "must match exactly one schema in oneOf");
                if self.done(errors) {
                    return;
                }
            }
        }
        if let Some(not) = schema.get("not") {
            if self.accepts(not, value, path, depth + 1) {
                self.push(errors, path, "must NOT be valid");
            }
        }
    }
}

impl ValidatorFunction for SchemaValidator {
    fn validate(&self, value: &Value) -> Option<Vec<ValidationError>> {
        let mut errors = Vec::new();
        self.check(&self.schema, value, "", 0, &mut errors);
        into_errors(errors)
    }
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("schema", &self.schema)
            .field("target", &self.target)
            .field("all_errors", &self.all_errors)
            .finish_non_exhaustive()
    }
}

fn type_matches(types: &Value, value: &Value) -> bool {
    match types {
        Value::String(name) => is_type(name, value),
        Value::Array(names) => names.iter().filter_map(Value::as_str).any(|name| is_type(name, value)),
        _ => true,
    }
}

fn type_names(types: &Value) -> String {
    match types {
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        Value::String(name) => name.clone(),
        other => other.to_string(),
    }
}

fn is_type(name: &str, value: &Value) -> bool {
    match name {
        "null" => value.is_null(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => {
            value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|n| n.is_finite() && n.fract() == 0.0)
        }
        _ => true,
    }
}

/// JSON equality where `1` and `1.0` are the same number. Integers are
/// compared exactly.
fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (as_integer(x), as_integer(y)) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
                _ => x == y,
            },
        },
        (Value::Array(x), Value::Array(y)) => x.len() == y.len() && x.iter().zip(y).all(|(x, y)| equal(x, y)),
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len() && x.iter().all(|(key, x)| y.get(key).is_some_and(|y| equal(x, y)))
        }
        _ => a == b,
    }
}

fn as_integer(number: &Number) -> Option<i128> {
    number
        .as_i64()
        .map(i128::from)
        .or_else(|| number.as_u64().map(i128::from))
}

/// String formats. Unknown formats always match.
fn string_format_matches(format: &str, text: &str) -> bool {
    match format {
        "uuid" => text.len() == 36 && Uuid::parse_str(text).is_ok(),
        "date" => is_date(text),
        "date-time" => is_date_time(text),
        "email" => text
            .split_once('@')
            .is_some_and(|(local, domain)| {
                !local.is_empty() && !domain.is_empty() && !text.contains(char::is_whitespace) && !domain.contains('@')
            }),
        _ => true,
    }
}

/// `YYYY-MM-DD`, a real calendar day.
fn is_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
}

/// RFC 3339 `date-time` with a `T` separator.
fn is_date_time(text: &str) -> bool {
    text.get(..10).is_some_and(is_date)
        && matches!(text.as_bytes().get(10), Some(b'T' | b't'))
        && DateTime::parse_from_rfc3339(text).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use delphi_core::ErrorSource;
    use serde_json::json;

    fn validator(schema: Value, all_errors: bool) -> Arc<dyn ValidatorFunction> {
        validator_in(schema, json!({}), all_errors)
    }

    fn validator_in(schema: Value, root: Value, all_errors: bool) -> Arc<dyn ValidatorFunction> {
        SchemaValidatorFactory::new(all_errors)
            .compile(
                &schema,
                &Arc::new(root),
                ValidationTarget::new(ErrorSource::Request, "body", "/schema"),
            )
            .unwrap()
    }

    fn messages(validator: &Arc<dyn ValidatorFunction>, value: Value) -> Vec<String> {
        validator
            .validate(&value)
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.message)
            .collect()
    }

    #[test]
    fn test_types() {
        let v = validator(json!({"type": "integer"}), false);
        assert!(v.validate(&json!(5)).is_none());
        assert!(v.validate(&json!(5.0)).is_none());
        assert_eq!(messages(&v, json!(5.5)), vec!["must be integer"]);
        assert_eq!(messages(&v, json!("5")), vec!["must be integer"]);

        let v = validator(json!({"type": ["string", "null"]}), false);
        assert!(v.validate(&Value::Null).is_none());
        assert_eq!(messages(&v, json!(1)), vec!["must be string or null"]);

        let v = validator(json!({"type": "string", "nullable": true}), false);
        assert!(v.validate(&Value::Null).is_none());
    }

    #[test]
    fn test_numbers() {
        let v = validator(json!({"type": "number", "minimum": 1, "maximum": 10, "multipleOf": 0.5}), true);
        assert!(v.validate(&json!(2.5)).is_none());
        assert_eq!(messages(&v, json!(0)), vec!["must be >= 1"]);
        assert_eq!(messages(&v, json!(10.25)), vec!["must be <= 10", "must be multiple of 0.5"]);

        let v = validator(json!({"minimum": 1, "exclusiveMinimum": true}), false);
        assert_eq!(messages(&v, json!(1)), vec!["must be > 1"]);

        let v = validator(json!({"exclusiveMaximum": 5}), false);
        assert_eq!(messages(&v, json!(5)), vec!["must be < 5"]);
        assert!(v.validate(&json!(4)).is_none());

        let v = validator(json!({"type": "integer", "format": "int32"}), false);
        assert_eq!(messages(&v, json!(4_294_967_296_i64)), vec!["must match format \"int32\""]);
    }

    #[test]
    fn test_strings() {
        let v = validator(json!({"type": "string", "minLength": 2, "maxLength": 4, "pattern": "^[a-z]+$"}), true);
        assert!(v.validate(&json!("abc")).is_none());
        assert_eq!(
            messages(&v, json!("A")),
            vec!["must NOT have fewer than 2 characters", "must match pattern \"^[a-z]+$\""]
        );

        let v = validator(json!({"type": "string", "format": "uuid"}), false);
        assert!(v.validate(&json!("550e8400-e29b-41d4-a716-446655440000")).is_none());
        assert_eq!(messages(&v, json!("nope")), vec!["must match format \"uuid\""]);
    }

    #[test]
    fn test_formats() {
        assert!(is_date("2024-02-29"));
        assert!(!is_date("2024-13-01"));
        assert!(!is_date("24-01-01"));
        assert!(is_date_time("2024-02-29T10:20:30Z"));
        assert!(is_date_time("2024-02-29T10:20:30.123+02:00"));
        assert!(!is_date_time("2024-02-29T25:20:30Z"));
        assert!(!is_date_time("2024-02-29 10:20:30Z"));
        assert!(!is_date("2023-02-29"));
        assert!(!is_date("20231-1-01"));
        assert!(!is_date_time("2024-02-29T10:20:30"));
        assert!(string_format_matches("email", "rex@example.com"));
        assert!(!string_format_matches("email", "rex.example.com"));
        assert!(string_format_matches("unknown-format", "anything"));
    }

    #[test]
    fn test_calendar_invalid_dates_are_rejected() {
        let v = validator(json!({"type": "string", "format": "date"}), false);
        assert!(v.validate(&json!("2023-02-28")).is_none());
        assert_eq!(messages(&v, json!("2023-02-30")), vec!["must match format \"date\""]);
        assert!(v.validate(&json!("2023-04-31")).is_some());

        let v = validator(json!({"type": "string", "format": "date-time"}), false);
        assert!(v.validate(&json!("2023-02-28T10:00:00Z")).is_none());
        assert!(v.validate(&json!("2023-02-31T10:00:00Z")).is_some());
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        let v = validator(json!({"enum": [9_007_199_254_740_993_u64]}), false);
        assert!(v.validate(&json!(9_007_199_254_740_993_u64)).is_none());
        assert!(v.validate(&json!(9_007_199_254_740_992_u64)).is_some());

        let v = validator(json!({"type": "array", "uniqueItems": true}), false);
        assert!(v.validate(&json!([9_007_199_254_740_992_i64, 9_007_199_254_740_993_i64])).is_none());
        assert!(v.validate(&json!([-1, 18_446_744_073_709_551_615_u64])).is_none());
    }

    #[test]
    fn test_nesting_limit_is_reported() {
        let root = json!({"components": {"schemas": {"Loop": {"$ref": "#/components/schemas/Loop"}}}});
        let v = validator_in(json!({"$ref": "#/components/schemas/Loop"}), root, false);
        assert_eq!(messages(&v, json!(1)), vec!["schema nesting too deep"]);
    }

    #[test]
    fn test_objects() {
        let v = validator(
            json!({
                "type": "object",
                "required": ["name"],
                "properties": {"name": {"type": "string"}, "age": {"type": "integer"}},
                "additionalProperties": false
            }),
            true,
        );
        assert!(v.validate(&json!({"name": "Rex"})).is_none());

        let errors = v.validate(&json!({"age": "old", "color": "brown"})).unwrap();
        let found: Vec<_> = errors
            .iter()
            .map(|e| (e.location.as_ref().unwrap().path.as_str(), e.message.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("", "must have required property 'name'"),
                ("/age", "must be integer"),
                ("/color", "must NOT have additional properties"),
            ]
        );
    }

    #[test]
    fn test_first_error_only_by_default() {
        let v = validator(json!({"type": "object", "required": ["a", "b"]}), false);
        assert_eq!(messages(&v, json!({})), vec!["must have required property 'a'"]);
    }

    #[test]
    fn test_arrays() {
        let v = validator(
            json!({"type": "array", "items": {"type": "integer"}, "minItems": 1, "uniqueItems": true}),
            true,
        );
        assert!(v.validate(&json!([1, 2])).is_none());
        assert_eq!(messages(&v, json!([])), vec!["must NOT have fewer than 1 items"]);
        assert_eq!(messages(&v, json!([1, 1.0])), vec!["must NOT have duplicate items"]);

        let errors = v.validate(&json!([1, "x"])).unwrap();
        assert_eq!(errors[0].location.as_ref().unwrap().path, "/1");
    }

    #[test]
    fn test_enum_and_const() {
        let v = validator(json!({"enum": ["eu", "us"]}), false);
        assert!(v.validate(&json!("eu")).is_none());
        assert_eq!(messages(&v, json!("ap")), vec!["must be equal to one of the allowed values"]);

        let v = validator(json!({"const": 3}), false);
        assert!(v.validate(&json!(3.0)).is_none());
        assert_eq!(messages(&v, json!(4)), vec!["must be equal to constant"]);
    }

    #[test]
    fn test_combinators() {
        let v = validator(json!({"anyOf": [{"type": "string"}, {"type": "integer"}]}), false);
        assert!(v.validate(&json!(1)).is_none());
        assert_eq!(messages(&v, json!(true)), vec!["must match a schema in anyOf"]);

        let v = validator(json!({"oneOf": [{"type": "integer"}, {"type": "number"}]}), false);
        assert!(v.validate(&json!(1.5)).is_none());
        assert_eq!(messages(&v, json!(1)), vec!["must match exactly one schema in oneOf"]);

        let v = validator(json!({"allOf": [{"type": "integer"}, {"minimum": 3}]}), false);
        assert_eq!(messages(&v, json!(2)), vec!["must be >= 3"]);

        let v = validator(json!({"not": {"type": "string"}}), false);
        assert_eq!(messages(&v, json!("x")), vec!["must NOT be valid"]);
    }

    #[test]
    fn test_references() {
        let root = json!({"components": {"schemas": {
            "Pet": {"type": "object", "required": ["name"], "properties": {"tag": {"$ref": "#/components/schemas/Tag"}}},
            "Tag": {"type": "string", "pattern": "^[a-z]+$"},
            "Node": {"type": "object", "properties": {"next": {"$ref": "#/components/schemas/Node"}}}
        }}});
        let v = validator_in(json!({"$ref": "#/components/schemas/Pet"}), root.clone(), true);
        assert!(v.validate(&json!({"name": "Rex", "tag": "good"})).is_none());
        assert_eq!(messages(&v, json!({"name": "Rex", "tag": "BAD"})), vec!["must match pattern \"^[a-z]+$\""]);

        let v = validator_in(json!({"$ref": "#/components/schemas/Node"}), root, true);
        assert!(v.validate(&json!({"next": {"next": {}}})).is_none());
        assert_eq!(messages(&v, json!({"next": 1})), vec!["must be object"]);
    }

    #[test]
    fn test_compile_errors() {
        let factory = SchemaValidatorFactory::default();
        let target = ValidationTarget::new(ErrorSource::Query, "q", "/p/0/schema");

        let err = factory
            .compile(&json!({"$ref": "#/missing"}), &Arc::new(json!({})), target.clone())
            .err().unwrap();
        assert!(matches!(err, DelphiError::InvalidDocument { pointer: Some(ref p), .. } if p == "/p/0/schema"));

        let err = factory
            .compile(&json!({"pattern": "(unclosed"}), &Arc::new(json!({})), target)
            .err().unwrap();
        assert!(err.to_string().contains("invalid pattern"));
    }

    #[test]
    fn test_errors_carry_target() {
        let v = validator(json!({"type": "string"}), false);
        let error = &v.validate(&json!(1)).unwrap()[0];
        let location = error.location.as_ref().unwrap();
        assert_eq!(location.source, ErrorSource::Request);
        assert_eq!(location.name, "body");
        assert_eq!(location.doc_path, "/schema");
    }
}

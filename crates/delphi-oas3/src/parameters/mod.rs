//! Parameter declarations.
//!
//! Every parameter an operation accepts, including server variables, is
//! compiled once into a [`ParameterDeclaration`]: location, effective style
//! and explode flag, the value shape inferred from its schema and a compiled
//! validator. The [`ParameterExtractor`] reads request values against these
//! declarations.

mod extractor;
mod style;

use std::fmt;
use std::sync::Arc;

use delphi_core::{
    pointer, DelphiError, DelphiResult, ErrorSource, ParameterLocation, ValidationTarget,
    ValidatorFactory, ValidatorFunction,
};
use indexmap::IndexMap;
use serde_json::{json, Number, Value};
use tracing::warn;

use crate::document::{ApiDocument, Parameter, ParameterIn, ParameterStyle, ServerVariable};

pub use extractor::{ParameterExtractor, RequestSources};

/// Deepest `allOf` nesting followed when inferring a value shape.
const MAX_SHAPE_DEPTH: usize = 8;

/// Primitive type raw strings are coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Coercion {
    /// Keep the string.
    #[default]
    String,
    /// Parse as an integer.
    Integer,
    /// Parse as a number.
    Number,
    /// Parse `true` / `false`.
    Boolean,
}

impl Coercion {
    fn from_type(schema_type: Option<&str>) -> Self {
        match schema_type {
            Some("integer") => Self::Integer,
            Some("number") => Self::Number,
            Some("boolean") => Self::Boolean,
            _ => Self::String,
        }
    }

    fn from_schema(schema: Option<&Value>, document: &ApiDocument) -> Self {
        let schema = schema.and_then(|schema| document.deref_value(schema, "").ok().map(|(node, _)| node));
        Self::from_type(schema.and_then(schema_type))
    }

    /// Converts a raw string. Values that do not parse stay strings so
    /// validation can report the mismatch.
    ///
    /// ```rust
    /// use delphi_oas3::parameters::Coercion;
    /// use serde_json::json;
    ///
    /// assert_eq!(Coercion::Integer.apply("42".to_string()), json!(42));
    /// assert_eq!(Coercion::Integer.apply("4.2".to_string()), json!("4.2"));
    /// assert_eq!(Coercion::Number.apply("4.5".to_string()), json!(4.5));
    /// assert_eq!(Coercion::Boolean.apply("true".to_string()), json!(true));
    /// ```
    #[must_use]
    pub fn apply(self, raw: String) -> Value {
        match self {
            Self::String => Value::String(raw),
            Self::Integer => match raw.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::String(raw),
            },
            Self::Number => {
                if let Ok(n) = raw.parse::<i64>() {
                    return Value::from(n);
                }
                match raw.parse::<f64>().ok().and_then(Number::from_f64) {
                    Some(n) => Value::Number(n),
                    None => Value::String(raw),
                }
            }
            Self::Boolean => match raw.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::String(raw),
            },
        }
    }
}

/// Shape of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueShape {
    /// A single scalar.
    #[default]
    Primitive,
    /// A list of scalars.
    Array,
    /// A map of scalars.
    Object,
}

/// What a parameter value looks like, as far as deserialization cares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueModel {
    shape: ValueShape,
    leaf: Coercion,
    properties: IndexMap<String, Coercion>,
    additional: Coercion,
}

impl ValueModel {
    /// Infers the model of a (possibly referenced) schema.
    pub(crate) fn infer(schema: Option<&Value>, document: &ApiDocument) -> Self {
        let mut model = Self::default();
        if let Some(schema) = schema {
            model.read(schema, document, 0);
        }
        model
    }

    fn read(&mut self, schema: &Value, document: &ApiDocument, depth: usize) {
        let Ok((schema, _)) = document.deref_value(schema, "") else {
            return;
        };
        match schema_type(schema) {
            Some("array") => self.read_array(schema, document),
            Some("object") => self.read_object(schema, document),
            Some(primitive) => self.leaf = Coercion::from_type(Some(primitive)),
            None if schema.get("items").is_some() => self.read_array(schema, document),
            None if schema.get("properties").is_some() || schema.get("additionalProperties").is_some() => {
                self.read_object(schema, document);
            }
            None => {
                let first = schema.get("allOf").and_then(Value::as_array).and_then(|all| all.first());
                if let (Some(first), true) = (first, depth < MAX_SHAPE_DEPTH) {
                    self.read(first, document, depth + 1);
                }
            }
        }
    }

    fn read_array(&mut self, schema: &Value, document: &ApiDocument) {
        self.shape = ValueShape::Array;
        self.leaf = Coercion::from_schema(schema.get("items"), document);
    }

    fn read_object(&mut self, schema: &Value, document: &ApiDocument) {
        self.shape = ValueShape::Object;
        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            self.properties = properties
                .iter()
                .map(|(name, property)| (name.clone(), Coercion::from_schema(Some(property), document)))
                .collect();
        }
        if let Some(additional) = schema.get("additionalProperties").filter(|a| a.is_object()) {
            self.additional = Coercion::from_schema(Some(additional), document);
        }
    }

    /// The value shape.
    #[must_use]
    pub const fn shape(&self) -> ValueShape {
        self.shape
    }

    /// Coercion of primitive values and array items.
    #[must_use]
    pub const fn leaf(&self) -> Coercion {
        self.leaf
    }

    /// Coercion of one object property.
    #[must_use]
    pub fn property(&self, name: &str) -> Coercion {
        self.properties.get(name).copied().unwrap_or(self.additional)
    }

    /// Declared object property names, in schema order.
    pub fn declared_properties(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }
}

/// `type` of a schema node; for type arrays, the first non-null entry.
fn schema_type(schema: &Value) -> Option<&str> {
    match schema.get("type")? {
        Value::String(t) => Some(t.as_str()),
        Value::Array(types) => types.iter().filter_map(Value::as_str).find(|t| *t != "null"),
        _ => None,
    }
}

/// A compiled parameter declaration.
#[derive(Clone)]
pub struct ParameterDeclaration {
    location: ParameterLocation,
    name: String,
    required: bool,
    style: ParameterStyle,
    explode: bool,
    model: ValueModel,
    json_content: bool,
    doc_path: String,
    validator: Option<Arc<dyn ValidatorFunction>>,
}

impl ParameterDeclaration {
    /// Compiles a parameter declared at `doc_path`.
    ///
    /// # Errors
    ///
    /// Fails if the style is not allowed for the location, the parameter
    /// has neither `schema` nor `content`, or its schema does not compile.
    pub fn compile(
        parameter: &Parameter,
        doc_path: &str,
        document: &ApiDocument,
        factory: &dyn ValidatorFactory,
    ) -> DelphiResult<Self> {
        let location = match parameter.location {
            ParameterIn::Query => ParameterLocation::Query,
            ParameterIn::Header => ParameterLocation::Header,
            ParameterIn::Path => ParameterLocation::Path,
            ParameterIn::Cookie => ParameterLocation::Cookie,
        };

        let style = parameter.style.unwrap_or_else(|| default_style(location));
        if !allowed_styles(location).contains(&style) {
            return Err(DelphiError::invalid_document_at(
                format!(
                    "style '{}' is not allowed for {location} parameter '{}'",
                    style.as_str(),
                    parameter.name
                ),
                doc_path,
            ));
        }

        let (schema, schema_path, json_content) = match (&parameter.schema, &parameter.content) {
            (Some(schema), _) => (schema, pointer::join(doc_path, &["schema"]), false),
            (None, Some(content)) => {
                let (media_type, declared) = content.first().ok_or_else(|| {
                    DelphiError::invalid_document_at("parameter content is empty", doc_path)
                })?;
                let schema = declared.schema.as_ref().ok_or_else(|| {
                    DelphiError::invalid_document_at("parameter content has no schema", doc_path)
                })?;
                let path = pointer::join(doc_path, &["content", media_type, "schema"]);
                (schema, path, is_json(media_type))
            }
            (None, None) => {
                return Err(DelphiError::invalid_document_at(
                    format!("parameter '{}' has neither schema nor content", parameter.name),
                    doc_path,
                ));
            }
        };

        let required = if location == ParameterLocation::Path && !parameter.required {
            warn!(parameter = %parameter.name, doc_path, "path parameter not marked required; treating as required");
            true
        } else {
            parameter.required
        };

        let target = ValidationTarget::new(ErrorSource::from(location), &parameter.name, schema_path);
        let validator = factory.compile(schema, document.raw(), target)?;

        Ok(Self {
            location,
            name: parameter.name.clone(),
            required,
            style,
            explode: parameter.explode.unwrap_or(style == ParameterStyle::Form),
            model: ValueModel::infer(Some(schema), document),
            json_content,
            doc_path: doc_path.to_string(),
            validator: Some(validator),
        })
    }

    /// Compiles a server variable as a required string parameter,
    /// restricted to the variable's `enum` when one is declared.
    ///
    /// # Errors
    ///
    /// Fails if the generated schema does not compile.
    pub fn server_variable(
        name: &str,
        variable: &ServerVariable,
        doc_path: &str,
        document: &ApiDocument,
        factory: &dyn ValidatorFactory,
    ) -> DelphiResult<Self> {
        let schema = if variable.enum_values.is_empty() {
            json!({ "type": "string" })
        } else {
            json!({ "type": "string", "enum": variable.enum_values })
        };
        let target = ValidationTarget::new(ErrorSource::Server, name, doc_path);
        let validator = factory.compile(&schema, document.raw(), target)?;

        Ok(Self {
            location: ParameterLocation::Server,
            name: name.to_string(),
            required: true,
            style: ParameterStyle::Simple,
            explode: false,
            model: ValueModel::default(),
            json_content: false,
            doc_path: doc_path.to_string(),
            validator: Some(validator),
        })
    }

    /// Where the parameter is read from.
    #[must_use]
    pub const fn location(&self) -> ParameterLocation {
        self.location
    }

    /// The parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the parameter must be present.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// The effective serialization style.
    #[must_use]
    pub const fn style(&self) -> ParameterStyle {
        self.style
    }

    /// The effective explode flag.
    #[must_use]
    pub const fn explode(&self) -> bool {
        self.explode
    }

    /// The inferred value model.
    #[must_use]
    pub const fn model(&self) -> &ValueModel {
        &self.model
    }

    /// Whether the value is sent as JSON (`content: application/json`).
    #[must_use]
    pub const fn is_json_content(&self) -> bool {
        self.json_content
    }

    /// JSON pointer to the declaration.
    #[must_use]
    pub fn doc_path(&self) -> &str {
        &self.doc_path
    }

    /// The compiled schema validator.
    #[must_use]
    pub fn validator(&self) -> Option<&Arc<dyn ValidatorFunction>> {
        self.validator.as_ref()
    }

    /// Returns true if this declaration has the given location and name.
    /// Header names compare case-insensitively.
    #[must_use]
    pub fn is(&self, location: ParameterLocation, name: &str) -> bool {
        self.location == location
            && if location == ParameterLocation::Header {
                self.name.eq_ignore_ascii_case(name)
            } else {
                self.name == name
            }
    }
}

impl fmt::Debug for ParameterDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterDeclaration")
            .field("location", &self.location)
            .field("name", &self.name)
            .field("required", &self.required)
            .field("style", &self.style)
            .field("explode", &self.explode)
            .field("model", &self.model)
            .field("json_content", &self.json_content)
            .field("doc_path", &self.doc_path)
            .finish_non_exhaustive()
    }
}

/// Default style of a location.
#[must_use]
pub const fn default_style(location: ParameterLocation) -> ParameterStyle {
    match location {
        ParameterLocation::Query | ParameterLocation::Cookie => ParameterStyle::Form,
        ParameterLocation::Header | ParameterLocation::Server | ParameterLocation::Path => {
            ParameterStyle::Simple
        }
    }
}

/// Styles a location accepts.
#[must_use]
pub const fn allowed_styles(location: ParameterLocation) -> &'static [ParameterStyle] {
    match location {
        ParameterLocation::Path => &[ParameterStyle::Simple, ParameterStyle::Label, ParameterStyle::Matrix],
        ParameterLocation::Query => &[
            ParameterStyle::Form,
            ParameterStyle::SpaceDelimited,
            ParameterStyle::PipeDelimited,
            ParameterStyle::DeepObject,
        ],
        ParameterLocation::Header | ParameterLocation::Server => &[ParameterStyle::Simple],
        ParameterLocation::Cookie => &[ParameterStyle::Form],
    }
}

fn is_json(media_type: &str) -> bool {
    delphi_core::media_type::parse(media_type).is_some_and(|mime| {
        mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON)
    })
}

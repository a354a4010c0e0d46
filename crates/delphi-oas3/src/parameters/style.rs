//! Style-specific deserialization of raw parameter strings.
//!
//! Raw values are split on their style's delimiters first and decoded
//! afterwards, so encoded delimiters (`%2C`) stay part of a value.

use delphi_core::{DelphiError, DelphiResult};
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};

use super::{ParameterDeclaration, ValueShape};

/// How raw components are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Decoder {
    /// Headers and server variables: taken as they are.
    Verbatim,
    /// Path and cookie values.
    Percent,
    /// Query strings: `+` is a space.
    Form,
}

impl Decoder {
    pub(super) fn decode(self, raw: &str) -> String {
        match self {
            Self::Verbatim => raw.to_string(),
            Self::Percent => percent_decode_str(raw).decode_utf8_lossy().into_owned(),
            Self::Form => percent_decode_str(&raw.replace('+', " "))
                .decode_utf8_lossy()
                .into_owned(),
        }
    }
}

/// How object members are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ObjectLayout {
    /// `R,100,G,200`
    Pairs,
    /// `R=100,G=200`
    Assignments,
}

impl ObjectLayout {
    pub(super) const fn for_explode(explode: bool) -> Self {
        if explode {
            Self::Assignments
        } else {
            Self::Pairs
        }
    }
}

/// A single scalar.
pub(super) fn primitive(declaration: &ParameterDeclaration, raw: &str, decoder: Decoder) -> Value {
    declaration.model().leaf().apply(decoder.decode(raw))
}

/// A value sent as JSON text; kept as a string when it does not parse.
pub(super) fn json(raw: &str, decoder: Decoder) -> Value {
    let decoded = decoder.decode(raw);
    serde_json::from_str(&decoded).unwrap_or(Value::String(decoded))
}

/// A list of scalars.
pub(super) fn array<'a>(
    declaration: &ParameterDeclaration,
    components: impl IntoIterator<Item = &'a str>,
    decoder: Decoder,
) -> Value {
    let leaf = declaration.model().leaf();
    Value::Array(
        components
            .into_iter()
            .map(|component| leaf.apply(decoder.decode(component)))
            .collect(),
    )
}

/// A map of scalars.
pub(super) fn object<'a>(
    declaration: &ParameterDeclaration,
    components: impl IntoIterator<Item = &'a str>,
    layout: ObjectLayout,
    decoder: Decoder,
) -> DelphiResult<Value> {
    let model = declaration.model();
    let mut object = Map::new();
    match layout {
        ObjectLayout::Pairs => {
            let components: Vec<&str> = components.into_iter().collect();
            if components.len() % 2 != 0 {
                return Err(malformed(
                    declaration,
                    format!(
                        "expected key/value pairs, got an odd number of components ({})",
                        components.len()
                    ),
                ));
            }
            for pair in components.chunks_exact(2) {
                let key = decoder.decode(pair[0]);
                let value = model.property(&key).apply(decoder.decode(pair[1]));
                object.insert(key, value);
            }
        }
        ObjectLayout::Assignments => {
            for component in components {
                let (key, value) = component.split_once('=').ok_or_else(|| {
                    malformed(declaration, format!("component '{component}' is not a key=value pair"))
                })?;
                let key = decoder.decode(key);
                let value = model.property(&key).apply(decoder.decode(value));
                object.insert(key, value);
            }
        }
    }
    Ok(Value::Object(object))
}

/// A value whose array items or object members are separated by
/// `delimiter`.
pub(super) fn delimited(
    declaration: &ParameterDeclaration,
    raw: &str,
    delimiter: char,
    layout: ObjectLayout,
    decoder: Decoder,
) -> DelphiResult<Value> {
    match declaration.model().shape() {
        ValueShape::Primitive => Ok(primitive(declaration, raw, decoder)),
        ValueShape::Array => Ok(array(declaration, split(raw, delimiter), decoder)),
        ValueShape::Object => object(declaration, split(raw, delimiter), layout, decoder),
    }
}

/// `simple` style: `3,4,5`, `R,100,G,200`, `R=100,G=200`.
pub(super) fn simple(declaration: &ParameterDeclaration, raw: &str, decoder: Decoder) -> DelphiResult<Value> {
    let layout = ObjectLayout::for_explode(declaration.explode());
    delimited(declaration, raw, ',', layout, decoder)
}

/// `label` style: `.5`, `.3,4,5`, `.3.4.5`, `.R=100.G=200`.
pub(super) fn label(declaration: &ParameterDeclaration, raw: &str, decoder: Decoder) -> DelphiResult<Value> {
    let Some(rest) = raw.strip_prefix('.') else {
        return Ok(Value::String(decoder.decode(raw)));
    };
    let delimiter = if declaration.explode() { '.' } else { ',' };
    let layout = ObjectLayout::for_explode(declaration.explode());
    delimited(declaration, rest, delimiter, layout, decoder)
}

/// `matrix` style: `;id=5`, `;id=3,4,5`, `;id=3;id=4;id=5`, `;R=100;G=200`.
pub(super) fn matrix(declaration: &ParameterDeclaration, raw: &str, decoder: Decoder) -> DelphiResult<Value> {
    let kept = || Ok(Value::String(decoder.decode(raw)));
    let name = declaration.name();

    match (declaration.model().shape(), declaration.explode()) {
        (ValueShape::Object, true) => match raw.strip_prefix(';') {
            Some(rest) => object(declaration, split(rest, ';'), ObjectLayout::Assignments, decoder),
            None => kept(),
        },
        (ValueShape::Array, true) => {
            let Some(rest) = raw.strip_prefix(';') else {
                return kept();
            };
            let mut items = Vec::new();
            for component in split(rest, ';') {
                match assignment(component, name) {
                    Some(item) => items.push(item),
                    None => return kept(),
                }
            }
            Ok(array(declaration, items, decoder))
        }
        _ => match raw.strip_prefix(';').and_then(|rest| assignment(rest, name)) {
            Some(value) => delimited(declaration, value, ',', ObjectLayout::Pairs, decoder),
            None => kept(),
        },
    }
}

/// Value of `name=value` (or `name` alone, meaning empty).
fn assignment<'a>(component: &'a str, name: &str) -> Option<&'a str> {
    let rest = component.strip_prefix(name)?;
    if rest.is_empty() {
        Some("")
    } else {
        rest.strip_prefix('=')
    }
}

/// Splits on `delimiter`; an empty string has no components.
pub(super) fn split(raw: &str, delimiter: char) -> Vec<&str> {
    if raw.is_empty() {
        Vec::new()
    } else {
        raw.split(delimiter).collect()
    }
}

fn malformed(declaration: &ParameterDeclaration, reason: String) -> DelphiError {
    DelphiError::malformed_parameter(declaration.location(), declaration.name(), reason)
}

//! Reading declared parameters from a request.

use std::sync::Arc;

use delphi_core::{
    DelphiResult, ParameterLocation, ParameterParser, ParametersMap, ParsedParameters, ValidationError,
};
use delphi_router::Params;
use http::header::COOKIE;
use http::HeaderMap;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::style::{self, Decoder, ObjectLayout};
use super::{ParameterDeclaration, ValueShape};
use crate::document::ParameterStyle;
use crate::validation::ParameterValidator;

/// The raw parts of one request that parameters are read from.
///
/// Nothing is decoded until [`ParameterExtractor::extract`] runs.
#[derive(Debug, Clone, Default)]
pub struct RequestSources {
    query: Option<String>,
    headers: HeaderMap,
    path: Params,
    server: ParametersMap<String>,
}

impl RequestSources {
    /// Captures the request parts.
    #[must_use]
    pub fn new(
        query: Option<&str>,
        headers: HeaderMap,
        path: Params,
        server: ParametersMap<String>,
    ) -> Self {
        Self {
            query: query.map(str::to_string),
            headers,
            path,
            server,
        }
    }

    /// Query pairs in request order: decoded key, raw value.
    fn query_pairs(&self) -> Vec<(String, &str)> {
        let Some(query) = self.query.as_deref() else {
            return Vec::new();
        };
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (Decoder::Form.decode(key), value)
            })
            .collect()
    }

    /// Cookies by name; the first occurrence of a name wins.
    fn cookies(&self) -> IndexMap<&str, &str> {
        let mut cookies = IndexMap::new();
        for header in self.headers.get_all(COOKIE) {
            let Ok(header) = header.to_str() else {
                continue;
            };
            for cookie in header.split(';') {
                if let Some((name, value)) = cookie.trim().split_once('=') {
                    cookies
                        .entry(name.trim())
                        .or_insert_with(|| value.trim().trim_matches('"'));
                }
            }
        }
        cookies
    }

    /// Every value of a header, joined with `,`.
    fn header(&self, name: &str) -> Option<String> {
        let values: Vec<String> = self
            .headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect();
        (!values.is_empty()).then(|| values.join(","))
    }
}

/// Extracts and deserializes the declared parameters of one request.
///
/// Server variables come first, then the operation's parameters. Request
/// values nobody declared are ignored.
pub struct ParameterExtractor {
    server: Arc<[ParameterDeclaration]>,
    operation: Arc<[ParameterDeclaration]>,
    sources: RequestSources,
}

impl ParameterExtractor {
    /// Binds declarations to request sources.
    #[must_use]
    pub fn new(
        server: Arc<[ParameterDeclaration]>,
        operation: Arc<[ParameterDeclaration]>,
        sources: RequestSources,
    ) -> Self {
        Self {
            server,
            operation,
            sources,
        }
    }

    /// Every declaration, server variables first.
    pub fn declarations(&self) -> impl Iterator<Item = &ParameterDeclaration> {
        self.server.iter().chain(self.operation.iter())
    }

    /// Extracts every declared parameter present in the request.
    ///
    /// # Errors
    ///
    /// Returns a malformed parameter error when an object value cannot be
    /// split into key/value pairs.
    pub fn extract(&self) -> DelphiResult<ParsedParameters> {
        let query = self.sources.query_pairs();
        let cookies = self.sources.cookies();

        let mut parsed = ParsedParameters::default();
        for declaration in self.declarations() {
            let value = match declaration.location() {
                ParameterLocation::Query => self.query_value(declaration, &query)?,
                ParameterLocation::Header => self.header_value(declaration)?,
                ParameterLocation::Server => self
                    .sources
                    .server
                    .get(declaration.name())
                    .map(|raw| style::primitive(declaration, raw, Decoder::Verbatim)),
                ParameterLocation::Path => self.path_value(declaration)?,
                ParameterLocation::Cookie => cookie_value(declaration, &cookies)?,
            };
            if let Some(value) = value {
                parsed
                    .get_mut(declaration.location())
                    .insert(declaration.name().to_string(), value);
            }
        }
        Ok(parsed)
    }

    fn query_value(
        &self,
        declaration: &ParameterDeclaration,
        pairs: &[(String, &str)],
    ) -> DelphiResult<Option<Value>> {
        let name = declaration.name();
        let mut values = pairs.iter().filter(|(key, _)| key == name).map(|(_, raw)| *raw);

        if declaration.is_json_content() {
            return Ok(values.next().map(|raw| style::json(raw, Decoder::Form)));
        }

        match (declaration.style(), declaration.model().shape()) {
            (ParameterStyle::DeepObject, _) => Ok(deep_object(declaration, pairs)),
            (_, ValueShape::Primitive) => {
                Ok(values.next().map(|raw| style::primitive(declaration, raw, Decoder::Form)))
            }
            (_, ValueShape::Array) if declaration.explode() => {
                let items: Vec<&str> = values.collect();
                Ok((!items.is_empty()).then(|| style::array(declaration, items, Decoder::Form)))
            }
            (ParameterStyle::Form, ValueShape::Object) if declaration.explode() => {
                Ok(self.exploded_object(declaration, pairs))
            }
            (style, _) => {
                let Some(raw) = values.next() else {
                    return Ok(None);
                };
                let value = match style {
                    ParameterStyle::SpaceDelimited => split_decoded(declaration, raw, ' '),
                    ParameterStyle::PipeDelimited => split_decoded(declaration, raw, '|'),
                    _ => style::delimited(declaration, raw, ',', ObjectLayout::Pairs, Decoder::Form),
                }?;
                Ok(Some(value))
            }
        }
    }

    /// `R=100&G=200`: declared properties, or for free-form objects every
    /// query key no other parameter claims.
    fn exploded_object(&self, declaration: &ParameterDeclaration, pairs: &[(String, &str)]) -> Option<Value> {
        let model = declaration.model();
        let declared: Vec<&str> = model.declared_properties().collect();

        let mut object = Map::new();
        for (key, raw) in pairs {
            let wanted = if declared.is_empty() {
                !self.is_claimed_query_key(key)
            } else {
                declared.contains(&key.as_str())
            };
            if wanted && !object.contains_key(key) {
                object.insert(key.clone(), model.property(key).apply(Decoder::Form.decode(raw)));
            }
        }
        (!object.is_empty()).then_some(Value::Object(object))
    }

    fn is_claimed_query_key(&self, key: &str) -> bool {
        self.declarations()
            .any(|declaration| declaration.is(ParameterLocation::Query, key))
    }

    fn header_value(&self, declaration: &ParameterDeclaration) -> DelphiResult<Option<Value>> {
        let Some(raw) = self.sources.header(declaration.name()) else {
            return Ok(None);
        };
        if declaration.is_json_content() {
            return Ok(Some(style::json(&raw, Decoder::Verbatim)));
        }
        style::simple(declaration, &raw, Decoder::Verbatim).map(Some)
    }

    fn path_value(&self, declaration: &ParameterDeclaration) -> DelphiResult<Option<Value>> {
        let Some(raw) = self.sources.path.get(declaration.name()) else {
            return Ok(None);
        };
        if declaration.is_json_content() {
            return Ok(Some(style::json(raw, Decoder::Percent)));
        }
        let value = match declaration.style() {
            ParameterStyle::Label => style::label(declaration, raw, Decoder::Percent),
            ParameterStyle::Matrix => style::matrix(declaration, raw, Decoder::Percent),
            _ => style::simple(declaration, raw, Decoder::Percent),
        }?;
        Ok(Some(value))
    }
}

/// Space- and pipe-delimited values: the delimiter may itself be encoded,
/// so the whole value is decoded before splitting.
fn split_decoded(declaration: &ParameterDeclaration, raw: &str, delimiter: char) -> DelphiResult<Value> {
    let decoded = Decoder::Form.decode(raw);
    style::delimited(declaration, &decoded, delimiter, ObjectLayout::Pairs, Decoder::Verbatim)
}

/// `id[R]=100&id[G]=200`.
fn deep_object(declaration: &ParameterDeclaration, pairs: &[(String, &str)]) -> Option<Value> {
    let model = declaration.model();
    let prefix = format!("{}[", declaration.name());

    let mut object = Map::new();
    for (key, raw) in pairs {
        let Some(property) = key.strip_prefix(&prefix).and_then(|rest| rest.strip_suffix(']')) else {
            continue;
        };
        if !object.contains_key(property) {
            object.insert(
                property.to_string(),
                model.property(property).apply(Decoder::Form.decode(raw)),
            );
        }
    }
    (!object.is_empty()).then_some(Value::Object(object))
}

/// Cookies carry `form` values: arrays and objects are comma separated.
fn cookie_value(
    declaration: &ParameterDeclaration,
    cookies: &IndexMap<&str, &str>,
) -> DelphiResult<Option<Value>> {
    let Some(raw) = cookies.get(declaration.name()) else {
        return Ok(None);
    };
    if declaration.is_json_content() {
        return Ok(Some(style::json(raw, Decoder::Percent)));
    }
    style::delimited(declaration, raw, ',', ObjectLayout::Pairs, Decoder::Percent).map(Some)
}

impl ParameterParser for ParameterExtractor {
    fn parse(&self) -> DelphiResult<ParsedParameters> {
        self.extract()
    }

    fn validate(&self, parsed: &ParsedParameters) -> Option<Vec<ValidationError>> {
        ParameterValidator::new(self.declarations()).validate(parsed)
    }
}

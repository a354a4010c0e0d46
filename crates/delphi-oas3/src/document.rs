//! OpenAPI 3.x document model and loading.
//!
//! The typed model covers the parts of a document the resolver reads:
//! servers, paths, operations, parameters and request bodies. Schemas stay
//! untyped [`Value`]s and are handed to the validator factory as they are.
//! The raw document is kept alongside the model so references and JSON
//! pointers can be resolved against it.

use std::path::Path;
use std::sync::Arc;

use delphi_core::{pointer, DelphiError, DelphiResult};
use http::Method;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

/// Longest `$ref` chain followed before giving up.
const MAX_REF_DEPTH: usize = 32;

/// Vendor extensions (`x-*` keys) of an object.
pub type Extensions = IndexMap<String, Value>;

/// Security requirement: scheme name to required scopes.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// Either an inline object or a `$ref` to one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefOr<T> {
    /// A local reference.
    Ref {
        /// The reference, e.g. `#/components/parameters/limit`.
        #[serde(rename = "$ref")]
        reference: String,
    },
    /// An inline object.
    Item(T),
}

/// OpenAPI document root object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApi {
    /// OpenAPI version (`3.0.x` or `3.1.x`).
    pub openapi: String,
    /// API metadata.
    #[serde(default)]
    pub info: Info,
    /// Servers the API is reachable on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// Path templates and their operations, in document order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub paths: IndexMap<String, PathItem>,
    /// Reusable components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    /// Default security requirements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
    /// Vendor extensions.
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// API metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Info {
    /// API title.
    #[serde(default)]
    pub title: String,
    /// API version.
    #[serde(default)]
    pub version: String,
    /// API description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Server information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    /// Server URL template, e.g. `https://{region}.example.com/v1`.
    pub url: String,
    /// Server description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Variables substituted into the URL template.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, ServerVariable>,
}

/// Server variable for URL templating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerVariable {
    /// Default value.
    pub default: String,
    /// Allowed values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[serde(rename = "enum")]
    pub enum_values: Vec<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The operations available on a single path template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    /// Summary for all operations on this path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Description for all operations on this path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// GET operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// PUT operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// POST operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// DELETE operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// OPTIONS operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// HEAD operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    /// PATCH operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    /// TRACE operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
    /// Servers overriding the document servers for this path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// Parameters shared by every operation on this path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<RefOr<Parameter>>,
    /// Vendor extensions.
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// Lowercase method keys recognised in a path item, in the order the
/// OpenAPI specification lists them.
static PATH_ITEM_METHODS: [(&str, Method); 8] = [
    ("get", Method::GET),
    ("put", Method::PUT),
    ("post", Method::POST),
    ("delete", Method::DELETE),
    ("options", Method::OPTIONS),
    ("head", Method::HEAD),
    ("patch", Method::PATCH),
    ("trace", Method::TRACE),
];

impl PathItem {
    /// Returns the operation declared for `method`.
    #[must_use]
    pub fn operation(&self, method: &Method) -> Option<&Operation> {
        match method.as_str() {
            "GET" => self.get.as_ref(),
            "PUT" => self.put.as_ref(),
            "POST" => self.post.as_ref(),
            "DELETE" => self.delete.as_ref(),
            "OPTIONS" => self.options.as_ref(),
            "HEAD" => self.head.as_ref(),
            "PATCH" => self.patch.as_ref(),
            "TRACE" => self.trace.as_ref(),
            _ => None,
        }
    }

    /// Iterates `(key, method, operation)` for every declared operation.
    pub fn operations(&self) -> impl Iterator<Item = (&'static str, &'static Method, &Operation)> + '_ {
        PATH_ITEM_METHODS
            .iter()
            .filter_map(|(key, method)| self.operation(method).map(|op| (*key, method, op)))
    }
}

/// A single API operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operation {
    /// Unique operation identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "operationId")]
    pub operation_id: Option<String>,
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Detailed description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags for grouping.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Operation parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<RefOr<Parameter>>,
    /// Request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "requestBody")]
    pub request_body: Option<RefOr<RequestBody>>,
    /// Responses, kept untyped.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub responses: IndexMap<String, Value>,
    /// Whether deprecated.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    /// Security requirements overriding the document default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
    /// Servers overriding path and document servers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// Vendor extensions.
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// Where a parameter is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterIn {
    /// Query string parameter.
    Query,
    /// Header parameter.
    Header,
    /// Path parameter.
    Path,
    /// Cookie parameter.
    Cookie,
}

/// How a parameter value is serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterStyle {
    /// `;name=value` path style.
    Matrix,
    /// `.value` path style.
    Label,
    /// `name=value` query and cookie style.
    Form,
    /// Comma-separated path and header style.
    Simple,
    /// Space-separated query arrays.
    SpaceDelimited,
    /// Pipe-separated query arrays.
    PipeDelimited,
    /// `name[key]=value` query objects.
    DeepObject,
}

impl ParameterStyle {
    /// The style name as written in documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Matrix => "matrix",
            Self::Label => "label",
            Self::Form => "form",
            Self::Simple => "simple",
            Self::SpaceDelimited => "spaceDelimited",
            Self::PipeDelimited => "pipeDelimited",
            Self::DeepObject => "deepObject",
        }
    }
}

/// An operation parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Parameter location.
    #[serde(rename = "in")]
    pub location: ParameterIn,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether required. Path parameters are always required.
    #[serde(default)]
    pub required: bool,
    /// Whether deprecated.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    /// Serialization style; defaults depend on the location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ParameterStyle>,
    /// Whether arrays and objects are exploded; defaults to `style == form`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explode: Option<bool>,
    /// Whether reserved characters are allowed unencoded.
    #[serde(default, rename = "allowReserved", skip_serializing_if = "std::ops::Not::not")]
    pub allow_reserved: bool,
    /// Parameter schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Media-type keyed alternative to `schema`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// A request body declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestBody {
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether a body must be sent.
    #[serde(default)]
    pub required: bool,
    /// Accepted media types, in document order.
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// Schema and examples for one media type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaType {
    /// Body schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Example value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// Reusable components. Only the parts referenced by the resolver are
/// typed; everything is reachable through the raw document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Components {
    /// Schemas.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, Value>,
    /// Parameters.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Value>,
    /// Request bodies.
    #[serde(default, rename = "requestBodies", skip_serializing_if = "IndexMap::is_empty")]
    pub request_bodies: IndexMap<String, Value>,
    /// Security schemes.
    #[serde(default, rename = "securitySchemes", skip_serializing_if = "IndexMap::is_empty")]
    pub security_schemes: IndexMap<String, Value>,
}

/// A loaded OpenAPI 3.x document.
///
/// # Example
///
/// ```rust
/// use delphi_oas3::ApiDocument;
///
/// let document = ApiDocument::from_yaml(r#"
/// openapi: 3.0.3
/// info: { title: Pets, version: "1" }
/// paths:
///   /pets:
///     get:
///       operationId: listPets
/// "#).unwrap();
///
/// assert_eq!(document.version(), "3.0.3");
/// assert!(document.model().paths.contains_key("/pets"));
/// ```
#[derive(Debug, Clone)]
pub struct ApiDocument {
    model: OpenApi,
    raw: Arc<Value>,
}

impl ApiDocument {
    /// Builds a document from an already parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`DelphiError::UnsupportedVersion`] unless `openapi` is a
    /// `3.x` version, and a JSON error if the value does not fit the model.
    pub fn from_value(raw: Value) -> DelphiResult<Self> {
        let version = raw.get("openapi").and_then(Value::as_str).unwrap_or_default();
        if !version.starts_with("3.") {
            return Err(DelphiError::UnsupportedVersion {
                version: version.to_string(),
            });
        }
        let model: OpenApi = serde_json::from_value(raw.clone())?;
        debug!(
            version = %model.openapi,
            paths = model.paths.len(),
            servers = model.servers.len(),
            "API document parsed"
        );
        Ok(Self {
            model,
            raw: Arc::new(raw),
        })
    }

    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// See [`from_value`](Self::from_value).
    pub fn from_json(json: &str) -> DelphiResult<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Parses a YAML document.
    ///
    /// # Errors
    ///
    /// See [`from_value`](Self::from_value).
    pub fn from_yaml(yaml: &str) -> DelphiResult<Self> {
        let raw: Value = serde_yaml::from_str(yaml)
            .map_err(|e| DelphiError::invalid_document(format!("invalid YAML: {e}")))?;
        Self::from_value(raw)
    }

    /// Loads a document from disk. `.json` files are read as JSON,
    /// everything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, otherwise see
    /// [`from_value`](Self::from_value).
    pub async fn from_file(path: impl AsRef<Path>) -> DelphiResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading API document from file");

        let content = fs::read_to_string(path).await?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// The typed model.
    #[must_use]
    pub const fn model(&self) -> &OpenApi {
        &self.model
    }

    /// The raw document, shared with validators.
    #[must_use]
    pub const fn raw(&self) -> &Arc<Value> {
        &self.raw
    }

    /// The declared OpenAPI version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.model.openapi
    }

    /// Returns true for `3.0.x` documents, whose schemas use `nullable`
    /// and boolean `exclusiveMinimum`/`exclusiveMaximum`.
    #[must_use]
    pub fn is_3_0(&self) -> bool {
        self.model.openapi.starts_with("3.0")
    }

    /// Returns the node at a JSON pointer.
    #[must_use]
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        pointer::resolve(&self.raw, pointer)
    }

    /// Follows `$ref` chains starting at `node`.
    ///
    /// Returns the target node and its pointer; `at` is the pointer of
    /// `node` itself.
    ///
    /// # Errors
    ///
    /// Returns an invalid document error for external, dangling or
    /// circular references.
    pub fn deref_value<'a>(&'a self, node: &'a Value, at: &str) -> DelphiResult<(&'a Value, String)> {
        let mut node = node;
        let mut at = at.to_string();
        for _ in 0..MAX_REF_DEPTH {
            let Some(reference) = node.get("$ref").and_then(Value::as_str) else {
                return Ok((node, at));
            };
            let target = reference.strip_prefix('#').ok_or_else(|| {
                DelphiError::invalid_document_at(
                    format!("external reference '{reference}' is not supported"),
                    at.clone(),
                )
            })?;
            node = pointer::resolve(&self.raw, reference).ok_or_else(|| {
                DelphiError::invalid_document_at(
                    format!("cannot resolve reference '{reference}'"),
                    at.clone(),
                )
            })?;
            at = decode_fragment(target);
        }
        Err(DelphiError::invalid_document_at(
            "reference chain is too long or circular",
            at,
        ))
    }

    /// Resolves a possibly referenced object into its typed form.
    ///
    /// Returns the object and the pointer it actually lives at.
    ///
    /// # Errors
    ///
    /// Returns an error for unresolvable references or targets that do not
    /// fit `T`.
    pub fn resolve<T>(&self, item: &RefOr<T>, at: &str) -> DelphiResult<(T, String)>
    where
        T: DeserializeOwned + Clone,
    {
        match item {
            RefOr::Item(item) => Ok((item.clone(), at.to_string())),
            RefOr::Ref { reference } => {
                let stub = serde_json::json!({ "$ref": reference });
                let (node, target) = self.deref_value(&stub, at)?;
                let item = serde_json::from_value(node.clone()).map_err(|e| {
                    DelphiError::invalid_document_at(format!("invalid referenced object: {e}"), target.clone())
                })?;
                Ok((item, target))
            }
        }
    }

    /// Looks up a vendor extension on the document root.
    #[must_use]
    pub fn extension(&self, name: &str) -> Option<&Value> {
        self.model.extensions.get(name)
    }
}

/// Turns a `#`-stripped reference fragment into a plain JSON pointer.
fn decode_fragment(fragment: &str) -> String {
    percent_encoding::percent_decode_str(fragment)
        .decode_utf8_lossy()
        .into_owned()
}

//! JSON pointer helpers (RFC 6901).
//!
//! Error locations and resolution contexts cite nodes of the API description
//! as JSON pointers. References (`$ref`) use the URI fragment form, which may
//! additionally be percent-encoded.

use percent_encoding::percent_decode_str;
use serde_json::Value;

/// Escapes one reference token (`~` → `~0`, `/` → `~1`).
#[must_use]
pub fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Reverses [`escape`].
#[must_use]
pub fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Appends escaped tokens to a pointer.
///
/// ```rust
/// use delphi_core::pointer;
///
/// let path = pointer::join("/paths", &["/pets/{petId}", "get"]);
/// assert_eq!(path, "/paths/~1pets~1{petId}/get");
/// ```
#[must_use]
pub fn join(base: &str, tokens: &[&str]) -> String {
    let mut pointer = base.to_string();
    for token in tokens {
        pointer.push('/');
        pointer.push_str(&escape(token));
    }
    pointer
}

/// Resolves a pointer or local reference against `root`.
///
/// Accepts `"/a/b"`, `"#/a/b"` and percent-encoded fragments. Returns
/// `None` for external references or missing nodes.
///
/// ```rust
/// use delphi_core::pointer;
/// use serde_json::json;
///
/// let doc = json!({"components": {"schemas": {"Pet Owner": {"type": "object"}}}});
/// let node = pointer::resolve(&doc, "#/components/schemas/Pet%20Owner").unwrap();
/// assert_eq!(node["type"], "object");
/// ```
#[must_use]
pub fn resolve<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let fragment = match reference.strip_prefix('#') {
        Some(fragment) => fragment,
        None if reference.is_empty() || reference.starts_with('/') => reference,
        None => return None,
    };
    if fragment.is_empty() {
        return Some(root);
    }

    let mut node = root;
    for raw in fragment.strip_prefix('/')?.split('/') {
        let decoded = percent_decode_str(raw).decode_utf8().ok()?;
        let token = unescape(&decoded);
        node = match node {
            Value::Object(map) => map.get(&token)?,
            Value::Array(items) => items.get(token.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

//! End-to-end resolution tests against the pet store fixture.
//!
//! Each test drives `Oas3Api::resolve` the way a transport would: raw
//! method, raw URL, header map. Parameters and bodies are then parsed and
//! validated through the returned `ResolvedPath`.

use delphi_core::{ApiInterface, ControllerRegistry, DelphiError, ErrorSource, Resolution, ResolvedPath};
use delphi_oas3::{fixtures, Oas3Api, Oas3Context, ResolverConfig};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde_json::json;

fn api() -> Oas3Api {
    Oas3Api::new(fixtures::pet_store().unwrap(), ResolverConfig::default()).unwrap()
}

fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        headers.append(*name, HeaderValue::from_str(value).unwrap());
    }
    headers
}

fn resolve(api: &Oas3Api, method: &str, url: &str, headers: &HeaderMap) -> ResolvedPath<Oas3Context> {
    match api.resolve(method, url, headers) {
        Resolution::Resolved(resolved) => *resolved,
        other => panic!("expected {method} {url} to resolve, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[test]
fn test_literal_template_beats_placeholder() {
    let api = api();
    let none = HeaderMap::new();

    assert_eq!(resolve(&api, "GET", "/v1/pets/mine", &none).operation_id(), "listMyPets");
    assert_eq!(resolve(&api, "GET", "/v1/pets/42", &none).operation_id(), "getPet");
    assert_eq!(resolve(&api, "GET", "/v1/pets/42/", &none).operation_id(), "getPet");
}

#[test]
fn test_method_not_allowed_is_distinct_from_not_found() {
    let api = api();
    let none = HeaderMap::new();

    let resolution = api.resolve("POST", "/v1/pets/42", &none);
    assert_eq!(resolution.miss_status(), Some(StatusCode::METHOD_NOT_ALLOWED));
    match resolution {
        Resolution::MethodNotAllowed(miss) => {
            assert_eq!(miss.path_template, "/pets/{petId}");
            assert_eq!(miss.allowed, vec![Method::GET, Method::DELETE]);
            assert_eq!(miss.allow_header(), "GET, DELETE");
        }
        other => panic!("expected 405, got {other:?}"),
    }

    let resolution = api.resolve("GET", "/v1/owners", &none);
    assert!(matches!(resolution, Resolution::NotFound));
    assert_eq!(resolution.miss_status(), Some(StatusCode::NOT_FOUND));

    // Outside every server base.
    assert!(matches!(api.resolve("GET", "/pets", &none), Resolution::NotFound));
}

#[test]
fn test_pattern_segments() {
    let api = api();
    let resolved = resolve(&api, "GET", "/v1/pets/3/photos/rex.png", &HeaderMap::new());
    assert_eq!(resolved.operation_id(), "getPhoto");

    let parsed = resolved.parse_parameters().unwrap();
    assert_eq!(parsed.path["petId"], 3);
    assert_eq!(parsed.path["name"], "rex");
    assert_eq!(parsed.path["ext"], "png");
    assert!(resolved.validate_parameters(&parsed).is_none());

    let resolved = resolve(&api, "GET", "/v1/pets/3/photos/rex.gif", &HeaderMap::new());
    let parsed = resolved.parse_parameters().unwrap();
    let errors = resolved.validate_parameters(&parsed).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "must be equal to one of the allowed values");
}

// ---------------------------------------------------------------------------
// Servers
// ---------------------------------------------------------------------------

#[test]
fn test_server_variables() {
    let api = api();
    let resolved = resolve(&api, "GET", "https://us.api.example.com/v2/pets", &HeaderMap::new());
    assert_eq!(resolved.operation_id(), "listPets");

    let server = resolved.server_params().unwrap();
    assert_eq!(server["region"], "us");
    assert_eq!(server["version"], "v2");
    assert_eq!(resolved.openapi().server_pointer().as_deref(), Some("/servers/1"));
    assert_eq!(resolved.openapi().server().unwrap().url, "https://{region}.api.example.com/{version}");

    let parsed = resolved.parse_parameters().unwrap();
    assert_eq!(parsed.server["region"], "us");
    assert!(resolved.validate_parameters(&parsed).is_none());

    // Enum values constrain matching.
    assert!(matches!(
        api.resolve("GET", "https://ap.api.example.com/v2/pets", &HeaderMap::new()),
        Resolution::NotFound
    ));
}

#[test]
fn test_host_header_selects_absolute_server() {
    let api = api();
    let resolved = resolve(
        &api,
        "GET",
        "/v1/pets",
        &headers(&[("host", "petstore.example.com:443")]),
    );
    assert_eq!(resolved.openapi().server_pointer().as_deref(), Some("/servers/0"));

    let resolved = resolve(&api, "GET", "/v1/pets", &HeaderMap::new());
    assert_eq!(resolved.openapi().server_pointer().as_deref(), Some("/servers/2"));
}

#[test]
fn test_ignore_servers() {
    let api = Oas3Api::new(fixtures::pet_store().unwrap(), ResolverConfig::permissive()).unwrap();
    let resolved = resolve(&api, "GET", "/pets", &HeaderMap::new());
    assert_eq!(resolved.operation_id(), "listPets");
    assert!(resolved.server_params().unwrap().is_empty());
    assert!(resolved.openapi().server().is_none());
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[test]
fn test_missing_required_parameter_is_one_violation() {
    let api = api();
    let resolved = resolve(&api, "GET", "/v1/pets/mine", &HeaderMap::new());
    let parsed = resolved.parse_parameters().unwrap();

    let errors = resolved.validate_parameters(&parsed).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Missing required cookie parameter \"session\"");
    let location = errors[0].location.as_ref().unwrap();
    assert_eq!(location.source, ErrorSource::Cookie);
    assert_eq!(location.name, "session");
    assert_eq!(location.doc_path, "/paths/~1pets~1mine/get/parameters/0");

    let resolved = resolve(
        &api,
        "GET",
        "/v1/pets/mine",
        &headers(&[("cookie", "theme=dark; session=0123456789")]),
    );
    let parsed = resolved.parse_parameters().unwrap();
    assert_eq!(parsed.cookie["session"], "0123456789");
    assert!(resolved.validate_parameters(&parsed).is_none());
}

#[test]
fn test_exploded_form_array() {
    let api = api();
    let resolved = resolve(
        &api,
        "GET",
        "/v1/pets?tag=a&tag=b&limit=5",
        &headers(&[("x-trace", "abc")]),
    );
    let parsed = resolved.parse_parameters().unwrap();
    assert_eq!(parsed.query["tag"], json!(["a", "b"]));
    assert_eq!(parsed.query["limit"], 5);
    assert_eq!(parsed.header["X-Trace"], "abc");
    assert!(resolved.validate_parameters(&parsed).is_none());
}

#[test]
fn test_parameter_violations_are_located() {
    let api = api();
    let resolved = resolve(&api, "GET", "/v1/pets?limit=0", &HeaderMap::new());
    let parsed = resolved.parse_parameters().unwrap();

    let errors = resolved.validate_parameters(&parsed).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "must be >= 1");
    let location = errors[0].location.as_ref().unwrap();
    assert_eq!(location.source, ErrorSource::Query);
    assert_eq!(location.name, "limit");
    assert_eq!(location.doc_path, "/paths/~1pets/get/parameters/0/schema");
}

#[test]
fn test_query_styles() {
    let api = api();
    let resolved = resolve(
        &api,
        "GET",
        "/v1/search?filter[color]=red&filter[age]=3&ids=1|2|3&coords=lat,1.5,lng,2&where=%7B%22a%22%3A1%7D",
        &HeaderMap::new(),
    );
    let parsed = resolved.parse_parameters().unwrap();
    assert_eq!(parsed.query["filter"], json!({"color": "red", "age": 3}));
    assert_eq!(parsed.query["ids"], json!([1, 2, 3]));
    assert_eq!(parsed.query["coords"], json!({"lat": 1.5, "lng": 2}));
    assert_eq!(parsed.query["where"], json!({"a": 1}));
    assert!(resolved.validate_parameters(&parsed).is_none());
}

#[test]
fn test_parse_is_repeatable() {
    let api = api();
    let resolved = resolve(&api, "GET", "/v1/search?ids=4|5&filter[color]=blue", &HeaderMap::new());
    let first = resolved.parse_parameters().unwrap();
    let second = resolved.parse_parameters().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_malformed_parameter_is_an_error() {
    let api = api();
    let resolved = resolve(&api, "GET", "/v1/search?coords=lat,1.5,lng", &HeaderMap::new());
    let err = resolved.parse_parameters().unwrap_err();
    assert!(matches!(err, DelphiError::MalformedParameter { ref name, .. } if name == "coords"));
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert!(!err.is_document_error());
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[test]
fn test_body_negotiation_prefers_exact_media_type() {
    let api = api();
    let resolved = resolve(
        &api,
        "POST",
        "/v1/pets",
        &headers(&[("content-type", "application/json; charset=utf-8")]),
    );
    assert_eq!(resolved.operation_id(), "createPet");
    assert_eq!(
        resolved.openapi().media_type_pointer(),
        Some("/paths/~1pets/post/requestBody/content/application~1json")
    );

    let body = resolved.body().unwrap();
    assert_eq!(body.media_type(), Some("application/json"));

    let value = body.parse(br#"{"name": "Rex", "tag": "dog"}"#).unwrap();
    assert!(body.validate(value.as_ref()).is_none());

    let value = body.parse(br#"{"tag": "dog"}"#).unwrap();
    let errors = body.validate(value.as_ref()).unwrap();
    assert_eq!(errors[0].message, "must have required property 'name'");
    assert_eq!(errors[0].location.as_ref().unwrap().source, ErrorSource::Request);

    let resolved = resolve(&api, "POST", "/v1/pets", &headers(&[("content-type", "application/xml")]));
    assert_eq!(resolved.body().unwrap().media_type(), Some("application/*"));
}

#[test]
fn test_form_body() {
    let api = api();
    let resolved = resolve(
        &api,
        "POST",
        "/v1/pets",
        &headers(&[("content-type", "application/x-www-form-urlencoded")]),
    );
    let body = resolved.body().unwrap();
    let value = body.parse(b"name=Rex&tag=dog").unwrap();
    assert_eq!(value, Some(json!({"name": "Rex", "tag": "dog"})));
    assert!(body.validate(value.as_ref()).is_none());
}

#[test]
fn test_unsupported_media_type_fails_at_use() {
    let api = api();
    let resolved = resolve(&api, "POST", "/v1/pets", &headers(&[("content-type", "text/plain")]));
    assert!(resolved.openapi().media_type_pointer().is_none());

    let body = resolved.body().unwrap();
    assert_eq!(body.media_type(), None);
    let errors = body.parse(b"Rex").unwrap_err();
    assert_eq!(errors[0].message, "Unsupported content type 'text/plain'");
}

#[test]
fn test_operation_without_body() {
    let api = api();
    let resolved = resolve(&api, "GET", "/v1/pets", &headers(&[("content-type", "application/json")]));
    assert!(resolved.body().is_none());
}

// ---------------------------------------------------------------------------
// Controllers and context
// ---------------------------------------------------------------------------

#[test]
fn test_controller_binding() {
    let controllers = ControllerRegistry::new()
        .with_controller("pets", "listPets", "list handler")
        .with_operation("getHealth", "health handler");
    let api = Oas3Api::builder(fixtures::pet_store().unwrap())
        .controllers(controllers)
        .build()
        .unwrap();

    let resolved = resolve(&api, "GET", "/v1/pets", &HeaderMap::new());
    assert_eq!(resolved.controller_name(), Some("pets"));
    let controller = resolved.controller().unwrap();
    assert_eq!(controller.downcast_ref::<&str>(), Some(&"list handler"));

    let resolved = resolve(&api, "GET", "/v1/health", &HeaderMap::new());
    assert_eq!(resolved.controller_name(), None);
    assert_eq!(resolved.operation_id(), "getHealth");
    assert!(resolved.controller().is_some());

    let resolved = resolve(&api, "GET", "/v1/pets/1", &HeaderMap::new());
    assert!(resolved.controller().is_none());
}

#[test]
fn test_openapi_context() {
    let api = api();
    let resolved = resolve(&api, "DELETE", "/v1/pets/9", &HeaderMap::new());
    let context = resolved.openapi();

    assert_eq!(context.method(), &Method::DELETE);
    assert_eq!(context.path_template(), "/pets/{petId}");
    assert_eq!(context.path_item_pointer(), "/paths/~1pets~1{petId}");
    assert_eq!(context.operation_pointer(), "/paths/~1pets~1{petId}/delete");
    assert!(context.is_deprecated());
    assert_eq!(context.operation().unwrap().operation_id.as_deref(), Some("deletePet"));
    assert_eq!(context.security().map(<[_]>::len), Some(1));

    let resolved = resolve(&api, "GET", "/v1/health", &HeaderMap::new());
    assert_eq!(resolved.openapi().security(), Some(&[][..]));

    let resolved = resolve(&api, "GET", "/v1/pets", &HeaderMap::new());
    assert_eq!(resolved.openapi().tags(), ["pets".to_string()]);
    assert_eq!(
        resolved.openapi().document().pointer("/info/title"),
        Some(&json!("Pet Store"))
    );
}

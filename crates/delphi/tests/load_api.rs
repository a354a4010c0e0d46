//! Loading documents and configuration from disk.

use std::fs;

use delphi::oas3::fixtures;
use delphi::prelude::*;
use http::HeaderMap;

const USERS_YAML: &str = r#"
openapi: 3.1.0
info: { title: Users, version: "1.0" }
paths:
  /users/{id}:
    get:
      operationId: getUser
      parameters:
        - { name: id, in: path, required: true, schema: { type: integer } }
"#;

#[tokio::test]
async fn test_load_json_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("petstore.json");
    fs::write(&path, serde_json::to_string_pretty(&fixtures::pet_store_value()).unwrap()).unwrap();

    let api = load_api(&path, &DelphiConfig::default()).await.unwrap();
    assert!(api.operation_count() > 5);

    let resolved = api
        .resolve("GET", "https://petstore.example.com/v1/pets/42", &HeaderMap::new())
        .into_resolved()
        .unwrap();
    assert_eq!(resolved.operation_id(), "getPet");
    assert_eq!(resolved.parse_parameters().unwrap().path["petId"], 42);
}

#[tokio::test]
async fn test_load_yaml_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.yaml");
    fs::write(&path, USERS_YAML).unwrap();

    let api = load_api(&path, &DelphiConfig::default()).await.unwrap();
    let resolution = api.resolve("DELETE", "/users/1", &HeaderMap::new());
    match resolution {
        Resolution::MethodNotAllowed(miss) => assert_eq!(miss.allow_header(), "GET"),
        other => panic!("expected 405, got {other:?}"),
    }
}

#[tokio::test]
async fn test_configuration_flows_into_the_resolver() {
    let dir = tempfile::tempdir().unwrap();
    let document = dir.path().join("petstore.json");
    let settings = dir.path().join("delphi.toml");
    fs::write(&document, fixtures::pet_store_value().to_string()).unwrap();
    fs::write(&settings, "[resolver]\nignore_servers = true\n\n[logging]\nenabled = false\n").unwrap();

    let config = ConfigLoader::new().with_file(&settings).unwrap().load().unwrap();
    let api = load_api(&document, &config).await.unwrap();

    // Without servers the version prefix is part of the path, which no template declares.
    assert!(matches!(api.resolve("GET", "/v1/pets", &HeaderMap::new()), Resolution::NotFound));
    let resolved = api.resolve("GET", "/pets", &HeaderMap::new()).into_resolved().unwrap();
    assert_eq!(resolved.operation_id(), "listPets");
}

#[tokio::test]
async fn test_strict_config_requires_controllers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.yml");
    fs::write(&path, USERS_YAML).unwrap();

    let config = DelphiConfig::production();
    let err = load_api(&path, &config).await.unwrap_err();
    assert!(matches!(err, DelphiError::MissingController { .. }));

    let controllers = ControllerRegistry::new().with_operation("getUser", "handler");
    let api = load_api_with_controllers(&path, &config, controllers).await.unwrap();
    let resolved = api.resolve("GET", "/users/3", &HeaderMap::new()).into_resolved().unwrap();
    let controller = resolved.controller().unwrap();
    assert_eq!(controller.downcast_ref::<&str>(), Some(&"handler"));
}

#[tokio::test]
async fn test_missing_document() {
    let err = load_api("/nonexistent/openapi.yaml", &DelphiConfig::default()).await.unwrap_err();
    assert!(matches!(err, DelphiError::Io(_)));
}

//! Shared test fixtures.
//!
//! A pet store document exercising servers with variables, path item and
//! operation parameters, every parameter location, several serialization
//! styles, request body negotiation and controller extensions.
//!
//! ```
//! use delphi_oas3::fixtures;
//!
//! let document = fixtures::pet_store().unwrap();
//! assert_eq!(document.model().info.title, "Pet Store");
//! assert_eq!(document.model().servers.len(), 3);
//! ```

use serde_json::{json, Value};

use crate::document::ApiDocument;
use delphi_core::DelphiResult;

/// The pet store document as raw JSON.
///
/// Operations:
/// - `listPets` - GET /pets
/// - `createPet` - POST /pets
/// - `listMyPets` - GET /pets/mine
/// - `getPet` - GET /pets/{petId}
/// - `deletePet` - DELETE /pets/{petId}
/// - `getPhoto` - GET /pets/{petId}/photos/{name}.{ext}
/// - `searchPets` - GET /search
/// - `getHealth` - GET /health (no `operationId`)
#[must_use]
pub fn pet_store_value() -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {"title": "Pet Store", "version": "1.0.0"},
        "servers": [
            {"url": "https://petstore.example.com/v1"},
            {
                "url": "https://{region}.api.example.com/{version}",
                "variables": {
                    "region": {"default": "eu", "enum": ["eu", "us"]},
                    "version": {"default": "v2"}
                }
            },
            {"url": "/v1"}
        ],
        "security": [{"apiKey": []}],
        "paths": {
            "/pets": {
                "x-delphi-controller": "pets",
                "get": {
                    "operationId": "listPets",
                    "tags": ["pets"],
                    "parameters": [
                        {"name": "limit", "in": "query", "schema": {"type": "integer", "minimum": 1, "maximum": 100}},
                        {"name": "tag", "in": "query", "schema": {"type": "array", "items": {"type": "string"}}},
                        {"name": "X-Trace", "in": "header", "schema": {"type": "string"}}
                    ]
                },
                "post": {
                    "operationId": "createPet",
                    "tags": ["pets"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {"schema": {"$ref": "#/components/schemas/Pet"}},
                            "application/x-www-form-urlencoded": {"schema": {"$ref": "#/components/schemas/Pet"}},
                            "application/*": {"schema": {"type": "string"}}
                        }
                    }
                }
            },
            "/pets/mine": {
                "x-delphi-controller": "pets",
                "get": {
                    "operationId": "listMyPets",
                    "parameters": [
                        {"name": "session", "in": "cookie", "required": true, "schema": {"type": "string", "minLength": 8}}
                    ]
                }
            },
            "/pets/{petId}": {
                "x-delphi-controller": "pets",
                "parameters": [
                    {"$ref": "#/components/parameters/PetId"}
                ],
                "get": {"operationId": "getPet"},
                "delete": {"operationId": "deletePet", "deprecated": true}
            },
            "/pets/{petId}/photos/{name}.{ext}": {
                "get": {
                    "operationId": "getPhoto",
                    "parameters": [
                        {"$ref": "#/components/parameters/PetId"},
                        {"name": "name", "in": "path", "required": true, "schema": {"type": "string"}},
                        {"name": "ext", "in": "path", "required": true, "schema": {"type": "string", "enum": ["jpg", "png"]}}
                    ]
                }
            },
            "/search": {
                "get": {
                    "operationId": "searchPets",
                    "parameters": [
                        {
                            "name": "filter", "in": "query", "style": "deepObject", "explode": true,
                            "schema": {
                                "type": "object",
                                "properties": {"color": {"type": "string"}, "age": {"type": "integer"}}
                            }
                        },
                        {
                            "name": "ids", "in": "query", "style": "pipeDelimited", "explode": false,
                            "schema": {"type": "array", "items": {"type": "integer"}}
                        },
                        {
                            "name": "coords", "in": "query", "explode": false,
                            "schema": {
                                "type": "object",
                                "properties": {"lat": {"type": "number"}, "lng": {"type": "number"}}
                            }
                        },
                        {
                            "name": "where", "in": "query",
                            "content": {"application/json": {"schema": {"type": "object"}}}
                        }
                    ]
                }
            },
            "/health": {
                "get": {"security": []}
            }
        },
        "components": {
            "schemas": {
                "Pet": {
                    "type": "object",
                    "required": ["name"],
                    "properties": {
                        "id": {"type": "integer", "format": "int64"},
                        "name": {"type": "string", "minLength": 1},
                        "tag": {"type": "string"}
                    }
                }
            },
            "parameters": {
                "PetId": {"name": "petId", "in": "path", "required": true, "schema": {"type": "integer", "minimum": 1}}
            },
            "securitySchemes": {
                "apiKey": {"type": "apiKey", "in": "header", "name": "X-Api-Key"}
            }
        }
    })
}

/// The pet store document, parsed.
///
/// # Errors
///
/// Never fails for the bundled document; the result mirrors
/// [`ApiDocument::from_value`].
pub fn pet_store() -> DelphiResult<ApiDocument> {
    ApiDocument::from_value(pet_store_value())
}

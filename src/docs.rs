//! API documentation behind HTTP basic auth.
use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
        StatusCode,
    },
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64ct::{Base64, Encoding};
use serde_json::{json, Value};
use tracing::warn;

use crate::{config::DocsConfig, error::AppError, state::AppState};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api-docs", get(docs_page))
        .route("/api-docs/swagger.json", get(openapi_json))
        .route("/api-docs/swagger.yaml", get(openapi_yaml))
        .route_layer(middleware::from_fn_with_state(state, require_docs_auth))
}

/// Splits a `Basic <base64(name:pass)>` header value into its two parts.
fn parse_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = Base64::decode_vec(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (name, pass) = text.split_once(':')?;
    Some((name.to_string(), pass.to_string()))
}

fn credentials_match(header: Option<&str>, docs: &DocsConfig) -> bool {
    match header.and_then(parse_basic) {
        Some((name, pass)) => name == docs.username && pass == docs.password,
        None => false,
    }
}

async fn require_docs_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if !credentials_match(header, &state.config.docs) {
        warn!("api docs access denied");
        return (StatusCode::UNAUTHORIZED, [(WWW_AUTHENTICATE, "Basic")]).into_response();
    }
    next.run(request).await
}

async fn docs_page() -> Html<&'static str> {
    Html(DOCS_PAGE)
}

async fn openapi_json() -> Json<Value> {
    Json(openapi())
}

async fn openapi_yaml() -> Result<Response, AppError> {
    let yaml = serde_yaml::to_string(&openapi()).map_err(anyhow::Error::from)?;
    Ok(([(CONTENT_TYPE, "application/yaml")], yaml).into_response())
}

const DOCS_PAGE: &str = r##"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8" />
  <title>Flash Card Documentation</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.ui = SwaggerUIBundle({
      url: "/api-docs/swagger.json",
      dom_id: "#swagger-ui",
      persistAuthorization: true,
    });
  </script>
</body>
</html>
"##;

fn error_response(description: &str) -> Value {
    json!({ "description": description })
}

fn token_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Token" } } }
    })
}

fn user_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/User" } } }
    })
}

fn id_param() -> Value {
    json!({ "name": "id", "in": "path", "required": true, "schema": { "type": "integer" } })
}

/// OpenAPI 3 description of every public route.
pub fn openapi() -> Value {
    let secured = json!([{ "token": [] }]);
    json!({
        "openapi": "3.0.0",
        "info": {
            "title": "Flash card project",
            "description": "## The flash card API description",
            "version": "1.0"
        },
        "paths": {
            "/auth/signup": {
                "post": {
                    "tags": ["Authentication"],
                    "summary": "Register a new user",
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/SignUp" } } }
                    },
                    "responses": {
                        "201": token_response("User successfully created"),
                        "400": error_response("Invalid request body"),
                        "409": error_response("Email already exists")
                    }
                }
            },
            "/auth/login": {
                "post": {
                    "tags": ["Authentication"],
                    "summary": "Login with email and password",
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Login" } } }
                    },
                    "responses": {
                        "200": token_response("User successfully logged in"),
                        "401": error_response("Invalid credentials")
                    }
                }
            },
            "/users": {
                "get": {
                    "tags": ["Users"],
                    "summary": "Get all users",
                    "security": secured.clone(),
                    "responses": {
                        "200": {
                            "description": "Return all users",
                            "content": { "application/json": { "schema": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/User" }
                            } } }
                        },
                        "401": error_response("Missing or invalid token")
                    }
                },
                "post": {
                    "tags": ["Users"],
                    "summary": "Create a new user",
                    "security": secured.clone(),
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/SignUp" } } }
                    },
                    "responses": {
                        "201": user_response("User successfully created"),
                        "400": error_response("Invalid request body"),
                        "401": error_response("Missing or invalid token")
                    }
                }
            },
            "/users/{id}": {
                "get": {
                    "tags": ["Users"],
                    "summary": "Get user by ID",
                    "security": secured.clone(),
                    "parameters": [id_param()],
                    "responses": {
                        "200": user_response("Return a user by ID"),
                        "401": error_response("Missing or invalid token"),
                        "404": error_response("User not found")
                    }
                },
                "delete": {
                    "tags": ["Users"],
                    "summary": "Delete user by ID",
                    "security": secured.clone(),
                    "parameters": [id_param()],
                    "responses": {
                        "200": user_response("User successfully deleted"),
                        "401": error_response("Missing or invalid token"),
                        "404": error_response("User not found")
                    }
                }
            }
        },
        "components": {
            "securitySchemes": {
                "token": { "type": "http", "scheme": "bearer" }
            },
            "schemas": {
                "SignUp": {
                    "type": "object",
                    "required": ["name", "email", "password"],
                    "properties": {
                        "name": { "type": "string" },
                        "email": { "type": "string", "format": "email" },
                        "password": { "type": "string" }
                    }
                },
                "Login": {
                    "type": "object",
                    "required": ["email", "password"],
                    "properties": {
                        "email": { "type": "string", "format": "email" },
                        "password": { "type": "string" }
                    }
                },
                "Token": {
                    "type": "object",
                    "properties": { "token": { "type": "string" } }
                },
                "User": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "name": { "type": "string" },
                        "email": { "type": "string" },
                        "password": { "type": "string" }
                    }
                }
            }
        }
    })
}

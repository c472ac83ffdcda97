use std::net::SocketAddr;
use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::state::AppState;
use crate::{auth, docs, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(docs::router(state.clone()))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "3000".into())
    )
        .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PasswordCheck;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use base64ct::{Base64, Encoding};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestApp {
        _tmp: TempDir,
        state: AppState,
        router: Router,
    }

    impl TestApp {
        fn new(check: PasswordCheck) -> Self {
            let tmp = TempDir::new().unwrap();
            let state = AppState::fake(&tmp, check);
            let router = build_app(state.clone());
            Self { _tmp: tmp, state, router }
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, value)
        }

        async fn signup(&self, name: &str, email: &str, password: &str) -> String {
            let (status, body) = self
                .send(
                    Method::POST,
                    "/auth/signup",
                    None,
                    Some(json!({ "name": name, "email": email, "password": password })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body["token"].as_str().unwrap().to_string()
        }
    }

    #[tokio::test]
    async fn health_is_open() {
        let app = TestApp::new(PasswordCheck::Literal);
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn signup_then_list_users() {
        let app = TestApp::new(PasswordCheck::Literal);
        let token = app.signup("John", "john@x.com", "p1").await;

        let (status, body) = app.send(Method::GET, "/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["id"], 1);
        assert_eq!(users[0]["name"], "John");
        assert_eq!(users[0]["email"], "john@x.com");
    }

    #[tokio::test]
    async fn users_routes_require_a_token() {
        let app = TestApp::new(PasswordCheck::Literal);
        for (method, uri) in [
            (Method::GET, "/users"),
            (Method::GET, "/users/1"),
            (Method::DELETE, "/users/1"),
        ] {
            let (status, body) = app.send(method, uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert!(body["error"].is_string());
        }

        let (status, _) = app.send(Method::GET, "/users", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn crud_over_http() {
        let app = TestApp::new(PasswordCheck::Literal);
        let token = app.signup("Admin", "admin@x.com", "p0").await;

        let (status, created) = app
            .send(
                Method::POST,
                "/users",
                Some(&token),
                Some(json!({ "name": "John", "email": "john@x.com", "password": "p1" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], 2);
        assert_eq!(created["password"], "p1");

        let (status, fetched) = app.send(Method::GET, "/users/2", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (status, deleted) = app.send(Method::DELETE, "/users/2", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted, created);

        let (status, _) = app.send(Method::GET, "/users/2", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app.send(Method::DELETE, "/users/2", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_user_validates_body() {
        let app = TestApp::new(PasswordCheck::Literal);
        let token = app.signup("Admin", "admin@x.com", "p0").await;

        let (status, _) = app
            .send(
                Method::POST,
                "/users",
                Some(&token),
                Some(json!({ "name": "John", "email": "not-an-email", "password": "p1" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn hashed_mode_hashes_created_users() {
        let app = TestApp::new(PasswordCheck::Hashed);
        let token = app.signup("Admin", "admin@x.com", "p0").await;

        let (_, created) = app
            .send(
                Method::POST,
                "/users",
                Some(&token),
                Some(json!({ "name": "John", "email": "john@x.com", "password": "p1" })),
            )
            .await;
        assert_ne!(created["password"], "p1");

        let (status, body) = app
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": "john@x.com", "password": "p1" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].is_string());
    }

    #[tokio::test]
    async fn literal_login_with_signup_password_is_unauthorized() {
        let app = TestApp::new(PasswordCheck::Literal);
        app.signup("John", "john@x.com", "p1").await;

        let (status, body) = app
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": "john@x.com", "password": "p1" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid email or password");
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts() {
        let app = TestApp::new(PasswordCheck::Literal);
        app.signup("John", "john@x.com", "p1").await;

        let (status, _) = app
            .send(
                Method::POST,
                "/auth/signup",
                None,
                Some(json!({ "name": "Jane", "email": "john@x.com", "password": "p2" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn token_stops_working_after_account_deletion() {
        let app = TestApp::new(PasswordCheck::Literal);
        let token = app.signup("John", "john@x.com", "p1").await;

        let (status, _) = app.send(Method::DELETE, "/users/1", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app.send(Method::GET, "/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Login first to access this endpoint.");
    }

    #[tokio::test]
    async fn corrupt_store_is_a_server_error() {
        let app = TestApp::new(PasswordCheck::Literal);
        let token = app.signup("John", "john@x.com", "p1").await;
        std::fs::write(app.state.store.path(), "id,name\n1,John\n").unwrap();

        let (status, body) = app.send(Method::GET, "/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "User store is corrupt");
    }

    #[tokio::test]
    async fn api_docs_require_basic_auth() {
        let app = TestApp::new(PasswordCheck::Literal);

        let request = Request::builder()
            .uri("/api-docs/swagger.json")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Basic");

        let credentials = Base64::encode_string(b"admin:admin");
        let request = Request::builder()
            .uri("/api-docs/swagger.json")
            .header(header::AUTHORIZATION, format!("Basic {credentials}"))
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let doc: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc["info"]["title"], "Flash card project");
    }

    fn docs_request(uri: &str) -> Request<Body> {
        let credentials = Base64::encode_string(b"admin:admin");
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Basic {credentials}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn api_docs_page_renders_swagger_ui() {
        let app = TestApp::new(PasswordCheck::Literal);
        let response = app.router.clone().oneshot(docs_request("/api-docs")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.contains("swagger-ui"));
    }

    #[tokio::test]
    async fn api_docs_serve_yaml() {
        let app = TestApp::new(PasswordCheck::Literal);

        let request = Request::builder()
            .uri("/api-docs/swagger.yaml")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .router
            .clone()
            .oneshot(docs_request("/api-docs/swagger.yaml"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/yaml");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let doc: Value = serde_yaml::from_slice(&bytes).unwrap();
        assert_eq!(doc["info"]["title"], "Flash card project");
    }

    #[tokio::test]
    async fn non_numeric_id_is_a_json_bad_request() {
        let app = TestApp::new(PasswordCheck::Literal);
        let token = app.signup("John", "john@x.com", "p1").await;

        for method in [Method::GET, Method::DELETE] {
            let (status, body) = app.send(method, "/users/abc", Some(&token), None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].is_string(), "{body}");
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_json_bad_request() {
        let app = TestApp::new(PasswordCheck::Literal);
        let token = app.signup("John", "john@x.com", "p1").await;

        let posts = [
            ("/auth/signup", None),
            ("/auth/login", None),
            ("/users", Some(token.as_str())),
        ];
        for (uri, token) in posts {
            let mut builder = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json");
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let request = builder.body(Body::from("{\"name\": ")).unwrap();
            let response = app.router.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert!(body["error"].is_string(), "{uri}: {body}");
        }

        let (status, body) = app
            .send(Method::POST, "/auth/signup", None, Some(json!({ "name": "John" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use slf_core::roles::Role;
use slf_core::types::Actor;
use slf_db::models::user::CreateUser;
use slf_db::store::{EntityStore, MemoryStore};
use slf_events::EventBus;
use slf_workflow::{Workflow, WorkflowSettings};
use tower::ServiceExt;

use slf_api::auth::jwt::{generate_access_token, JwtConfig};
use slf_api::config::{ServerConfig, StoreBackend};
use slf_api::router::build_app_router;
use slf_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults over the in-memory store.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        store_backend: StoreBackend::Memory,
        database_url: None,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// The full application over a fresh `MemoryStore`.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub workflow: Workflow,
    pub config: ServerConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(WorkflowSettings::default())
    }

    pub fn with_settings(settings: WorkflowSettings) -> Self {
        let config = test_config();
        let store = Arc::new(MemoryStore::new());
        let workflow = Workflow::new(store.clone(), Arc::new(EventBus::default()), settings);

        let state = AppState {
            workflow: workflow.clone(),
            config: Arc::new(config.clone()),
            pool: None,
        };
        let router = build_app_router(state, &config).expect("test config is valid");

        Self {
            router,
            store,
            workflow,
            config,
        }
    }

    /// Create a user with `role` and return it with a bearer token.
    pub async fn user(&self, email: &str, role: Role) -> (Actor, String) {
        let user = self
            .store
            .create_user(&CreateUser {
                name: email.to_string(),
                email: email.to_string(),
                role,
            })
            .await
            .unwrap();
        let token = generate_access_token(user.id, role, &self.config.jwt).unwrap();
        (Actor::new(user.id, role), token)
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response {
        send(self.router.clone(), Method::GET, uri, Some(token), None).await
    }

    pub async fn post_json(&self, uri: &str, token: &str, body: serde_json::Value) -> Response {
        send(self.router.clone(), Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put_json(&self, uri: &str, token: &str, body: serde_json::Value) -> Response {
        send(self.router.clone(), Method::PUT, uri, Some(token), Some(body)).await
    }
}

/// Send a request through the router without binding a socket.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

/// GET without credentials.
pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status and return the parsed body.
pub async fn expect_status(response: Response, status: StatusCode) -> serde_json::Value {
    let actual = response.status();
    let json = body_json(response).await;
    assert_eq!(actual, status, "unexpected status, body: {json}");
    json
}

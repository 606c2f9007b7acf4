//! Health check, authentication and general HTTP behaviour.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, expect_status, get, TestApp};
use jsonwebtoken::{encode, EncodingKey, Header};
use slf_api::auth::jwt::Claims;
use slf_core::roles::Role;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_reports_the_memory_store() {
    let app = TestApp::new();
    let response = get(app.router.clone(), "/health").await;

    let json = expect_status(response, StatusCode::OK).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["store"], "memory");
    assert_eq!(json["store_healthy"], true);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = TestApp::new();
    let response = get(app.router.clone(), "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = TestApp::new();
    let response = get(app.router.clone(), "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

#[tokio::test]
async fn cors_preflight_allows_the_configured_origin() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/projects")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:5173")
    );
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_token_is_401() {
    let app = TestApp::new();
    let response = get(app.router.clone(), "/api/v1/projects").await;

    let json = expect_status(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(json["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn garbage_token_is_401() {
    let app = TestApp::new();
    let response = app.get("/api/v1/notifications", "not-a-jwt").await;

    let json = expect_status(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(json["error"], "Invalid or expired token");
}

#[tokio::test]
async fn token_with_unknown_role_is_401() {
    let app = TestApp::new();
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: 1,
        role: "superuser".into(),
        exp: now + 600,
        iat: now,
        jti: "test".into(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(app.config.jwt.secret.as_bytes()),
    )
    .unwrap();

    let response = app.get("/api/v1/notifications", &token).await;
    let json = expect_status(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(json["code"], "UNAUTHENTICATED");
}

// ---------------------------------------------------------------------------
// Capture settings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn capture_settings_demand_a_fresh_high_accuracy_fix() {
    let app = TestApp::new();
    let (_, token) = app.user("inspector@consult.id", Role::Inspector).await;

    let response = app.get("/api/v1/inspections/capture-settings", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["timeout_secs"], 10);
    assert_eq!(json["data"]["high_accuracy"], true);
    assert_eq!(json["data"]["maximum_age_ms"], 0);
    assert_eq!(json["data"]["max_manual_note_length"], 2000);
}

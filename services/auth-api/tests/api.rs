//! End-to-end tests for the auth routes
//!
//! These tests verify:
//! - Login issues a bearer token and a refresh cookie
//! - Refresh issues a new access token from the cookie only
//! - Logout revokes both tokens and clears the cookie
//! - Readiness reflects the revocation store

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use common::{body_json, cookie_pair, login_request, set_cookie, test_app, TestApp, PASSWORD};
use keygate_db::RevocationStore;
use tower::ServiceExt;

async fn send(app: &TestApp, request: Request<Body>) -> Response {
    app.router.clone().oneshot(request).await.unwrap()
}

fn authed(method: &str, uri: &str, access: Option<&str>, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(access) = access {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", access));
    }
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Log in and return (access token, `refresh_token=...` cookie pair)
async fn login(app: &TestApp, email: &str) -> (String, String) {
    let response = send(app, login_request(email, PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = cookie_pair(&set_cookie(&response).expect("refresh cookie"));
    let body = body_json(response).await;
    (body["access_token"].as_str().unwrap().to_string(), cookie)
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_returns_bearer_and_cookie() {
    let app = test_app(true);
    app.principals.add("alice@example.com", true, true);

    let response = send(&app, login_request("alice@example.com", PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = set_cookie(&response).unwrap();
    assert!(cookie.starts_with("refresh_token="));
    assert!(cookie.contains("Max-Age=1209600"));
    assert!(cookie.contains("HttpOnly"));
    // Local environment
    assert!(!cookie.contains("Secure"));

    let body = body_json(response).await;
    assert_eq!(body["token_type"], "bearer");
    assert!(body["access_token"].as_str().is_some());
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let app = test_app(true);
    app.principals.add("bob@example.com", true, true);

    let response = send(&app, login_request("BOB@example.com", PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_bad_credentials() {
    let app = test_app(true);
    app.principals.add("carol@example.com", true, true);
    app.principals.add("inactive@example.com", false, true);

    for (email, password) in [
        ("carol@example.com", "wrong-password"),
        ("nobody@example.com", PASSWORD),
        ("inactive@example.com", PASSWORD),
    ] {
        let response = send(&app, login_request(email, password)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", email);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "LOGIN_BAD_CREDENTIALS");
    }
}

#[tokio::test]
async fn test_login_unverified() {
    let app = test_app(true);
    app.principals.add("dave@example.com", true, false);

    let response = send(&app, login_request("dave@example.com", PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "LOGIN_USER_NOT_VERIFIED");

    // Allowed when verification is not required
    let app = test_app(false);
    app.principals.add("dave@example.com", true, false);
    let response = send(&app, login_request("dave@example.com", PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Me and refresh
// ============================================================================

#[tokio::test]
async fn test_me_returns_principal() {
    let app = test_app(true);
    let principal = app.principals.add("erin@example.com", true, true);
    let (access, _) = login(&app, "erin@example.com").await;

    let response = send(&app, authed("GET", "/api/v1/auth/me", Some(&access), None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["id"], principal.id.to_string());
    assert_eq!(body["email"], "erin@example.com");
    assert_eq!(body["is_superuser"], false);
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = test_app(true);

    let response = send(&app, authed("GET", "/api/v1/auth/me", None, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_issues_access_token_only() {
    let app = test_app(true);
    app.principals.add("frank@example.com", true, true);
    let (_, cookie) = login(&app, "frank@example.com").await;

    let response = send(&app, authed("POST", "/api/v1/auth/refresh", None, Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).is_none());

    let access = body_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();
    let response = send(&app, authed("GET", "/api/v1/auth/me", Some(&access), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let app = test_app(true);
    app.principals.add("grace@example.com", true, true);
    let (access, _) = login(&app, "grace@example.com").await;

    // Access token in the bearer header is ignored by refresh
    let response = send(&app, authed("POST", "/api/v1/auth/refresh", Some(&access), None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Access token in the refresh cookie has the wrong kind
    let cookie = format!("refresh_token={}", access);
    let response = send(&app, authed("POST", "/api/v1/auth/refresh", None, Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Logout
// ============================================================================

#[tokio::test]
async fn test_logout_revokes_both_tokens() {
    let app = test_app(true);
    app.principals.add("heidi@example.com", true, true);
    let (access, cookie) = login(&app, "heidi@example.com").await;

    let response = send(
        &app,
        authed("POST", "/api/v1/auth/logout", Some(&access), Some(&cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(set_cookie(&response).unwrap().starts_with("refresh_token=; Max-Age=0"));

    let response = send(&app, authed("GET", "/api/v1/auth/me", Some(&access), None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, authed("POST", "/api/v1/auth/refresh", None, Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_cookie() {
    let app = test_app(true);
    app.principals.add("ivan@example.com", true, true);
    let (access, cookie) = login(&app, "ivan@example.com").await;

    let response = send(&app, authed("POST", "/api/v1/auth/logout", Some(&access), None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Refresh token was never presented, so it still works
    let response = send(&app, authed("POST", "/api/v1/auth/refresh", None, Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_closed_store_fails_closed() {
    let app = test_app(true);
    app.principals.add("judy@example.com", true, true);
    let (access, _) = login(&app, "judy@example.com").await;
    app.revocations.close().await;

    let response = send(&app, authed("GET", "/api/v1/auth/me", Some(&access), None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "REVOCATION_STORE_UNAVAILABLE");
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_and_ready() {
    let app = test_app(true);

    let response = send(&app, authed("GET", "/health", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, authed("GET", "/ready", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["revocation_store"]["status"], "connected");

    app.revocations.close().await;
    let response = send(&app, authed("GET", "/ready", None, None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["revocation_store"]["status"], "unavailable");
    assert_eq!(body["database"]["status"], "connected");
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = test_app(true);

    let response = send(&app, authed("GET", "/api/v1/auth/me", None, None)).await;
    assert!(response.headers().contains_key("x-request-id"));
}

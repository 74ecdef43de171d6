//! Integration tests driving the full HTTP stack (router, guards, rate
//! limiter) against an in-memory database.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use parlor_api::router::api_router;
use parlor_api::state::AppState;
use parlor_db::Database;

fn test_app() -> Router {
    let db = Arc::new(Database::open_in_memory().unwrap());
    api_router(AppState::new(db, None))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// The `name=value` pair from the response's session cookie.
fn session_cookie(response: &Response<Body>) -> String {
    let raw = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("missing set-cookie header")
        .to_str()
        .unwrap();
    raw.split(';').next().unwrap().to_string()
}

/// Register an account and return its session cookie.
async fn register(app: &Router, username: &str) -> String {
    let response = send(
        app,
        "POST",
        "/api/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "hunter2hunter2",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    session_cookie(&response)
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_registered_account_is_bootstrap_admin() {
    let app = test_app();

    let response = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({
            "username": "root",
            "email": "root@example.com",
            "password": "hunter2hunter2",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers().get(header::SET_COOKIE).is_some());

    let body = body_json(response).await;
    assert_eq!(body["is_admin"], true);
    assert_eq!(body["coins"], 10_000);

    // Everyone after the first gets the regular registration bonus.
    let response = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({
            "username": "ana",
            "email": "ana@example.com",
            "password": "hunter2hunter2",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["is_admin"], false);
    assert_eq!(body["coins"], 100);
}

#[tokio::test]
async fn registration_rejects_bad_input_and_duplicates() {
    let app = test_app();

    let response = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"username": "ab", "email": "ab@example.com", "password": "hunter2hunter2"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"username": "ana", "email": "ana@example.com", "password": "short"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    register(&app, "ana").await;

    // Same username, different email.
    let response = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"username": "ana", "email": "other@example.com", "password": "hunter2hunter2"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "DUPLICATE_ACCOUNT");

    // Same email, different username.
    let response = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({"username": "other", "email": "ana@example.com", "password": "hunter2hunter2"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_body_fields_are_rejected() {
    let app = test_app();
    let response = send(
        &app,
        "POST",
        "/api/register",
        None,
        Some(json!({
            "username": "ana",
            "email": "ana@example.com",
            "password": "hunter2hunter2",
            "is_admin": true,
        })),
    )
    .await;
    assert!(response.status().is_client_error());
}

// ---------------------------------------------------------------------------
// Login / logout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_accepts_username_or_email() {
    let app = test_app();
    register(&app, "ana").await;

    for identifier in ["ana", "ana@example.com"] {
        let response = send(
            &app,
            "POST",
            "/api/login",
            None,
            Some(json!({"username": identifier, "password": "hunter2hunter2"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_some());
        let body = body_json(response).await;
        assert_eq!(body["username"], "ana");
    }

    let response = send(
        &app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": "ana", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn logout_destroys_the_session() {
    let app = test_app();
    let cookie = register(&app, "ana").await;

    let response = send(&app, "POST", "/api/logout", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", "/api/user/profile", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[tokio::test]
async fn profile_requires_a_session_and_never_leaks_the_digest() {
    let app = test_app();

    let response = send(&app, "GET", "/api/user/profile", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let cookie = register(&app, "ana").await;
    let response = send(&app, "GET", "/api/user/profile", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["username"], "ana");
    assert_eq!(body["email"], "ana@example.com");
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());
}

// ---------------------------------------------------------------------------
// Admin guard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn admin_endpoints_are_forbidden_for_regular_accounts() {
    let app = test_app();
    register(&app, "root").await;
    let ana = register(&app, "ana").await;

    let response = send(&app, "GET", "/api/admin/users", Some(&ana), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");

    let response = send(&app, "GET", "/api/admin/users", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn demotion_takes_effect_on_the_next_request() {
    let app = test_app();
    let root = register(&app, "root").await;
    let ana = register(&app, "ana").await;

    let response = send(&app, "GET", "/api/user/profile", Some(&ana), None).await;
    let ana_id = body_json(response).await["id"].as_str().unwrap().to_string();

    // Promote: ana's existing session gains access immediately.
    let response = send(
        &app,
        "POST",
        "/api/admin/promote",
        Some(&root),
        Some(json!({"user_id": ana_id, "admin_level": 3})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", "/api/admin/users", Some(&ana), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Demote to 0: the very next request with the same session is refused.
    let response = send(
        &app,
        "POST",
        "/api/admin/promote",
        Some(&root),
        Some(json!({"user_id": ana_id, "admin_level": 0})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", "/api/admin/users", Some(&ana), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Promo codes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn promo_code_end_to_end() {
    let app = test_app();
    let root = register(&app, "root").await;
    let ana = register(&app, "ana").await;
    let bob = register(&app, "bob").await;

    let response = send(
        &app,
        "POST",
        "/api/admin/promo-code",
        Some(&root),
        Some(json!({"code": "WELCOME10", "reward": 10, "max_uses": 1})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Redemption is case-insensitive and credits exactly once.
    let response = send(
        &app,
        "POST",
        "/api/user/redeem-code",
        Some(&ana),
        Some(json!({"code": "welcome10"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["reward"], 10);

    let response = send(&app, "GET", "/api/user/profile", Some(&ana), None).await;
    assert_eq!(body_json(response).await["coins"], 110);

    // The single use is spent; nobody else gets past the boundary.
    let response = send(
        &app,
        "POST",
        "/api/user/redeem-code",
        Some(&bob),
        Some(json!({"code": "WELCOME10"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CODE_EXHAUSTED");

    let response = send(
        &app,
        "POST",
        "/api/user/redeem-code",
        Some(&bob),
        Some(json!({"code": "NO-SUCH-CODE"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "CODE_NOT_FOUND");

    // Admin listing shows usage and the creator.
    let response = send(&app, "GET", "/api/admin/promo-codes", Some(&root), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let promos = body.as_array().unwrap();
    assert_eq!(promos.len(), 1);
    assert_eq!(promos[0]["code"], "WELCOME10");
    assert_eq!(promos[0]["uses"], 1);
    assert_eq!(promos[0]["creator_username"], "root");
}

#[tokio::test]
async fn promo_creation_validates_and_rejects_duplicates() {
    let app = test_app();
    let root = register(&app, "root").await;

    let response = send(
        &app,
        "POST",
        "/api/admin/promo-code",
        Some(&root),
        Some(json!({"code": "FREE", "reward": 0, "max_uses": 1})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_REWARD");

    let response = send(
        &app,
        "POST",
        "/api/admin/promo-code",
        Some(&root),
        Some(json!({"code": "FREE", "reward": 5, "max_uses": 0})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/api/admin/promo-code",
        Some(&root),
        Some(json!({"code": "FREE", "reward": 5, "max_uses": -1})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Codes are case-insensitive, so this collides.
    let response = send(
        &app,
        "POST",
        "/api/admin/promo-code",
        Some(&root),
        Some(json!({"code": "free", "reward": 7, "max_uses": 2})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "DUPLICATE_CODE");
}

// ---------------------------------------------------------------------------
// Bans
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ban_blocks_login_until_unban() {
    let app = test_app();
    let root = register(&app, "root").await;
    let ana = register(&app, "ana").await;

    let response = send(&app, "GET", "/api/user/profile", Some(&ana), None).await;
    let ana_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        "POST",
        "/api/admin/ban",
        Some(&root),
        Some(json!({"user_id": ana_id, "reason": "spam", "duration_hours": 1})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": "ana", "password": "hunter2hunter2"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["code"], "ACCOUNT_BANNED");
    assert_eq!(body["ban_reason"], "spam");
    assert!(body["ban_expires"].is_string());

    // The pre-ban session keeps working for plain HTTP endpoints. Only
    // login and the chat pipeline re-check the ban.
    let response = send(&app, "GET", "/api/user/profile", Some(&ana), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "POST",
        "/api/admin/unban",
        Some(&root),
        Some(json!({"user_id": ana_id})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "POST",
        "/api/login",
        None,
        Some(json!({"username": "ana", "password": "hunter2hunter2"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn ban_validates_target_and_duration() {
    let app = test_app();
    let root = register(&app, "root").await;

    let response = send(
        &app,
        "POST",
        "/api/admin/ban",
        Some(&root),
        Some(json!({
            "user_id": "00000000-0000-0000-0000-000000000000",
            "reason": "spam",
            "duration_hours": 1,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, "GET", "/api/user/profile", Some(&root), None).await;
    let root_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        "POST",
        "/api/admin/ban",
        Some(&root),
        Some(json!({"user_id": root_id, "reason": "oops", "duration_hours": 0})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

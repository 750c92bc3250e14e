#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use primex_api::auth::jwt::JwtConfig;
use primex_api::auth::password::hash_password;
use primex_api::config::ServerConfig;
use primex_api::router::build_app_router;
use primex_api::state::AppState;

/// Build a test `ServerConfig` with fixed secrets and safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            account_secret: "test-account-secret-long-enough".to_string(),
            operator_secret: "test-operator-secret-long-enough".to_string(),
            refresh_secret: "test-refresh-secret-long-enough".to_string(),
            account_token_expiry_hours: 24,
            operator_token_expiry_hours: 24,
            refresh_token_expiry_days: 7,
        },
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool. Mirrors the router construction in `main.rs` so
/// integration tests exercise the same stack production uses.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
    token: Option<&str>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    app.oneshot(request).await.expect("request should complete")
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, None, Some(token)).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, Some(body), None).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, Method::POST, uri, Some(body), Some(token)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::POST, uri, None, Some(token)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, Method::PUT, uri, Some(body), Some(token)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::DELETE, uri, None, Some(token)).await
}

/// Read a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should read")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

// ---------------------------------------------------------------------------
// Seed helpers
// ---------------------------------------------------------------------------

/// Insert a plan with a delivery server assigned, returning its id.
pub async fn seed_plan(pool: &PgPool, name: &str, duration_days: i32) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO subscription_plans (name, duration_days, max_devices, server_id)
         VALUES ($1, $2, 2, 1) RETURNING id",
    )
    .bind(name)
    .bind(duration_days)
    .fetch_one(pool)
    .await
    .expect("plan insert should succeed")
}

pub async fn seed_channel(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO channels (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("channel insert should succeed")
}

/// Insert a code with an explicit token value, returning its id.
pub async fn seed_code(pool: &PgPool, code: &str, plan_id: i64, max_uses: i32) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO subscription_codes (code, duration_days, max_uses, plan_id)
         VALUES ($1, 30, $2, $3) RETURNING id",
    )
    .bind(code)
    .bind(max_uses)
    .bind(plan_id)
    .fetch_one(pool)
    .await
    .expect("code insert should succeed")
}

/// Create an operator with a real password hash and return (id, password).
pub async fn seed_operator(pool: &PgPool, username: &str, role: &str) -> (i64, String) {
    let password = "operator_password_123!".to_string();
    let hash = hash_password(&password).expect("hashing should succeed");
    let id = sqlx::query_scalar(
        "INSERT INTO operators (username, password_hash, role) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(username)
    .bind(&hash)
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("operator insert should succeed");
    (id, password)
}

/// Log an operator in via the API and return the bearer token.
pub async fn operator_token(app: Router, username: &str, password: &str) -> String {
    let body = serde_json::json!({ "username": username, "password": password });
    let response = post_json(app, "/api/v1/admin/auth/login", body).await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let json = body_json(response).await;
    json["token"]
        .as_str()
        .expect("login must return a token")
        .to_string()
}

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json, Router, routing::get, routing::post};
use chrono::Duration;
use iag_platform_access::{Identity, OAuthConfig, Provider, RoleSet, TokenCodec};
use iag_server::app::build_router;
use iag_server::auth::{AppState, OAuthClient};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const SIGNING_SECRET: &[u8] = b"integration-test-secret";

/// Code the mock provider exchanges successfully.
pub const GOOD_CODE: &str = "good-code";
/// Code the mock provider exchanges for a token its user-info endpoint refuses.
pub const REVOKED_CODE: &str = "revoked-code";

const ACCESS_TOKEN: &str = "mock-access-token";

pub async fn read_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub fn codec() -> TokenCodec {
    TokenCodec::new(SIGNING_SECRET, Duration::hours(1)).expect("codec")
}

pub fn token_for(roles: RoleSet) -> String {
    let identity = Identity::new(
        "user-1".to_string(),
        "user1@example.com".to_string(),
        "User One".to_string(),
        Provider::Google,
        roles,
    );
    codec().issue(&identity).expect("issue")
}

/// Builds a GET request, optionally carrying a bearer token.
pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    request("GET", uri, token)
}

pub fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

/// Returns the `Set-Cookie` header for `name`, if the response sets it.
pub fn set_cookie(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{name}=")))
        .map(str::to_string)
}

/// Returns the value part of a `Set-Cookie` header.
pub fn cookie_value(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, value)| value.to_string())
        .unwrap_or_default()
}

/// Builds a gateway wired to a provider at `provider`.
pub fn gateway(provider: SocketAddr, rbac: bool) -> Router {
    gateway_with_timeout(provider, rbac, 5)
}

/// Builds a gateway whose provider calls give up after `timeout_seconds`.
pub fn gateway_with_timeout(provider: SocketAddr, rbac: bool, timeout_seconds: u64) -> Router {
    let settings = OAuthConfig::builder(
        Provider::Google,
        "test-client".to_string(),
        "test-client-secret".to_string(),
        "http://localhost:8080/auth/callback".to_string(),
    )
    .endpoints(
        format!("http://{provider}/authorize"),
        format!("http://{provider}/token"),
        format!("http://{provider}/userinfo"),
    )
    .http_timeout_seconds(timeout_seconds)
    .build()
    .resolve()
    .expect("settings");

    let client = OAuthClient::new(&settings).expect("client");
    let state = AppState::new(Arc::new(client), codec())
        .with_secure_cookies(false)
        .with_rbac(rbac);
    build_router(Arc::new(state))
}

/// Builds a gateway whose provider is never contacted.
pub fn offline_gateway(rbac: bool) -> Router {
    gateway(SocketAddr::from(([127, 0, 0, 1], 9)), rbac)
}

/// Starts an in-process OAuth provider with Google-shaped user info.
pub async fn spawn_mock_provider() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    spawn_provider(
        Router::new()
            .route("/token", post(token_endpoint))
            .route("/userinfo", get(userinfo_endpoint)),
    )
    .await
}

/// Starts a provider whose token endpoint answers only after `delay`.
pub async fn spawn_stalled_provider(
    delay: std::time::Duration,
) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    spawn_provider(
        Router::new()
            .route(
                "/token",
                post(move |form: Form<HashMap<String, String>>| async move {
                    tokio::time::sleep(delay).await;
                    token_endpoint(form).await
                }),
            )
            .route("/userinfo", get(userinfo_endpoint)),
    )
    .await
}

/// Starts a provider whose user-info endpoint answers 200 with a JSON array.
pub async fn spawn_array_userinfo_provider() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    spawn_provider(
        Router::new()
            .route("/token", post(token_endpoint))
            .route(
                "/userinfo",
                get(|| async { Json(json!([{ "id": "108234567890" }])) }),
            ),
    )
    .await
}

async fn spawn_provider(app: Router) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let server = axum::serve(listener, app.into_make_service());
    let handle = tokio::spawn(async move {
        let _ = server.await;
    });
    (addr, handle)
}

async fn token_endpoint(Form(form): Form<HashMap<String, String>>) -> Response {
    let access_token = match form.get("code").map(String::as_str) {
        Some(GOOD_CODE) => ACCESS_TOKEN,
        Some(REVOKED_CODE) => "revoked-access-token",
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "invalid_grant",
                    "error_description": "authorization code is invalid or expired",
                })),
            )
                .into_response();
        }
    };

    Json(json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600,
    }))
    .into_response()
}

async fn userinfo_endpoint(headers: HeaderMap) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {ACCESS_TOKEN}"));
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid_token" })),
        )
            .into_response();
    }

    Json(json!({
        "id": "108234567890",
        "email": "alice@example.com",
        "verified_email": true,
        "name": "Alice Example",
        "picture": "https://example.com/alice.png",
    }))
    .into_response()
}

//! Shared helpers for HTTP-level integration tests.
//!
//! Requests go through `tower::ServiceExt::oneshot` against the same
//! router the binary builds, so every test exercises the production
//! middleware stack. The mock provider is a real HTTP server on an
//! ephemeral port, since the provider client speaks real HTTP.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, Response, StatusCode};
use axum::routing::{get as routing_get, post};
use axum::{Json, Router};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tower::ServiceExt;

use reelgen_api::auth::jwt::JwtConfig;
use reelgen_api::config::ServerConfig;
use reelgen_api::router::build_app_router;
use reelgen_api::state::AppState;
use reelgen_provider::ProviderClient;

/// Build a test `ServerConfig` pointing the provider client at `provider_url`.
pub fn test_config(provider_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        poll_interval_secs: 3600,
        jwt: JwtConfig {
            secret: "integration-test-secret-key".to_string(),
            access_token_expiry_mins: 60,
        },
        provider_api_url: provider_url.to_string(),
        admin_token: Some("test-admin-token".to_string()),
    }
}

/// Build the application router with an unreachable provider.
///
/// Port 9 (discard) refuses connections, so any submission attempt fails
/// as provider-unavailable.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_provider(pool, "http://127.0.0.1:9")
}

/// Build the application router against a specific provider base URL
/// (usually a [`spawn_mock_provider`] instance).
pub fn build_test_app_with_provider(pool: PgPool, provider_url: &str) -> Router {
    let config = test_config(provider_url);
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        provider: Arc::new(ProviderClient::new(provider_url.to_string())),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_empty_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body into parsed JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Account helpers
// ---------------------------------------------------------------------------

/// Register a user through the API and return `(access_token, response_json)`.
pub async fn register_user(app: Router, username: &str, password: &str) -> (String, serde_json::Value) {
    let body = serde_json::json!({ "username": username, "password": password });
    let response = post_json(app, "/api/v1/auth/register", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let token = json["access_token"].as_str().unwrap().to_string();
    (token, json)
}

/// Set a user's credit balance directly (test setup only).
pub async fn set_credits(pool: &PgPool, username: &str, credits: i32) {
    sqlx::query("UPDATE users SET credits = $2 WHERE username = $1")
        .bind(username)
        .bind(credits)
        .execute(pool)
        .await
        .expect("credit update should succeed");
}

/// Read a user's credit balance directly.
pub async fn credits_of(pool: &PgPool, username: &str) -> i32 {
    sqlx::query_scalar::<_, i32>("SELECT credits FROM users WHERE username = $1")
        .bind(username)
        .fetch_one(pool)
        .await
        .expect("credit lookup should succeed")
}

/// Seed an active provider credential with plenty of capacity.
pub async fn seed_provider_key(pool: &PgPool) {
    use reelgen_db::models::provider_key::CreateProviderKey;
    use reelgen_db::repositories::ProviderKeyRepo;

    ProviderKeyRepo::create(
        pool,
        &CreateProviderKey {
            name: "test pool key".to_string(),
            secret: "sk-test-0001".to_string(),
            remaining_credits: 1000,
        },
    )
    .await
    .expect("key creation should succeed");
}

// ---------------------------------------------------------------------------
// Mock provider
// ---------------------------------------------------------------------------

/// In-memory state behind the mock provider HTTP server.
#[derive(Clone, Default)]
pub struct MockProvider {
    /// Bodies of every accepted submission, in order.
    pub submissions: Arc<Mutex<Vec<serde_json::Value>>>,
    /// Status payload served for each task id; defaults to `processing`.
    pub statuses: Arc<Mutex<HashMap<String, serde_json::Value>>>,
    counter: Arc<AtomicU64>,
}

impl MockProvider {
    /// Set the status payload returned by `GET /tasks/{id}`.
    pub async fn set_status(&self, task_id: &str, payload: serde_json::Value) {
        self.statuses
            .lock()
            .await
            .insert(task_id.to_string(), payload);
    }

    fn next_task_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}-{n}")
    }
}

async fn mock_submit(
    State(mock): State<MockProvider>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    mock.submissions.lock().await.push(body);
    let task_id = mock.next_task_id("mock-task");
    Json(serde_json::json!({ "task_id": task_id }))
}

async fn mock_enhance(
    State(mock): State<MockProvider>,
    Path(_source): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    mock.submissions.lock().await.push(body);
    let task_id = mock.next_task_id("mock-enhance");
    Json(serde_json::json!({ "task_id": task_id }))
}

async fn mock_status(
    State(mock): State<MockProvider>,
    Path(task_id): Path<String>,
) -> Json<serde_json::Value> {
    let statuses = mock.statuses.lock().await;
    let payload = statuses
        .get(&task_id)
        .cloned()
        .unwrap_or_else(|| serde_json::json!({ "status": "processing" }));
    Json(payload)
}

/// Start a mock provider HTTP server on an ephemeral port.
///
/// Returns the handle for scripting responses and the base URL to point
/// the provider client at. The server task lives until the test's runtime
/// shuts down.
pub async fn spawn_mock_provider() -> (MockProvider, String) {
    let mock = MockProvider::default();

    let router = Router::new()
        .route("/tasks", post(mock_submit))
        .route("/tasks/{id}", routing_get(mock_status))
        .route("/tasks/{id}/enhance", post(mock_enhance))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("mock provider should bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (mock, format!("http://{addr}"))
}

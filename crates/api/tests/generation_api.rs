//! HTTP-level integration tests for the generation lifecycle: submission,
//! credit accounting, provider callbacks, and the enhancement stage.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, credits_of, get_auth, post_empty_auth, post_json, post_json_auth, register_user,
    seed_provider_key, set_credits, spawn_mock_provider,
};
use reelgen_core::credits::{ENHANCEMENT_COST, STARTING_CREDITS};
use sqlx::PgPool;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A valid text-to-video submission body (veo3, cost 5).
fn veo3_body() -> serde_json::Value {
    serde_json::json!({
        "kind": "text_to_video",
        "prompt": "a slow pan over a foggy mountain lake at dawn",
        "model": "veo3"
    })
}

const VEO3_COST: i32 = 5;

/// Submit a job and return its response `data` object.
async fn submit_job(app: axum::Router, token: &str) -> serde_json::Value {
    let response = post_json_auth(app, "/api/v1/generations", token, veo3_body()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

/// Look up the provider task id attached to a job.
async fn task_id_of(pool: &PgPool, public_id: &str) -> Option<String> {
    let id: Uuid = public_id.parse().unwrap();
    sqlx::query_scalar::<_, Option<String>>("SELECT task_id FROM generations WHERE public_id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("generation should exist")
}

/// Deliver a provider callback and assert it is acknowledged.
async fn deliver_callback(app: axum::Router, payload: serde_json::Value) {
    let response = post_json(app, "/api/v1/callbacks/generation", payload).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

// ---------------------------------------------------------------------------
// Submission guards
// ---------------------------------------------------------------------------

/// A validation failure returns 422 and leaves no trace: no row, no debit.
#[sqlx::test(migrations = "../db/migrations")]
async fn invalid_params_leave_no_trace(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (token, _) = register_user(app.clone(), "validator", "a-solid-password").await;

    let body = serde_json::json!({
        "kind": "text_to_video",
        "prompt": "too short",
        "model": "veo3"
    });
    let response = post_json_auth(app.clone(), "/api/v1/generations", &token, body).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    assert_eq!(credits_of(&pool, "validator").await, STARTING_CREDITS);

    let list = get_auth(app, "/api/v1/generations", &token).await;
    let list_json = body_json(list).await;
    assert_eq!(list_json["data"].as_array().unwrap().len(), 0);
}

/// An insufficient balance returns 402 before any state change.
#[sqlx::test(migrations = "../db/migrations")]
async fn insufficient_credits_rejected_without_side_effects(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (token, _) = register_user(app.clone(), "broke_user", "a-solid-password").await;
    set_credits(&pool, "broke_user", VEO3_COST - 1).await;

    let response = post_json_auth(app.clone(), "/api/v1/generations", &token, veo3_body()).await;

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INSUFFICIENT_CREDITS");

    // Balance untouched, no job row created.
    assert_eq!(credits_of(&pool, "broke_user").await, VEO3_COST - 1);
    let list = get_auth(app, "/api/v1/generations", &token).await;
    let list_json = body_json(list).await;
    assert_eq!(list_json["data"].as_array().unwrap().len(), 0);
}

/// With no usable provider credential the job settles as failed and the
/// reservation is refunded.
#[sqlx::test(migrations = "../db/migrations")]
async fn missing_credential_fails_job_and_refunds(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (token, _) = register_user(app.clone(), "keyless", "a-solid-password").await;

    let data = submit_job(app, &token).await;

    assert_eq!(data["status"], "failed");
    assert_eq!(data["credits_used"], VEO3_COST);
    assert!(data["error_message"].is_string());
    assert_eq!(credits_of(&pool, "keyless").await, STARTING_CREDITS);
}

/// An unreachable provider also settles the job as failed with a refund.
#[sqlx::test(migrations = "../db/migrations")]
async fn unreachable_provider_fails_job_and_refunds(pool: PgPool) {
    seed_provider_key(&pool).await;
    let app = common::build_test_app(pool.clone());
    let (token, _) = register_user(app.clone(), "offline", "a-solid-password").await;

    let data = submit_job(app, &token).await;

    assert_eq!(data["status"], "failed");
    assert_eq!(credits_of(&pool, "offline").await, STARTING_CREDITS);
}

// ---------------------------------------------------------------------------
// Happy path and callback idempotency
// ---------------------------------------------------------------------------

/// A successful submission stays pending with the cost debited, and a
/// success callback settles it without touching the balance again.
#[sqlx::test(migrations = "../db/migrations")]
async fn submit_then_success_callback(pool: PgPool) {
    seed_provider_key(&pool).await;
    let (_mock, provider_url) = spawn_mock_provider().await;
    let app = common::build_test_app_with_provider(pool.clone(), &provider_url);
    let (token, _) = register_user(app.clone(), "happy_path", "a-solid-password").await;

    let data = submit_job(app.clone(), &token).await;
    assert_eq!(data["status"], "pending");
    assert_eq!(credits_of(&pool, "happy_path").await, STARTING_CREDITS - VEO3_COST);

    let public_id = data["id"].as_str().unwrap().to_string();
    let task_id = task_id_of(&pool, &public_id).await.expect("task attached");

    deliver_callback(
        app.clone(),
        serde_json::json!({
            "task_id": task_id,
            "status": "succeeded",
            "result_urls": ["https://cdn.example.com/out.mp4"]
        }),
    )
    .await;

    let detail = get_auth(app, &format!("/api/v1/generations/{public_id}"), &token).await;
    let detail_json = body_json(detail).await;
    assert_eq!(detail_json["data"]["status"], "succeeded");
    assert_eq!(
        detail_json["data"]["result_urls"][0],
        "https://cdn.example.com/out.mp4"
    );

    // Success keeps the debit in place.
    assert_eq!(credits_of(&pool, "happy_path").await, STARTING_CREDITS - VEO3_COST);
}

/// Redelivered and contradictory callbacks after a terminal state are
/// no-ops: the first terminal update wins.
#[sqlx::test(migrations = "../db/migrations")]
async fn terminal_callbacks_are_idempotent(pool: PgPool) {
    seed_provider_key(&pool).await;
    let (_mock, provider_url) = spawn_mock_provider().await;
    let app = common::build_test_app_with_provider(pool.clone(), &provider_url);
    let (token, _) = register_user(app.clone(), "idempotent", "a-solid-password").await;

    let data = submit_job(app.clone(), &token).await;
    let public_id = data["id"].as_str().unwrap().to_string();
    let task_id = task_id_of(&pool, &public_id).await.unwrap();

    let success = serde_json::json!({
        "task_id": task_id,
        "status": "succeeded",
        "result_urls": ["https://cdn.example.com/first.mp4"]
    });
    deliver_callback(app.clone(), success.clone()).await;
    // Duplicate delivery.
    deliver_callback(app.clone(), success).await;
    // Contradictory failure report after success.
    deliver_callback(
        app.clone(),
        serde_json::json!({ "task_id": task_id, "status": "failed", "error": "late failure" }),
    )
    .await;

    let detail = get_auth(app, &format!("/api/v1/generations/{public_id}"), &token).await;
    let detail_json = body_json(detail).await;
    assert_eq!(detail_json["data"]["status"], "succeeded");
    assert!(detail_json["data"]["error_message"].is_null());

    // No refund happened: success keeps the debit, and the late failure
    // report must not credit anything back.
    assert_eq!(credits_of(&pool, "idempotent").await, STARTING_CREDITS - VEO3_COST);
}

/// A failure callback refunds exactly once, no matter how often it is
/// redelivered.
#[sqlx::test(migrations = "../db/migrations")]
async fn failure_callback_refunds_exactly_once(pool: PgPool) {
    seed_provider_key(&pool).await;
    let (_mock, provider_url) = spawn_mock_provider().await;
    let app = common::build_test_app_with_provider(pool.clone(), &provider_url);
    let (token, _) = register_user(app.clone(), "refunded", "a-solid-password").await;

    let data = submit_job(app.clone(), &token).await;
    let public_id = data["id"].as_str().unwrap().to_string();
    let task_id = task_id_of(&pool, &public_id).await.unwrap();
    assert_eq!(credits_of(&pool, "refunded").await, STARTING_CREDITS - VEO3_COST);

    let failure = serde_json::json!({
        "task_id": task_id,
        "status": "failed",
        "error": "content policy violation"
    });
    deliver_callback(app.clone(), failure.clone()).await;
    deliver_callback(app.clone(), failure.clone()).await;
    deliver_callback(app.clone(), failure).await;

    let detail = get_auth(app, &format!("/api/v1/generations/{public_id}"), &token).await;
    let detail_json = body_json(detail).await;
    assert_eq!(detail_json["data"]["status"], "failed");
    assert_eq!(detail_json["data"]["error_message"], "content policy violation");

    assert_eq!(credits_of(&pool, "refunded").await, STARTING_CREDITS);
}

/// Callbacks for unknown tasks are acknowledged and dropped.
#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_task_callback_is_dropped(pool: PgPool) {
    let app = common::build_test_app(pool);

    deliver_callback(
        app,
        serde_json::json!({
            "task_id": "never-heard-of-it",
            "status": "succeeded",
            "result_urls": ["https://cdn.example.com/ghost.mp4"]
        }),
    )
    .await;
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Another user's job returns the same 404 as a nonexistent one.
#[sqlx::test(migrations = "../db/migrations")]
async fn jobs_are_not_visible_across_users(pool: PgPool) {
    seed_provider_key(&pool).await;
    let (_mock, provider_url) = spawn_mock_provider().await;
    let app = common::build_test_app_with_provider(pool.clone(), &provider_url);

    let (owner_token, _) = register_user(app.clone(), "job_owner", "a-solid-password").await;
    let (other_token, _) = register_user(app.clone(), "job_snoop", "a-solid-password").await;

    let data = submit_job(app.clone(), &owner_token).await;
    let public_id = data["id"].as_str().unwrap();

    let uri = format!("/api/v1/generations/{public_id}");
    let owner_view = get_auth(app.clone(), &uri, &owner_token).await;
    assert_eq!(owner_view.status(), StatusCode::OK);

    let other_view = get_auth(app.clone(), &uri, &other_token).await;
    assert_eq!(other_view.status(), StatusCode::NOT_FOUND);

    let missing = get_auth(
        app,
        &format!("/api/v1/generations/{}", Uuid::new_v4()),
        &other_token,
    )
    .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Enhancement
// ---------------------------------------------------------------------------

/// Drive a job to `succeeded` via submit + callback, returning its public id.
async fn succeeded_job(app: axum::Router, pool: &PgPool, token: &str) -> String {
    let data = submit_job(app.clone(), token).await;
    let public_id = data["id"].as_str().unwrap().to_string();
    let task_id = task_id_of(pool, &public_id).await.unwrap();

    deliver_callback(
        app,
        serde_json::json!({
            "task_id": task_id,
            "status": "succeeded",
            "result_urls": ["https://cdn.example.com/base.mp4"]
        }),
    )
    .await;
    public_id
}

/// Enhancement starts on a succeeded job, debits its own cost, and a
/// second attempt while in flight returns 409 without another debit.
#[sqlx::test(migrations = "../db/migrations")]
async fn enhancement_starts_once(pool: PgPool) {
    seed_provider_key(&pool).await;
    let (_mock, provider_url) = spawn_mock_provider().await;
    let app = common::build_test_app_with_provider(pool.clone(), &provider_url);
    let (token, _) = register_user(app.clone(), "enhancer", "a-solid-password").await;

    let public_id = succeeded_job(app.clone(), &pool, &token).await;
    let after_generation = credits_of(&pool, "enhancer").await;

    let uri = format!("/api/v1/generations/{public_id}/enhance");
    let response = post_empty_auth(app.clone(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["enhancement_status"], "running");
    assert_eq!(
        credits_of(&pool, "enhancer").await,
        after_generation - ENHANCEMENT_COST
    );

    // Second start while running: rejected, no extra debit.
    let again = post_empty_auth(app, &uri, &token).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
    assert_eq!(
        credits_of(&pool, "enhancer").await,
        after_generation - ENHANCEMENT_COST
    );
}

/// An enhancement success callback settles the run with its result URLs.
#[sqlx::test(migrations = "../db/migrations")]
async fn enhancement_success_callback_settles_run(pool: PgPool) {
    seed_provider_key(&pool).await;
    let (_mock, provider_url) = spawn_mock_provider().await;
    let app = common::build_test_app_with_provider(pool.clone(), &provider_url);
    let (token, _) = register_user(app.clone(), "enh_done", "a-solid-password").await;

    let public_id = succeeded_job(app.clone(), &pool, &token).await;

    let uri = format!("/api/v1/generations/{public_id}/enhance");
    let response = post_empty_auth(app.clone(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let id: Uuid = public_id.parse().unwrap();
    let enh_task_id = sqlx::query_scalar::<_, Option<String>>(
        "SELECT enhancement_task_id FROM generations WHERE public_id = $1",
    )
    .bind(id)
    .fetch_one(&pool)
    .await
    .unwrap()
    .expect("enhancement task attached");

    deliver_callback(
        app.clone(),
        serde_json::json!({
            "task_id": enh_task_id,
            "status": "succeeded",
            "result_urls": ["https://cdn.example.com/enhanced.mp4"]
        }),
    )
    .await;

    let detail = get_auth(app, &format!("/api/v1/generations/{public_id}"), &token).await;
    let detail_json = body_json(detail).await;
    assert_eq!(detail_json["data"]["enhancement_status"], "succeeded");
    assert_eq!(
        detail_json["data"]["enhanced_result_urls"][0],
        "https://cdn.example.com/enhanced.mp4"
    );
}

/// Enhancement on a non-succeeded job is rejected with 409.
#[sqlx::test(migrations = "../db/migrations")]
async fn enhancement_requires_succeeded_job(pool: PgPool) {
    seed_provider_key(&pool).await;
    let (_mock, provider_url) = spawn_mock_provider().await;
    let app = common::build_test_app_with_provider(pool.clone(), &provider_url);
    let (token, _) = register_user(app.clone(), "enh_early", "a-solid-password").await;

    // Still pending: no callback delivered.
    let data = submit_job(app.clone(), &token).await;
    let public_id = data["id"].as_str().unwrap();

    let uri = format!("/api/v1/generations/{public_id}/enhance");
    let response = post_empty_auth(app, &uri, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

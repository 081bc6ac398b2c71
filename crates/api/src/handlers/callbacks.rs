//! Push-callback endpoint for provider status delivery.
//!
//! The provider retries callbacks on non-2xx responses, so this endpoint
//! acknowledges everything it can parse as JSON with 204, including
//! payloads it drops (unknown task, uninterpretable status). Dropped
//! payloads are recovered by the poller on its next pass; a retry storm
//! from the provider buys nothing.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use reelgen_provider::{CallbackPayload, TaskState};

use crate::engine::tracker;
use crate::state::AppState;

/// POST /api/v1/callbacks/generation
///
/// Apply a provider status callback. The same payload shape serves both
/// primary tasks and enhancement runs; the task identifier decides which
/// lifecycle it belongs to.
pub async fn provider_callback(
    State(state): State<AppState>,
    Json(payload): Json<CallbackPayload>,
) -> StatusCode {
    let Some(task_state) = TaskState::from_payload(&payload.status) else {
        tracing::warn!(
            task_id = %payload.task_id,
            status = %payload.status.status,
            "Callback with uninterpretable status, dropping"
        );
        return StatusCode::NO_CONTENT;
    };

    // Enhancement task ids and primary task ids live in different unique
    // columns; route by which one matches.
    let result = match reelgen_db::repositories::GenerationRepo::find_by_task_id(
        &state.pool,
        &payload.task_id,
    )
    .await
    {
        Ok(Some(_)) => tracker::apply_task_update(&state.pool, &payload.task_id, task_state).await,
        Ok(None) => {
            tracker::apply_enhancement_update(&state.pool, &payload.task_id, task_state).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        // Still 204: the poller is the backstop and the provider retrying
        // an update we failed to persist would race it.
        tracing::error!(error = %e, task_id = %payload.task_id, "Failed to apply callback");
    }

    StatusCode::NO_CONTENT
}

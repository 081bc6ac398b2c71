//! Handlers for the `/generations` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use reelgen_core::error::CoreError;
use reelgen_core::generation::GenerationParams;
use reelgen_db::models::generation::{GenerationListQuery, GenerationResponse};
use reelgen_db::repositories::GenerationRepo;
use uuid::Uuid;

use crate::engine::tracker;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/generations
///
/// Submit a new generation job. Validation failures return 422 and an
/// insufficient balance returns 402, both before any state changes. The
/// created job is returned as accepted even when submission to the
/// provider failed; in that case its status is already `failed` and the
/// reservation has been refunded.
pub async fn submit(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(params): Json<GenerationParams>,
) -> AppResult<(StatusCode, Json<DataResponse<GenerationResponse>>)> {
    let generation =
        tracker::submit_generation(&state.pool, &state.provider, auth.user_id, &params).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(GenerationResponse::from(&generation))),
    ))
}

/// GET /api/v1/generations
///
/// List the caller's jobs, newest first. Supports `limit` (default 50,
/// capped at 100) and `offset`.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<GenerationListQuery>,
) -> AppResult<Json<DataResponse<Vec<GenerationResponse>>>> {
    let generations = GenerationRepo::list_by_user(&state.pool, auth.user_id, &query).await?;
    let responses = generations.iter().map(GenerationResponse::from).collect();
    Ok(Json(DataResponse::new(responses)))
}

/// GET /api/v1/generations/{public_id}
///
/// Fetch one of the caller's jobs. Jobs belonging to other users return
/// the same 404 as a nonexistent ID.
pub async fn get_by_id(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(public_id): Path<Uuid>,
) -> AppResult<Json<DataResponse<GenerationResponse>>> {
    let generation = GenerationRepo::find_by_public_id(&state.pool, public_id)
        .await?
        .filter(|g| g.user_id == Some(auth.user_id))
        .ok_or_else(|| CoreError::NotFound {
            entity: "generation",
            id: public_id.to_string(),
        })?;

    Ok(Json(DataResponse::new(GenerationResponse::from(&generation))))
}

/// POST /api/v1/generations/{public_id}/enhance
///
/// Start the enhancement stage on a succeeded job. Returns 202 with the
/// updated job; 409 when the job is not succeeded or a run is already in
/// flight, 402 when the enhancement cost cannot be reserved.
pub async fn enhance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(public_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<DataResponse<GenerationResponse>>)> {
    let generation =
        tracker::submit_enhancement(&state.pool, &state.provider, auth.user_id, public_id).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse::new(GenerationResponse::from(&generation))),
    ))
}

//! Handlers for the `/rewards` resource (watch-to-earn credits).

use axum::extract::{Path, State};
use axum::Json;
use reelgen_core::error::CoreError;
use reelgen_core::types::DbId;
use reelgen_db::models::reward::{RecordWatch, RewardVideo, RewardWatch};
use reelgen_db::repositories::{RewardRepo, UserRepo};
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Response for a granted reward claim.
#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub credits_granted: i32,
    pub watch: RewardWatch,
}

/// GET /api/v1/rewards
///
/// List active reward videos.
pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<DataResponse<Vec<RewardVideo>>>> {
    let videos = RewardRepo::list_active(&state.pool).await?;
    Ok(Json(DataResponse::new(videos)))
}

/// POST /api/v1/rewards/{id}/watch
///
/// Record watch progress. Progress only moves forward; completion latches
/// once the reported time reaches the video duration.
pub async fn watch(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(video_id): Path<DbId>,
    Json(input): Json<RecordWatch>,
) -> AppResult<Json<DataResponse<RewardWatch>>> {
    if input.watched_secs < 0 {
        return Err(CoreError::Validation("watched_secs must not be negative".into()).into());
    }

    let video = RewardRepo::find_video(&state.pool, video_id)
        .await?
        .filter(|v| v.is_active)
        .ok_or_else(|| CoreError::NotFound {
            entity: "reward video",
            id: video_id.to_string(),
        })?;

    let watch = RewardRepo::record_watch(
        &state.pool,
        auth.user_id,
        video.id,
        input.watched_secs,
        video.duration_secs,
    )
    .await?;

    Ok(Json(DataResponse::new(watch)))
}

/// POST /api/v1/rewards/{id}/claim
///
/// Claim the credit reward for a completed watch. The claim flag flips in
/// the same statement that grants it, so repeating the request returns
/// 409 instead of paying twice.
pub async fn claim(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(video_id): Path<DbId>,
) -> AppResult<Json<DataResponse<ClaimResponse>>> {
    let video = RewardRepo::find_video(&state.pool, video_id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "reward video",
            id: video_id.to_string(),
        })?;

    let watch = RewardRepo::claim(&state.pool, auth.user_id, video.id)
        .await?
        .ok_or_else(|| {
            CoreError::Conflict("reward not claimable (incomplete or already claimed)".into())
        })?;

    UserRepo::refund_credits(&state.pool, auth.user_id, video.credits_reward).await?;

    tracing::info!(
        user_id = auth.user_id,
        video_id = video.id,
        credits = video.credits_reward,
        "Reward claimed"
    );

    Ok(Json(DataResponse::new(ClaimResponse {
        credits_granted: video.credits_reward,
        watch,
    })))
}

//! Reward video models and DTOs (watch-to-earn credit flow).

use reelgen_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `reward_videos` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RewardVideo {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub duration_secs: i32,
    pub credits_reward: i32,
    pub is_active: bool,
    pub created_at: Timestamp,
}

/// A row from the `reward_watches` table. One row per (user, video).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RewardWatch {
    pub id: DbId,
    pub user_id: DbId,
    pub reward_video_id: DbId,
    pub watched_secs: i32,
    pub is_completed: bool,
    pub reward_claimed: bool,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// Body for `POST /rewards/{id}/watch`.
#[derive(Debug, Deserialize)]
pub struct RecordWatch {
    pub watched_secs: i32,
}

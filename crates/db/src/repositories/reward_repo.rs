//! Repository for reward videos and watch progress.
//!
//! Claiming follows the same conditional-update pattern as job refunds:
//! the claim flag flips in the statement that grants it, so a reward is
//! paid out at most once per (user, video).

use reelgen_core::types::DbId;
use sqlx::PgPool;

use crate::models::reward::{RewardVideo, RewardWatch};

const VIDEO_COLUMNS: &str = "id, title, description, video_url, thumbnail_url, \
                             duration_secs, credits_reward, is_active, created_at";

const WATCH_COLUMNS: &str = "id, user_id, reward_video_id, watched_secs, is_completed, \
                             reward_claimed, started_at, completed_at";

/// Provides reward-video and watch-history operations.
pub struct RewardRepo;

impl RewardRepo {
    /// List active reward videos, newest first.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<RewardVideo>, sqlx::Error> {
        let query = format!(
            "SELECT {VIDEO_COLUMNS} FROM reward_videos \
             WHERE is_active = TRUE ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, RewardVideo>(&query).fetch_all(pool).await
    }

    /// Find a reward video by ID.
    pub async fn find_video(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<RewardVideo>, sqlx::Error> {
        let query = format!("SELECT {VIDEO_COLUMNS} FROM reward_videos WHERE id = $1");
        sqlx::query_as::<_, RewardVideo>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Record watch progress, upserting the (user, video) row.
    ///
    /// Progress only moves forward (`GREATEST`), and completion latches on
    /// once `watched_secs` reaches the video duration.
    pub async fn record_watch(
        pool: &PgPool,
        user_id: DbId,
        video_id: DbId,
        watched_secs: i32,
        duration_secs: i32,
    ) -> Result<RewardWatch, sqlx::Error> {
        let query = format!(
            "INSERT INTO reward_watches (user_id, reward_video_id, watched_secs, is_completed, completed_at) \
             VALUES ($1, $2, $3, $3 >= $4, CASE WHEN $3 >= $4 THEN NOW() END) \
             ON CONFLICT (user_id, reward_video_id) DO UPDATE SET \
                 watched_secs = GREATEST(reward_watches.watched_secs, EXCLUDED.watched_secs), \
                 is_completed = reward_watches.is_completed OR EXCLUDED.is_completed, \
                 completed_at = COALESCE(reward_watches.completed_at, EXCLUDED.completed_at) \
             RETURNING {WATCH_COLUMNS}"
        );
        sqlx::query_as::<_, RewardWatch>(&query)
            .bind(user_id)
            .bind(video_id)
            .bind(watched_secs)
            .bind(duration_secs)
            .fetch_one(pool)
            .await
    }

    /// Claim the reward for a completed watch.
    ///
    /// Returns the watch row when the claim was granted, `None` when there
    /// is nothing to claim (not completed, or already claimed).
    pub async fn claim(
        pool: &PgPool,
        user_id: DbId,
        video_id: DbId,
    ) -> Result<Option<RewardWatch>, sqlx::Error> {
        let query = format!(
            "UPDATE reward_watches SET reward_claimed = TRUE \
             WHERE user_id = $1 AND reward_video_id = $2 \
               AND is_completed = TRUE AND reward_claimed = FALSE \
             RETURNING {WATCH_COLUMNS}"
        );
        sqlx::query_as::<_, RewardWatch>(&query)
            .bind(user_id)
            .bind(video_id)
            .fetch_optional(pool)
            .await
    }
}

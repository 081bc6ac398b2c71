//! Repository for the `generations` table.
//!
//! The lifecycle tracker is the sole writer of status transitions, and
//! every transition method here is a conditional UPDATE guarded on the
//! current status. A guard that matches zero rows means the transition was
//! already applied (or the job is terminal) and the caller treats it as an
//! idempotent no-op. No method accepts a free-form partial update.

use reelgen_core::generation::{EnhancementStatus, GenerationStatus};
use reelgen_core::types::DbId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::generation::{CreateGeneration, Generation, GenerationListQuery};

/// Column list for `generations` queries.
const COLUMNS: &str = "\
    id, public_id, user_id, task_id, kind, prompt, image_url, mask_image_url, \
    strength, samples, steps, scheduler, aspect_ratio, model, watermark, \
    hd_generation, status, result_urls, hd_result_url, error_message, \
    credits_used, credits_refunded, provider_key_id, created_at, completed_at, \
    enhancement_status, enhancement_task_id, enhanced_result_urls, \
    enhancement_error, enhancement_credits, enhancement_credits_refunded, \
    enhancement_started_at, enhancement_completed_at";

/// Maximum page size for generation listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for generation listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides persistence for generation jobs.
pub struct GenerationRepo;

impl GenerationRepo {
    /// Insert a new job in `pending` status with its cost fixed.
    pub async fn create(
        pool: &PgPool,
        input: &CreateGeneration,
    ) -> Result<Generation, sqlx::Error> {
        let query = format!(
            "INSERT INTO generations \
                 (user_id, kind, prompt, image_url, mask_image_url, strength, \
                  samples, steps, scheduler, aspect_ratio, model, watermark, \
                  hd_generation, status, credits_used, provider_key_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(input.user_id)
            .bind(&input.kind)
            .bind(&input.prompt)
            .bind(&input.image_url)
            .bind(&input.mask_image_url)
            .bind(&input.strength)
            .bind(input.samples)
            .bind(input.steps)
            .bind(&input.scheduler)
            .bind(&input.aspect_ratio)
            .bind(&input.model)
            .bind(&input.watermark)
            .bind(input.hd_generation)
            .bind(GenerationStatus::Pending.as_str())
            .bind(input.credits_used)
            .bind(input.provider_key_id)
            .fetch_one(pool)
            .await
    }

    /// Find a job by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generations WHERE id = $1");
        sqlx::query_as::<_, Generation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a job by external (public) ID.
    pub async fn find_by_public_id(
        pool: &PgPool,
        public_id: Uuid,
    ) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generations WHERE public_id = $1");
        sqlx::query_as::<_, Generation>(&query)
            .bind(public_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a job by the provider's task identifier.
    pub async fn find_by_task_id(
        pool: &PgPool,
        task_id: &str,
    ) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generations WHERE task_id = $1");
        sqlx::query_as::<_, Generation>(&query)
            .bind(task_id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's jobs, newest first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
        params: &GenerationListQuery,
    ) -> Result<Vec<Generation>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        let query = format!(
            "SELECT {COLUMNS} FROM generations \
             WHERE user_id = $1 \
             ORDER BY created_at DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Non-terminal jobs that have a provider task attached (poll targets).
    pub async fn list_active_tasks(pool: &PgPool) -> Result<Vec<Generation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generations \
             WHERE status IN ($1, $2) AND task_id IS NOT NULL \
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(GenerationStatus::Pending.as_str())
            .bind(GenerationStatus::Running.as_str())
            .fetch_all(pool)
            .await
    }

    /// Jobs with an enhancement run in flight (enhancement poll targets).
    pub async fn list_active_enhancements(pool: &PgPool) -> Result<Vec<Generation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generations \
             WHERE enhancement_status = $1 AND enhancement_task_id IS NOT NULL \
             ORDER BY enhancement_started_at ASC"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(EnhancementStatus::Running.as_str())
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Primary lifecycle transitions
    // -----------------------------------------------------------------------

    /// Record the provider's task identifier and the credential it was
    /// submitted under, after a successful submission.
    pub async fn attach_task(
        pool: &PgPool,
        id: DbId,
        task_id: &str,
        provider_key_id: Option<DbId>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generations SET task_id = $2, provider_key_id = $3 \
             WHERE id = $1 AND task_id IS NULL",
        )
        .bind(id)
        .bind(task_id)
        .bind(provider_key_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Move `pending -> running`. Applying this to any other state is a
    /// no-op, which makes racing in-progress reports harmless.
    pub async fn mark_running(pool: &PgPool, task_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generations SET status = $2 WHERE task_id = $1 AND status = $3",
        )
        .bind(task_id)
        .bind(GenerationStatus::Running.as_str())
        .bind(GenerationStatus::Pending.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Terminal success: store result URLs and complete the job.
    ///
    /// Returns the updated row when the transition applied, `None` when the
    /// job was already terminal (idempotent re-delivery).
    pub async fn complete(
        pool: &PgPool,
        task_id: &str,
        result_urls: &serde_json::Value,
        hd_result_url: Option<&str>,
    ) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!(
            "UPDATE generations \
             SET status = $2, result_urls = $3, hd_result_url = $4, completed_at = NOW() \
             WHERE task_id = $1 AND status IN ($5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(task_id)
            .bind(GenerationStatus::Succeeded.as_str())
            .bind(result_urls)
            .bind(hd_result_url)
            .bind(GenerationStatus::Pending.as_str())
            .bind(GenerationStatus::Running.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Terminal failure by task ID.
    ///
    /// Flips `credits_refunded` in the same statement so the transition and
    /// the refund marker are one atomic read-modify-write; at most one call
    /// ever gets the row back, so the caller refunds at most once.
    pub async fn fail_by_task(
        pool: &PgPool,
        task_id: &str,
        error_message: &str,
    ) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!(
            "UPDATE generations \
             SET status = $2, error_message = $3, completed_at = NOW(), \
                 credits_refunded = TRUE \
             WHERE task_id = $1 AND status IN ($4, $5) AND credits_refunded = FALSE \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(task_id)
            .bind(GenerationStatus::Failed.as_str())
            .bind(error_message)
            .bind(GenerationStatus::Pending.as_str())
            .bind(GenerationStatus::Running.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Terminal failure by internal ID. Used when submission to the
    /// provider fails before any task identifier exists.
    pub async fn fail_by_id(
        pool: &PgPool,
        id: DbId,
        error_message: &str,
    ) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!(
            "UPDATE generations \
             SET status = $2, error_message = $3, completed_at = NOW(), \
                 credits_refunded = TRUE \
             WHERE id = $1 AND status IN ($4, $5) AND credits_refunded = FALSE \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(id)
            .bind(GenerationStatus::Failed.as_str())
            .bind(error_message)
            .bind(GenerationStatus::Pending.as_str())
            .bind(GenerationStatus::Running.as_str())
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Enhancement sub-lifecycle
    // -----------------------------------------------------------------------

    /// Start an enhancement run on a succeeded job.
    ///
    /// Guarded on the parent being `succeeded` and the enhancement being
    /// startable (`none` or a previous `failed`). Returns `None` when the
    /// guard does not match (wrong parent state or a run already in
    /// flight).
    ///
    /// Clears the previous run's task id and results along with resetting
    /// the refund flag, so a retry attaches its own fresh task and stale
    /// status reports for the old task no longer match anything.
    pub async fn start_enhancement(
        pool: &PgPool,
        id: DbId,
        credits: i32,
    ) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!(
            "UPDATE generations \
             SET enhancement_status = $2, enhancement_credits = $3, \
                 enhancement_task_id = NULL, enhanced_result_urls = NULL, \
                 enhancement_error = NULL, enhancement_credits_refunded = FALSE, \
                 enhancement_started_at = NOW(), enhancement_completed_at = NULL \
             WHERE id = $1 AND status = $4 AND enhancement_status IN ($5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(id)
            .bind(EnhancementStatus::Running.as_str())
            .bind(credits)
            .bind(GenerationStatus::Succeeded.as_str())
            .bind(EnhancementStatus::None.as_str())
            .bind(EnhancementStatus::Failed.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Record the provider task for an in-flight enhancement run.
    pub async fn attach_enhancement_task(
        pool: &PgPool,
        id: DbId,
        task_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generations SET enhancement_task_id = $2 \
             WHERE id = $1 AND enhancement_task_id IS NULL",
        )
        .bind(id)
        .bind(task_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Terminal enhancement success by enhancement task ID.
    pub async fn complete_enhancement(
        pool: &PgPool,
        task_id: &str,
        result_urls: &serde_json::Value,
    ) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!(
            "UPDATE generations \
             SET enhancement_status = $2, enhanced_result_urls = $3, \
                 enhancement_completed_at = NOW() \
             WHERE enhancement_task_id = $1 AND enhancement_status = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(task_id)
            .bind(EnhancementStatus::Succeeded.as_str())
            .bind(result_urls)
            .bind(EnhancementStatus::Running.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Terminal enhancement failure by enhancement task ID. Same
    /// refund-once contract as [`GenerationRepo::fail_by_task`].
    pub async fn fail_enhancement_by_task(
        pool: &PgPool,
        task_id: &str,
        error_message: &str,
    ) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!(
            "UPDATE generations \
             SET enhancement_status = $2, enhancement_error = $3, \
                 enhancement_completed_at = NOW(), enhancement_credits_refunded = TRUE \
             WHERE enhancement_task_id = $1 AND enhancement_status = $4 \
               AND enhancement_credits_refunded = FALSE \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(task_id)
            .bind(EnhancementStatus::Failed.as_str())
            .bind(error_message)
            .bind(EnhancementStatus::Running.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Terminal enhancement failure by internal ID (submission failure,
    /// before any enhancement task exists).
    pub async fn fail_enhancement_by_id(
        pool: &PgPool,
        id: DbId,
        error_message: &str,
    ) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!(
            "UPDATE generations \
             SET enhancement_status = $2, enhancement_error = $3, \
                 enhancement_completed_at = NOW(), enhancement_credits_refunded = TRUE \
             WHERE id = $1 AND enhancement_status = $4 \
               AND enhancement_credits_refunded = FALSE \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(id)
            .bind(EnhancementStatus::Failed.as_str())
            .bind(error_message)
            .bind(EnhancementStatus::Running.as_str())
            .fetch_optional(pool)
            .await
    }
}

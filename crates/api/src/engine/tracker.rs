//! Lifecycle tracker: the single writer of generation state changes.
//!
//! Submission reserves credits with one atomic conditional UPDATE before
//! any row exists; a failed reservation leaves no trace. Status updates
//! arrive from two transports (the poller and the push callback) and both
//! funnel through [`apply_task_update`], so re-delivery and races resolve
//! to the same outcome: the first terminal update wins and every later one
//! is a no-op.
//!
//! Refunds piggyback on the guarded terminal transition. The repository
//! flips the job's refund flag in the same UPDATE that marks it failed and
//! returns the row only to the caller that won that transition, so the
//! credit is returned exactly once no matter how many failure reports
//! arrive.

use reelgen_core::credits::{self, ENHANCEMENT_COST};
use reelgen_core::error::CoreError;
use reelgen_core::generation::{GenerationParams, GenerationStatus};
use reelgen_core::types::DbId;
use reelgen_db::models::generation::{CreateGeneration, Generation};
use reelgen_db::repositories::{GenerationRepo, ProviderKeyRepo, UserRepo};
use reelgen_db::DbPool;
use reelgen_provider::{ProviderClient, SubmitRequest, TaskState};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Submit a new generation job for `user_id`.
///
/// Order of operations:
///
/// 1. Validate parameters (no state touched on rejection).
/// 2. Atomically reserve the job's credit cost (402 on insufficient
///    balance, still no state touched).
/// 3. Insert the `pending` row with its cost fixed.
/// 4. Pick a pooled credential and submit to the provider.
///
/// A submission failure after step 3 (no usable credential, provider
/// unreachable, provider rejection) marks the job `failed` and refunds the
/// reservation; the failed row is returned so the client sees the outcome.
pub async fn submit_generation(
    pool: &DbPool,
    provider: &ProviderClient,
    user_id: DbId,
    params: &GenerationParams,
) -> AppResult<Generation> {
    params.validate()?;
    let cost = credits::cost_for(params);

    let reserved = UserRepo::reserve_credits(pool, user_id, cost).await?;
    if !reserved {
        return Err(CoreError::InsufficientCredits { required: cost }.into());
    }

    let input = CreateGeneration {
        user_id: Some(user_id),
        kind: params.kind.as_str().to_string(),
        prompt: params.prompt.clone(),
        image_url: params.image_url.clone(),
        mask_image_url: params.mask_image_url.clone(),
        strength: params.strength.clone(),
        samples: params.samples_or_default(),
        steps: params.steps_or_default(),
        scheduler: params.scheduler.map(|s| s.as_str().to_string()),
        aspect_ratio: params.aspect_ratio.as_str().to_string(),
        model: params.model.as_str().to_string(),
        watermark: params.watermark.clone(),
        hd_generation: params.hd_generation,
        credits_used: cost,
        provider_key_id: None,
    };

    let generation = match GenerationRepo::create(pool, &input).await {
        Ok(g) => g,
        Err(e) => {
            // The reservation already went through; give it back before
            // surfacing the insert failure.
            UserRepo::refund_credits(pool, user_id, cost).await?;
            return Err(e.into());
        }
    };

    tracing::info!(
        generation_id = generation.id,
        user_id,
        kind = %generation.kind,
        model = %generation.model,
        cost,
        "Generation created, submitting to provider"
    );

    let key = match ProviderKeyRepo::pick_active(pool, cost).await? {
        Some(key) => key,
        None => {
            return fail_submission(
                pool,
                &generation,
                "no provider credential with sufficient capacity",
            )
            .await;
        }
    };

    let request = SubmitRequest::from_params(params);
    match provider.submit(&request, &key.secret).await {
        Ok(task_id) => {
            GenerationRepo::attach_task(pool, generation.id, &task_id, Some(key.id)).await?;

            if !ProviderKeyRepo::record_usage(pool, key.id, cost).await? {
                // Key drained between selection and use. The task is
                // already submitted, so only flag the credential.
                tracing::warn!(key_id = key.id, "Provider credential exhausted mid-submission");
                ProviderKeyRepo::deactivate(pool, key.id).await?;
            }

            tracing::info!(generation_id = generation.id, %task_id, "Provider accepted task");
            GenerationRepo::find_by_id(pool, generation.id)
                .await?
                .ok_or_else(|| AppError::InternalError("generation row vanished".into()))
        }
        Err(e) => fail_submission(pool, &generation, &e.to_string()).await,
    }
}

/// Mark a job failed at submission time and refund the reservation.
///
/// Refunds only if this call actually won the terminal transition.
async fn fail_submission(
    pool: &DbPool,
    generation: &Generation,
    reason: &str,
) -> AppResult<Generation> {
    tracing::warn!(generation_id = generation.id, reason, "Submission failed");

    match GenerationRepo::fail_by_id(pool, generation.id, reason).await? {
        Some(failed) => {
            if let Some(user_id) = failed.user_id {
                UserRepo::refund_credits(pool, user_id, failed.credits_used).await?;
            }
            Ok(failed)
        }
        None => GenerationRepo::find_by_id(pool, generation.id)
            .await?
            .ok_or_else(|| AppError::InternalError("generation row vanished".into())),
    }
}

/// Apply a normalized provider status update to the job owning `task_id`.
///
/// Both the poller and the push callback call this; the guarded UPDATEs
/// underneath make it idempotent, so duplicated or reordered deliveries
/// are harmless. An update for an unknown task is logged and dropped.
pub async fn apply_task_update(
    pool: &DbPool,
    task_id: &str,
    state: TaskState,
) -> Result<(), sqlx::Error> {
    match state {
        TaskState::Queued => {
            // Still waiting; nothing to record.
        }
        TaskState::Processing => {
            if !GenerationRepo::mark_running(pool, task_id).await? {
                tracing::debug!(%task_id, "In-progress report for non-pending task, ignoring");
            }
        }
        TaskState::Succeeded {
            result_urls,
            hd_result_url,
        } => {
            let urls = serde_json::json!(result_urls);
            match GenerationRepo::complete(pool, task_id, &urls, hd_result_url.as_deref()).await? {
                Some(g) => {
                    tracing::info!(generation_id = g.id, %task_id, "Generation succeeded");
                }
                None => {
                    if GenerationRepo::find_by_task_id(pool, task_id).await?.is_none() {
                        tracing::warn!(%task_id, "Success report for unknown task, dropping");
                    } else {
                        tracing::debug!(%task_id, "Success report for terminal task, ignoring");
                    }
                }
            }
        }
        TaskState::Failed { reason } => {
            match GenerationRepo::fail_by_task(pool, task_id, &reason).await? {
                Some(g) => {
                    tracing::info!(generation_id = g.id, %task_id, %reason, "Generation failed");
                    if let Some(user_id) = g.user_id {
                        UserRepo::refund_credits(pool, user_id, g.credits_used).await?;
                    }
                }
                None => {
                    if GenerationRepo::find_by_task_id(pool, task_id).await?.is_none() {
                        tracing::warn!(%task_id, "Failure report for unknown task, dropping");
                    } else {
                        tracing::debug!(%task_id, "Failure report for terminal task, ignoring");
                    }
                }
            }
        }
    }
    Ok(())
}

/// Apply a provider status update to the enhancement run owning `task_id`.
///
/// Same contract as [`apply_task_update`], scoped to the enhancement
/// columns. The refund on failure uses the enhancement's own reserved
/// amount, not the parent job's cost.
pub async fn apply_enhancement_update(
    pool: &DbPool,
    task_id: &str,
    state: TaskState,
) -> Result<(), sqlx::Error> {
    match state {
        TaskState::Queued | TaskState::Processing => {
            // The enhancement row is already `running` from the moment it
            // was started; in-flight reports carry no new information.
        }
        TaskState::Succeeded { result_urls, .. } => {
            let urls = serde_json::json!(result_urls);
            match GenerationRepo::complete_enhancement(pool, task_id, &urls).await? {
                Some(g) => {
                    tracing::info!(generation_id = g.id, %task_id, "Enhancement succeeded");
                }
                None => {
                    tracing::debug!(%task_id, "Enhancement success for unknown or settled run, ignoring");
                }
            }
        }
        TaskState::Failed { reason } => {
            match GenerationRepo::fail_enhancement_by_task(pool, task_id, &reason).await? {
                Some(g) => {
                    tracing::info!(generation_id = g.id, %task_id, %reason, "Enhancement failed");
                    if let (Some(user_id), Some(amount)) = (g.user_id, g.enhancement_credits) {
                        UserRepo::refund_credits(pool, user_id, amount).await?;
                    }
                }
                None => {
                    tracing::debug!(%task_id, "Enhancement failure for unknown or settled run, ignoring");
                }
            }
        }
    }
    Ok(())
}

/// Start an enhancement run on a user's succeeded generation.
///
/// Reserves [`ENHANCEMENT_COST`] credits, claims the run with a guarded
/// transition (only one run may be in flight per job), and submits the
/// first result URL to the provider. A submission failure settles the run
/// as failed and refunds, mirroring [`submit_generation`].
pub async fn submit_enhancement(
    pool: &DbPool,
    provider: &ProviderClient,
    user_id: DbId,
    public_id: Uuid,
) -> AppResult<Generation> {
    let generation = GenerationRepo::find_by_public_id(pool, public_id)
        .await?
        .filter(|g| g.user_id == Some(user_id))
        .ok_or_else(|| CoreError::NotFound {
            entity: "generation",
            id: public_id.to_string(),
        })?;

    if generation.status_enum() != Some(GenerationStatus::Succeeded) {
        return Err(CoreError::Conflict(
            "only a succeeded generation can be enhanced".into(),
        )
        .into());
    }

    let source_url = first_result_url(&generation).ok_or_else(|| {
        AppError::InternalError("succeeded generation has no result URL".into())
    })?;
    let source_task_id = generation
        .task_id
        .clone()
        .ok_or_else(|| AppError::InternalError("succeeded generation has no task id".into()))?;

    let reserved = UserRepo::reserve_credits(pool, user_id, ENHANCEMENT_COST).await?;
    if !reserved {
        return Err(CoreError::InsufficientCredits {
            required: ENHANCEMENT_COST,
        }
        .into());
    }

    let claimed =
        match GenerationRepo::start_enhancement(pool, generation.id, ENHANCEMENT_COST).await? {
            Some(g) => g,
            None => {
                // Lost the race to another request (or the run already
                // succeeded). Give the reservation back.
                UserRepo::refund_credits(pool, user_id, ENHANCEMENT_COST).await?;
                return Err(CoreError::Conflict(
                    "an enhancement is already in progress or completed".into(),
                )
                .into());
            }
        };

    tracing::info!(generation_id = claimed.id, user_id, "Enhancement started");

    let key = match ProviderKeyRepo::pick_active(pool, ENHANCEMENT_COST).await? {
        Some(key) => key,
        None => {
            return fail_enhancement_submission(
                pool,
                &claimed,
                "no provider credential with sufficient capacity",
            )
            .await;
        }
    };

    match provider
        .submit_enhancement(&source_task_id, &source_url, &key.secret)
        .await
    {
        Ok(task_id) => {
            GenerationRepo::attach_enhancement_task(pool, claimed.id, &task_id).await?;
            if !ProviderKeyRepo::record_usage(pool, key.id, ENHANCEMENT_COST).await? {
                tracing::warn!(key_id = key.id, "Provider credential exhausted mid-submission");
                ProviderKeyRepo::deactivate(pool, key.id).await?;
            }
            tracing::info!(generation_id = claimed.id, %task_id, "Provider accepted enhancement");
            GenerationRepo::find_by_id(pool, claimed.id)
                .await?
                .ok_or_else(|| AppError::InternalError("generation row vanished".into()))
        }
        Err(e) => fail_enhancement_submission(pool, &claimed, &e.to_string()).await,
    }
}

/// Settle an enhancement run as failed at submission time and refund.
async fn fail_enhancement_submission(
    pool: &DbPool,
    generation: &Generation,
    reason: &str,
) -> AppResult<Generation> {
    tracing::warn!(generation_id = generation.id, reason, "Enhancement submission failed");

    match GenerationRepo::fail_enhancement_by_id(pool, generation.id, reason).await? {
        Some(failed) => {
            if let (Some(user_id), Some(amount)) = (failed.user_id, failed.enhancement_credits) {
                UserRepo::refund_credits(pool, user_id, amount).await?;
            }
            Ok(failed)
        }
        None => GenerationRepo::find_by_id(pool, generation.id)
            .await?
            .ok_or_else(|| AppError::InternalError("generation row vanished".into())),
    }
}

/// First stored result URL of a succeeded generation, if any.
fn first_result_url(generation: &Generation) -> Option<String> {
    generation
        .result_urls
        .as_ref()?
        .as_array()?
        .first()?
        .as_str()
        .map(|s| s.to_string())
}

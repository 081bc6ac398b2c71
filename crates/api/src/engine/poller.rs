//! Background status poller for in-flight provider tasks.
//!
//! The provider pushes callbacks when it can, but delivery is best-effort;
//! polling is the backstop that guarantees every job eventually settles.
//! Each tick fetches the status of every non-terminal task and feeds the
//! normalized state through the same tracker entry points the callback
//! endpoint uses, so the two transports can never disagree on outcomes.

use std::sync::Arc;
use std::time::Duration;

use reelgen_db::models::generation::Generation;
use reelgen_db::models::provider_key::ProviderKey;
use reelgen_db::repositories::{GenerationRepo, ProviderKeyRepo};
use reelgen_db::DbPool;
use reelgen_provider::{ProviderClient, ProviderError};
use tokio_util::sync::CancellationToken;

use crate::engine::tracker;

/// Polls the provider for status of all in-flight tasks.
pub struct StatusPoller {
    pool: DbPool,
    provider: Arc<ProviderClient>,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(pool: DbPool, provider: Arc<ProviderClient>, interval: Duration) -> Self {
        Self {
            pool,
            provider,
            interval,
        }
    }

    /// Run the polling loop until `cancel` is triggered.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Status poller started");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Status poller stopping");
                    break;
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// One polling pass over primary tasks and enhancement runs.
    async fn tick(&self) {
        match GenerationRepo::list_active_tasks(&self.pool).await {
            Ok(jobs) => {
                for job in &jobs {
                    self.poll_job(job).await;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Poller: failed to list active tasks");
            }
        }

        match GenerationRepo::list_active_enhancements(&self.pool).await {
            Ok(jobs) => {
                for job in &jobs {
                    self.poll_enhancement(job).await;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Poller: failed to list active enhancements");
            }
        }
    }

    async fn poll_job(&self, job: &Generation) {
        let Some(task_id) = job.task_id.as_deref() else {
            return;
        };
        let Some(key) = self.key_for(job).await else {
            tracing::warn!(generation_id = job.id, "Poller: no credential available");
            return;
        };

        match self.provider.fetch_status(task_id, &key.secret).await {
            Ok(Some(state)) => {
                if let Err(e) = tracker::apply_task_update(&self.pool, task_id, state).await {
                    tracing::error!(error = %e, %task_id, "Poller: failed to apply task update");
                }
            }
            Ok(None) => {
                tracing::warn!(%task_id, "Poller: uninterpretable status payload, will retry");
            }
            Err(ProviderError::Unavailable(reason)) => {
                // Transient; next tick retries.
                tracing::debug!(%task_id, %reason, "Poller: provider unavailable");
            }
            Err(ProviderError::Rejected { status, body }) => {
                tracing::warn!(%task_id, status, %body, "Poller: provider rejected status request");
            }
        }
    }

    async fn poll_enhancement(&self, job: &Generation) {
        let Some(task_id) = job.enhancement_task_id.as_deref() else {
            return;
        };
        let Some(key) = self.key_for(job).await else {
            tracing::warn!(generation_id = job.id, "Poller: no credential available");
            return;
        };

        match self.provider.fetch_status(task_id, &key.secret).await {
            Ok(Some(state)) => {
                if let Err(e) = tracker::apply_enhancement_update(&self.pool, task_id, state).await
                {
                    tracing::error!(error = %e, %task_id, "Poller: failed to apply enhancement update");
                }
            }
            Ok(None) => {
                tracing::warn!(%task_id, "Poller: uninterpretable status payload, will retry");
            }
            Err(ProviderError::Unavailable(reason)) => {
                tracing::debug!(%task_id, %reason, "Poller: provider unavailable");
            }
            Err(ProviderError::Rejected { status, body }) => {
                tracing::warn!(%task_id, status, %body, "Poller: provider rejected status request");
            }
        }
    }

    /// Credential to poll a job with: the one it was submitted under when
    /// still active, otherwise any active key.
    async fn key_for(&self, job: &Generation) -> Option<ProviderKey> {
        if let Some(key_id) = job.provider_key_id {
            match ProviderKeyRepo::find_by_id(&self.pool, key_id).await {
                Ok(Some(key)) => return Some(key),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, key_id, "Poller: credential lookup failed");
                    return None;
                }
            }
        }

        match ProviderKeyRepo::pick_active(&self.pool, 0).await {
            Ok(key) => key,
            Err(e) => {
                tracing::error!(error = %e, "Poller: credential selection failed");
                None
            }
        }
    }
}

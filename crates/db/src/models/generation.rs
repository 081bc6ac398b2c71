//! Generation job entity model and DTOs.
//!
//! Status columns are stored as text and interpreted through the closed
//! enums in `reelgen_core::generation`. The repository exposes a closed
//! set of transition methods instead of a free-form partial update, so
//! every status write goes through a guarded conditional UPDATE.

use reelgen_core::generation::{EnhancementStatus, GenerationStatus};
use reelgen_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `generations` table.
#[derive(Debug, Clone, FromRow)]
pub struct Generation {
    pub id: DbId,
    pub public_id: Uuid,
    pub user_id: Option<DbId>,
    /// Provider task identifier; NULL until the provider accepts the job.
    pub task_id: Option<String>,
    pub kind: String,
    pub prompt: String,
    pub image_url: Option<String>,
    pub mask_image_url: Option<String>,
    pub strength: Option<String>,
    pub samples: i32,
    pub steps: i32,
    pub scheduler: Option<String>,
    pub aspect_ratio: String,
    pub model: String,
    pub watermark: Option<String>,
    pub hd_generation: bool,
    pub status: String,
    pub result_urls: Option<serde_json::Value>,
    pub hd_result_url: Option<String>,
    pub error_message: Option<String>,
    /// Fixed at creation; never recomputed.
    pub credits_used: i32,
    pub credits_refunded: bool,
    pub provider_key_id: Option<DbId>,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub enhancement_status: String,
    pub enhancement_task_id: Option<String>,
    pub enhanced_result_urls: Option<serde_json::Value>,
    pub enhancement_error: Option<String>,
    pub enhancement_credits: Option<i32>,
    pub enhancement_credits_refunded: bool,
    pub enhancement_started_at: Option<Timestamp>,
    pub enhancement_completed_at: Option<Timestamp>,
}

impl Generation {
    /// Current status as a domain enum. Rows can only hold values written
    /// through the repository, so parse failures indicate data corruption.
    pub fn status_enum(&self) -> Option<GenerationStatus> {
        GenerationStatus::parse(&self.status)
    }

    pub fn enhancement_status_enum(&self) -> Option<EnhancementStatus> {
        EnhancementStatus::parse(&self.enhancement_status)
    }
}

/// External-facing view of a generation job.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResponse {
    pub id: Uuid,
    pub kind: String,
    pub prompt: String,
    pub aspect_ratio: String,
    pub model: String,
    pub hd_generation: bool,
    pub status: String,
    pub result_urls: Option<serde_json::Value>,
    pub hd_result_url: Option<String>,
    pub error_message: Option<String>,
    pub credits_used: i32,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub enhancement_status: String,
    pub enhanced_result_urls: Option<serde_json::Value>,
    pub enhancement_error: Option<String>,
}

impl From<&Generation> for GenerationResponse {
    fn from(g: &Generation) -> Self {
        Self {
            id: g.public_id,
            kind: g.kind.clone(),
            prompt: g.prompt.clone(),
            aspect_ratio: g.aspect_ratio.clone(),
            model: g.model.clone(),
            hd_generation: g.hd_generation,
            status: g.status.clone(),
            result_urls: g.result_urls.clone(),
            hd_result_url: g.hd_result_url.clone(),
            error_message: g.error_message.clone(),
            credits_used: g.credits_used,
            created_at: g.created_at,
            completed_at: g.completed_at,
            enhancement_status: g.enhancement_status.clone(),
            enhanced_result_urls: g.enhanced_result_urls.clone(),
            enhancement_error: g.enhancement_error.clone(),
        }
    }
}

/// Insert payload for a new pending generation.
#[derive(Debug, Clone)]
pub struct CreateGeneration {
    pub user_id: Option<DbId>,
    pub kind: String,
    pub prompt: String,
    pub image_url: Option<String>,
    pub mask_image_url: Option<String>,
    pub strength: Option<String>,
    pub samples: i32,
    pub steps: i32,
    pub scheduler: Option<String>,
    pub aspect_ratio: String,
    pub model: String,
    pub watermark: Option<String>,
    pub hd_generation: bool,
    pub credits_used: i32,
    pub provider_key_id: Option<DbId>,
}

/// Query parameters for listing a user's generations.
#[derive(Debug, Deserialize)]
pub struct GenerationListQuery {
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

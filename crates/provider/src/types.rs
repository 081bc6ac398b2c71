//! Wire types for the provider API and the normalized task-state event.
//!
//! The provider reports status either through polling (`GET /tasks/{id}`)
//! or through a push callback to our API. Both deliveries are normalized
//! into [`TaskState`] so the lifecycle tracker has a single idempotent
//! update contract regardless of transport.

use reelgen_core::generation::GenerationParams;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Body for `POST /tasks` on the provider side.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    pub model: String,
    pub prompt: String,
    pub aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
    pub samples: i32,
    pub steps: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<String>,
    pub hd: bool,
}

impl SubmitRequest {
    /// Build the wire request from validated domain parameters.
    pub fn from_params(params: &GenerationParams) -> Self {
        Self {
            model: params.model.as_str().to_string(),
            prompt: params.prompt.clone(),
            aspect_ratio: params.aspect_ratio.as_str().to_string(),
            image_url: params.image_url.clone(),
            mask_image_url: params.mask_image_url.clone(),
            strength: params.strength.clone(),
            samples: params.samples_or_default(),
            steps: params.steps_or_default(),
            scheduler: params.scheduler.map(|s| s.as_str().to_string()),
            watermark: params.watermark.clone(),
            hd: params.hd_generation,
        }
    }
}

/// Response returned by the provider after accepting a task.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Provider-assigned task identifier.
    pub task_id: String,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Raw status payload as the provider sends it (poll response body and
/// push-callback body share this shape).
#[derive(Debug, Clone, Deserialize)]
pub struct StatusPayload {
    pub status: String,
    #[serde(default)]
    pub result_urls: Option<Vec<String>>,
    #[serde(default)]
    pub hd_result_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Push-callback body: a status payload plus the task it belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackPayload {
    pub task_id: String,
    #[serde(flatten)]
    pub status: StatusPayload,
}

/// Normalized task state consumed by the lifecycle tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Accepted but not yet started.
    Queued,
    /// Actively generating.
    Processing,
    /// Finished with an ordered list of result URLs.
    Succeeded {
        result_urls: Vec<String>,
        hd_result_url: Option<String>,
    },
    /// Finished unsuccessfully.
    Failed { reason: String },
}

impl TaskState {
    /// Normalize a raw provider payload.
    ///
    /// Returns `None` for payloads that cannot be interpreted (unknown
    /// status token, success without result URLs); callers log and drop
    /// those rather than corrupting job state.
    pub fn from_payload(payload: &StatusPayload) -> Option<Self> {
        match payload.status.as_str() {
            "queued" | "pending" => Some(TaskState::Queued),
            "processing" | "running" => Some(TaskState::Processing),
            "succeeded" | "completed" => {
                let urls = payload.result_urls.clone().filter(|u| !u.is_empty())?;
                Some(TaskState::Succeeded {
                    result_urls: urls,
                    hd_result_url: payload.hd_result_url.clone(),
                })
            }
            "failed" | "error" => Some(TaskState::Failed {
                reason: payload
                    .error
                    .clone()
                    .unwrap_or_else(|| "provider reported failure without detail".to_string()),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn payload(status: &str) -> StatusPayload {
        StatusPayload {
            status: status.to_string(),
            result_urls: None,
            hd_result_url: None,
            error: None,
        }
    }

    #[test]
    fn in_progress_states_normalize() {
        assert_eq!(TaskState::from_payload(&payload("queued")), Some(TaskState::Queued));
        assert_eq!(TaskState::from_payload(&payload("pending")), Some(TaskState::Queued));
        assert_eq!(
            TaskState::from_payload(&payload("processing")),
            Some(TaskState::Processing)
        );
        assert_eq!(
            TaskState::from_payload(&payload("running")),
            Some(TaskState::Processing)
        );
    }

    #[test]
    fn success_requires_result_urls() {
        // Success without URLs is malformed: dropped, not treated as terminal.
        assert_eq!(TaskState::from_payload(&payload("succeeded")), None);

        let mut p = payload("completed");
        p.result_urls = Some(vec![]);
        assert_eq!(TaskState::from_payload(&p), None);

        p.result_urls = Some(vec!["https://cdn.example.com/out.mp4".into()]);
        p.hd_result_url = Some("https://cdn.example.com/out-hd.mp4".into());
        assert_matches!(
            TaskState::from_payload(&p),
            Some(TaskState::Succeeded { result_urls, hd_result_url })
                if result_urls.len() == 1 && hd_result_url.is_some()
        );
    }

    #[test]
    fn failure_carries_reason_with_fallback() {
        let mut p = payload("failed");
        assert_matches!(
            TaskState::from_payload(&p),
            Some(TaskState::Failed { reason }) if reason.contains("without detail")
        );

        p.error = Some("content policy violation".into());
        assert_matches!(
            TaskState::from_payload(&p),
            Some(TaskState::Failed { reason }) if reason == "content policy violation"
        );
    }

    #[test]
    fn unknown_status_is_dropped() {
        assert_eq!(TaskState::from_payload(&payload("paused")), None);
    }

    #[test]
    fn callback_payload_deserializes_flattened() {
        let json = serde_json::json!({
            "task_id": "task-9",
            "status": "failed",
            "error": "gpu pool exhausted"
        });
        let cb: CallbackPayload = serde_json::from_value(json).unwrap();
        assert_eq!(cb.task_id, "task-9");
        assert_eq!(cb.status.status, "failed");
        assert_eq!(cb.status.error.as_deref(), Some("gpu pool exhausted"));
    }
}

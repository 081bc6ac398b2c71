//! Generation job domain: parameter shapes, validation, and the status
//! state machine.
//!
//! Job kind, model, aspect ratio, and scheduler are closed enums so that
//! illegal parameter combinations are unrepresentable at the type level.
//! Status transitions are validated here; the database layer additionally
//! guards every transition with a conditional UPDATE so concurrent updates
//! for the same task can never un-terminate a terminal job.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Prompt / parameter bounds
// ---------------------------------------------------------------------------

/// Minimum prompt length in characters.
pub const PROMPT_MIN_CHARS: usize = 10;
/// Maximum prompt length in characters.
pub const PROMPT_MAX_CHARS: usize = 500;
/// Allowed range for the number of samples per request.
pub const SAMPLES_RANGE: std::ops::RangeInclusive<i32> = 1..=4;
/// Allowed range for diffusion steps.
pub const STEPS_RANGE: std::ops::RangeInclusive<i32> = 10..=50;
/// Default number of samples when the client omits the field.
pub const DEFAULT_SAMPLES: i32 = 1;
/// Default diffusion step count when the client omits the field.
pub const DEFAULT_STEPS: i32 = 31;

// ---------------------------------------------------------------------------
// Closed enums
// ---------------------------------------------------------------------------

/// The kind of generation work a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    TextToVideo,
    ImageToVideo,
    Inpaint,
    Upscale,
}

impl GenerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationKind::TextToVideo => "text_to_video",
            GenerationKind::ImageToVideo => "image_to_video",
            GenerationKind::Inpaint => "inpaint",
            GenerationKind::Upscale => "upscale",
        }
    }

    /// Whether this kind requires a source image URL.
    pub fn requires_image(&self) -> bool {
        !matches!(self, GenerationKind::TextToVideo)
    }
}

/// Upstream model variant a job runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    Veo3,
    Veo3Fast,
    LazymixInpaint,
    V51Inpaint,
    RealisticVisionInpaint,
}

impl ModelVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelVariant::Veo3 => "veo3",
            ModelVariant::Veo3Fast => "veo3_fast",
            ModelVariant::LazymixInpaint => "lazymix_inpaint",
            ModelVariant::V51Inpaint => "v51_inpaint",
            ModelVariant::RealisticVisionInpaint => "realistic_vision_inpaint",
        }
    }

    /// Whether this model is an inpainting model.
    pub fn is_inpaint(&self) -> bool {
        matches!(
            self,
            ModelVariant::LazymixInpaint
                | ModelVariant::V51Inpaint
                | ModelVariant::RealisticVisionInpaint
        )
    }
}

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Wide => "16:9",
            AspectRatio::Tall => "9:16",
            AspectRatio::Square => "1:1",
        }
    }
}

/// Sampling scheduler for inpainting models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scheduler {
    #[serde(rename = "dpm_multistep")]
    DpmMultistep,
    #[serde(rename = "dpmpp_2m")]
    DpmPlusPlus2m,
    #[serde(rename = "euler")]
    Euler,
    #[serde(rename = "euler_a")]
    EulerAncestral,
}

impl Scheduler {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheduler::DpmMultistep => "dpm_multistep",
            Scheduler::DpmPlusPlus2m => "dpmpp_2m",
            Scheduler::Euler => "euler",
            Scheduler::EulerAncestral => "euler_a",
        }
    }
}

// ---------------------------------------------------------------------------
// Status state machines
// ---------------------------------------------------------------------------

/// Primary job status. Transitions are monotonic:
/// `Pending -> Running -> {Succeeded, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Running => "running",
            GenerationStatus::Succeeded => "succeeded",
            GenerationStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(GenerationStatus::Pending),
            "running" => Some(GenerationStatus::Running),
            "succeeded" => Some(GenerationStatus::Succeeded),
            "failed" => Some(GenerationStatus::Failed),
            _ => None,
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Succeeded | GenerationStatus::Failed)
    }

    /// Whether a transition from `self` to `next` is legal.
    ///
    /// Re-applying the current state counts as a no-op, not a transition,
    /// and is therefore not "legal" here; callers treat it as idempotent.
    pub fn can_transition_to(&self, next: GenerationStatus) -> bool {
        use GenerationStatus::*;
        match (self, next) {
            (Pending, Running) => true,
            (Pending, Succeeded) | (Pending, Failed) => true,
            (Running, Succeeded) | (Running, Failed) => true,
            _ => false,
        }
    }
}

/// Enhancement sub-lifecycle attached to a succeeded job:
/// `None -> Running -> {Succeeded, Failed}`. A failed enhancement may be
/// retried (Failed -> Running).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementStatus {
    None,
    Running,
    Succeeded,
    Failed,
}

impl EnhancementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnhancementStatus::None => "none",
            EnhancementStatus::Running => "running",
            EnhancementStatus::Succeeded => "succeeded",
            EnhancementStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(EnhancementStatus::None),
            "running" => Some(EnhancementStatus::Running),
            "succeeded" => Some(EnhancementStatus::Succeeded),
            "failed" => Some(EnhancementStatus::Failed),
            _ => None,
        }
    }

    /// Whether a new enhancement run may be started from this state.
    pub fn can_start(&self) -> bool {
        matches!(self, EnhancementStatus::None | EnhancementStatus::Failed)
    }
}

// ---------------------------------------------------------------------------
// Request parameters
// ---------------------------------------------------------------------------

/// Validated parameters for a new generation request.
///
/// Deserialized straight from the submit request body; call
/// [`GenerationParams::validate`] before acting on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    pub kind: GenerationKind,
    pub prompt: String,
    pub model: ModelVariant,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: AspectRatio,
    pub image_url: Option<String>,
    pub mask_image_url: Option<String>,
    /// Denoising strength for inpainting, `"0.0"`..`"1.0"` as sent upstream.
    pub strength: Option<String>,
    pub samples: Option<i32>,
    pub steps: Option<i32>,
    pub scheduler: Option<Scheduler>,
    pub watermark: Option<String>,
    #[serde(default)]
    pub hd_generation: bool,
}

fn default_aspect_ratio() -> AspectRatio {
    AspectRatio::Wide
}

impl GenerationParams {
    /// Validate parameter constraints and cross-field consistency.
    ///
    /// Rejections here happen before any state change (no credits touched,
    /// no row created).
    pub fn validate(&self) -> Result<(), CoreError> {
        let prompt_chars = self.prompt.chars().count();
        if prompt_chars < PROMPT_MIN_CHARS {
            return Err(CoreError::Validation(format!(
                "Prompt must be at least {PROMPT_MIN_CHARS} characters"
            )));
        }
        if prompt_chars > PROMPT_MAX_CHARS {
            return Err(CoreError::Validation(format!(
                "Prompt must be at most {PROMPT_MAX_CHARS} characters"
            )));
        }

        if let Some(samples) = self.samples {
            if !SAMPLES_RANGE.contains(&samples) {
                return Err(CoreError::Validation(format!(
                    "samples must be between {} and {}",
                    SAMPLES_RANGE.start(),
                    SAMPLES_RANGE.end()
                )));
            }
        }

        if let Some(steps) = self.steps {
            if !STEPS_RANGE.contains(&steps) {
                return Err(CoreError::Validation(format!(
                    "steps must be between {} and {}",
                    STEPS_RANGE.start(),
                    STEPS_RANGE.end()
                )));
            }
        }

        if self.kind.requires_image() && self.image_url.is_none() {
            return Err(CoreError::Validation(format!(
                "{} requires image_url",
                self.kind.as_str()
            )));
        }

        match self.kind {
            GenerationKind::Inpaint => {
                if !self.model.is_inpaint() {
                    return Err(CoreError::Validation(format!(
                        "model {} cannot be used for inpainting",
                        self.model.as_str()
                    )));
                }
                if self.mask_image_url.is_none() {
                    return Err(CoreError::Validation(
                        "inpaint requires mask_image_url".into(),
                    ));
                }
            }
            GenerationKind::TextToVideo | GenerationKind::ImageToVideo => {
                if self.model.is_inpaint() {
                    return Err(CoreError::Validation(format!(
                        "model {} is an inpainting model and cannot generate video",
                        self.model.as_str()
                    )));
                }
            }
            GenerationKind::Upscale => {}
        }

        Ok(())
    }

    /// Effective sample count with the default applied.
    pub fn samples_or_default(&self) -> i32 {
        self.samples.unwrap_or(DEFAULT_SAMPLES)
    }

    /// Effective step count with the default applied.
    pub fn steps_or_default(&self) -> i32 {
        self.steps.unwrap_or(DEFAULT_STEPS)
    }
}

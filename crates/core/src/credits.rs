//! Credit accounting constants and the per-model cost table.
//!
//! A job's cost is computed exactly once, at submission, and stored on the
//! job row as `credits_used`. It is never recomputed from this table
//! afterwards, so cost changes only affect new submissions.

use crate::generation::{GenerationKind, GenerationParams, ModelVariant};

/// Credits granted to every newly registered account.
pub const STARTING_CREDITS: i32 = 50;

/// Extra charge for HD generation.
pub const HD_SURCHARGE: i32 = 2;

/// Fixed cost of the enhancement post-processing stage.
pub const ENHANCEMENT_COST: i32 = 2;

/// Base cost for a model variant, before kind/flag adjustments.
pub fn model_base_cost(model: ModelVariant) -> i32 {
    match model {
        ModelVariant::Veo3 => 5,
        ModelVariant::Veo3Fast => 2,
        ModelVariant::LazymixInpaint
        | ModelVariant::V51Inpaint
        | ModelVariant::RealisticVisionInpaint => 2,
    }
}

/// Total cost of a submission: base model cost, upscale override, and HD
/// surcharge.
pub fn cost_for(params: &GenerationParams) -> i32 {
    let base = match params.kind {
        GenerationKind::Upscale => 1,
        _ => model_base_cost(params.model),
    };
    if params.hd_generation {
        base + HD_SURCHARGE
    } else {
        base
    }
}

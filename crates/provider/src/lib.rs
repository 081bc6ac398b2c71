//! HTTP gateway to the external video-generation provider.
//!
//! Wraps the provider's REST API (task submission, status retrieval) using
//! [`reqwest`], and defines the normalized task-state event that both the
//! status poller and the push-callback endpoint feed into the lifecycle
//! tracker.

pub mod client;
pub mod types;

pub use client::{ProviderClient, ProviderError};
pub use types::{CallbackPayload, StatusPayload, SubmitRequest, TaskState};

//! Generation lifecycle engine.
//!
//! [`tracker`] owns every state change a job can go through: submission,
//! provider status updates (from polling or push callbacks), and the
//! enhancement sub-lifecycle. [`poller`] is the background loop that pulls
//! status from the provider for jobs still in flight.

pub mod poller;
pub mod tracker;

pub use poller::StatusPoller;

//! Request handlers.
//!
//! Each submodule provides async handler functions for one resource.
//! Handlers delegate to the repositories in `reelgen_db` (and to the
//! lifecycle engine for anything that changes job state) and map errors
//! via [`crate::error::AppError`].

pub mod auth;
pub mod callbacks;
pub mod generation;
pub mod provider_keys;
pub mod rewards;
pub mod settings;

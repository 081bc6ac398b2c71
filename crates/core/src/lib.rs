//! Domain types and rules for the video-generation platform.
//!
//! This crate is I/O-free: it defines the generation state machine, the
//! closed set of request parameter shapes, the credit cost table, and the
//! shared error taxonomy. Persistence lives in `reelgen-db`, the provider
//! gateway in `reelgen-provider`, and HTTP in `reelgen-api`.

pub mod credits;
pub mod error;
pub mod generation;
pub mod types;

use std::sync::Arc;

use reelgen_provider::ProviderClient;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already
/// `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: reelgen_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Gateway to the external video-generation provider.
    pub provider: Arc<ProviderClient>,
}

use std::sync::Arc;

use studyhub_core::storage::AssetStorage;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: studyhub_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Object store holding deployment assets.
    pub storage: Arc<dyn AssetStorage>,
}

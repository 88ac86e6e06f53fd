use crate::{
    config::AppConfig,
    core::{
        directory::{DirectoryHub, LiveDirectory},
        local_cache::LocalCache,
    },
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared state handed to every request handler.
///
/// Built once at startup; cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppContext {
    /// Loaded configuration
    pub config: Arc<AppConfig>,
    /// Shared; the connection type is not `Clone` in every build
    pub db: Arc<DatabaseConnection>,
    /// Directory writes are published here
    pub hub: DirectoryHub,
    /// Live users/roles view fed by `hub`
    pub directory: Arc<LiveDirectory>,
    /// Local copies of the settings blobs
    pub cache: LocalCache,
}

impl AppContext {
    /// Wires the change hub, starts the live directory and opens the local cache.
    pub async fn new(config: AppConfig, db: DatabaseConnection) -> Result<Self> {
        let hub = DirectoryHub::new();
        let directory = LiveDirectory::start(&db, &hub).await?;
        let cache = LocalCache::new(config.storage.local_cache_dir.clone());

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            hub,
            directory: Arc::new(directory),
            cache,
        })
    }
}

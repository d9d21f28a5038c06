use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{CanopyError, Result};
use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::registry::Registry;
use crate::store::SqliteStore;
use crate::sync::{SyncEngine, TreeSynchronizer, DEFAULT_WORKERS};

/// Everything a command needs, wired once at startup.
pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub registry: Registry<SqliteStore>,
    pub engine: Arc<SyncEngine<SqliteStore>>,
    pub tree: TreeSynchronizer<SqliteStore>,
}

impl AppContext {
    pub fn new(config: &Config) -> Result<Self> {
        let db_path = match &config.database {
            Some(p) => p.clone(),
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let fetcher: Arc<dyn Fetcher + Send + Sync> =
            Arc::new(HttpFetcher::from_config(&config.fetch)?);

        tracing::debug!(db = %db_path.display(), workers = config.fetch.workers, "opened store");
        Ok(Self::with_parts(store, fetcher, config.fetch.workers))
    }

    pub fn in_memory() -> Result<Self> {
        let config = Config::default();
        let store = Arc::new(SqliteStore::in_memory()?);
        let fetcher: Arc<dyn Fetcher + Send + Sync> =
            Arc::new(HttpFetcher::from_config(&config.fetch)?);
        Ok(Self::with_parts(store, fetcher, DEFAULT_WORKERS))
    }

    pub fn with_parts(
        store: Arc<SqliteStore>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        workers: usize,
    ) -> Self {
        let registry = Registry::new(store.clone());
        let engine = Arc::new(SyncEngine::new(registry.clone(), fetcher.clone()));
        let tree = TreeSynchronizer::with_workers(engine.clone(), workers);

        Self {
            store,
            fetcher,
            registry,
            engine,
            tree,
        }
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| CanopyError::Config("Could not find data directory".into()))?;
        let canopy_dir = data_dir.join("canopy");
        std::fs::create_dir_all(&canopy_dir)?;
        Ok(canopy_dir.join("canopy.db"))
    }
}

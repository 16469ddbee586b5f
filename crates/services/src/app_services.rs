use std::sync::Arc;

use dex_core::model::Catalog;
use storage::{HttpRemoteStore, RemoteProgressStore, Storage};
use tracing::info;

use crate::Clock;
use crate::collection_service::CollectionService;
use crate::config::DexConfig;
use crate::error::AppServicesError;
use crate::quiz_service::QuizService;
use crate::sync_service::ProgressSynchronizer;

/// Assembles app-facing services over one catalog and one storage set.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<Catalog>,
    sync: Arc<ProgressSynchronizer>,
    collection: Arc<CollectionService>,
    quiz: Arc<QuizService>,
}

impl AppServices {
    /// Build services from configuration: `SQLite` cache plus the HTTP
    /// document store when a remote URL is set.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the catalog cannot be loaded or storage
    /// initialization fails.
    pub async fn from_config(config: &DexConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let catalog = config.load_catalog()?;
        let mut storage = Storage::sqlite(&config.db_url).await?;
        if let Some(remote) = &config.remote {
            info!(base_url = %remote.base_url, "remote sync enabled");
            let remote: Arc<dyn RemoteProgressStore> =
                Arc::new(HttpRemoteStore::new(remote.clone()));
            storage = storage.with_remote(remote);
        }
        Ok(Self::new(clock, catalog, storage))
    }

    #[must_use]
    pub fn new(clock: Clock, catalog: Catalog, storage: Storage) -> Self {
        let catalog = Arc::new(catalog);
        let sync = Arc::new(ProgressSynchronizer::new(
            clock,
            Arc::clone(&catalog),
            storage.cache,
            storage.remote,
        ));
        let collection = Arc::new(CollectionService::new(
            Arc::clone(&catalog),
            Arc::clone(&sync),
        ));
        let quiz = Arc::new(QuizService::new(
            Arc::clone(&catalog),
            Arc::clone(&sync),
            Arc::clone(&collection),
        ));

        Self {
            catalog,
            sync,
            collection,
            quiz,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn sync(&self) -> Arc<ProgressSynchronizer> {
        Arc::clone(&self.sync)
    }

    #[must_use]
    pub fn collection(&self) -> Arc<CollectionService> {
        Arc::clone(&self.collection)
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizService> {
        Arc::clone(&self.quiz)
    }
}

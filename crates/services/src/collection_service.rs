use std::sync::Arc;

use dex_core::collection::{self, AnswerOutcome, BadgeResult, UnlockResult};
use dex_core::model::{Catalog, ProgressStats, VariantId};
use tracing::info;

use crate::error::CollectionServiceError;
use crate::sync_service::ProgressSynchronizer;

/// Applies answered quiz rounds to the signed-in (or local) progress.
#[derive(Clone)]
pub struct CollectionService {
    catalog: Arc<Catalog>,
    sync: Arc<ProgressSynchronizer>,
}

impl CollectionService {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, sync: Arc<ProgressSynchronizer>) -> Self {
        Self { catalog, sync }
    }

    /// Record a pick and persist the result when anything changed. A view
    /// emptied by sign-out is first reloaded from the local cache.
    ///
    /// Persistence is awaited before returning but its failures are only
    /// logged; the in-memory progress keeps the unlock either way.
    ///
    /// # Errors
    ///
    /// Returns `CollectionServiceError::Collection` if `target` is not in the
    /// catalog.
    pub async fn record_answer(
        &self,
        chosen: &VariantId,
        target: &VariantId,
    ) -> Result<AnswerOutcome, CollectionServiceError> {
        self.sync.ensure_loaded().await;
        let outcome = self
            .sync
            .mutate(|progress| collection::record_answer(&self.catalog, chosen, target, progress))?;

        if let UnlockResult::Unlocked(variant) = &outcome.unlock {
            info!(variant = %variant.id(), breed = %variant.breed(), "unlocked new coat");
        }
        if let BadgeResult::Earned(breed) = &outcome.badge {
            info!(breed = %breed, "earned breed badge");
        }

        if outcome.changed() {
            self.sync.persist().await;
        }
        Ok(outcome)
    }

    /// Counts for the current in-memory progress.
    #[must_use]
    pub fn stats(&self) -> ProgressStats {
        ProgressStats::compute(&self.catalog, &self.sync.current().progress)
    }
}

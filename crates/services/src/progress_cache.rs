use std::sync::Arc;

use dex_core::model::{BadgeState, BreedName, CollectionState, Progress, VariantId};
use serde_json::Value;
use storage::{KeyValueStore, StorageError};
use tracing::warn;

/// Cache key holding the JSON array of unlocked variant ids.
pub const COLLECTION_KEY: &str = "dogCollection";
/// Cache key holding the JSON array of earned breed badges.
pub const BADGES_KEY: &str = "breedBadges";

/// Typed view over the device key/value cache.
///
/// Reads never fail: a missing key, unreadable backend, invalid JSON or a
/// non-array value all read as empty.
#[derive(Clone)]
pub struct ProgressCache {
    store: Arc<dyn KeyValueStore>,
}

impl ProgressCache {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Progress {
        let collection = self.load_strings(COLLECTION_KEY).await;
        let badges = self.load_strings(BADGES_KEY).await;
        Progress::new(
            CollectionState::from_ids(collection.into_iter().map(VariantId::new)),
            BadgeState::from_names(badges.into_iter().map(BreedName::new)),
        )
    }

    /// Write both keys, collection first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` from the first write that fails.
    pub async fn save(&self, progress: &Progress) -> Result<(), StorageError> {
        let collection = serde_json::to_string(&progress.collection)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let badges = serde_json::to_string(&progress.badges)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;

        self.store.set_item(COLLECTION_KEY, &collection).await?;
        self.store.set_item(BADGES_KEY, &badges).await?;
        Ok(())
    }

    async fn load_strings(&self, key: &str) -> Vec<String> {
        let raw = match self.store.get_item(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(key, error = %err, "failed to read local progress");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            Ok(_) => {
                warn!(key, "local progress is not an array; treating as empty");
                Vec::new()
            }
            Err(err) => {
                warn!(key, error = %err, "local progress is not valid JSON; treating as empty");
                Vec::new()
            }
        }
    }
}

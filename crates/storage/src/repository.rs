use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dex_core::Clock;
use dex_core::model::{Progress, UserDocId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Remote document as read back from the progress store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressDocument {
    pub progress: Progress,
    /// Assigned by the store on every write.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Device-local key/value persistence (string values).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read. A missing key is `Ok(None)`.
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// One progress document per user in a remote document store.
#[async_trait]
pub trait RemoteProgressStore: Send + Sync {
    /// Fetch the user's document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on network or permission failures. A missing
    /// document is `Ok(None)`.
    async fn load_progress(&self, doc_id: &UserDocId)
    -> Result<Option<ProgressDocument>, StorageError>;

    /// Write collection and badges together in a single merge write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write is rejected or cannot be delivered.
    async fn save_progress(&self, doc_id: &UserDocId, progress: &Progress)
    -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Implements both stores; write counters let tests assert that no-op
/// answers do not touch storage.
#[derive(Clone)]
pub struct InMemoryRepository {
    clock: Clock,
    items: Arc<Mutex<HashMap<String, String>>>,
    documents: Arc<Mutex<HashMap<UserDocId, ProgressDocument>>>,
    item_writes: Arc<AtomicUsize>,
    document_writes: Arc<AtomicUsize>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Clock::default())
    }

    /// Use `clock` for the server-assigned `updated_at`.
    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            clock,
            items: Arc::new(Mutex::new(HashMap::new())),
            documents: Arc::new(Mutex::new(HashMap::new())),
            item_writes: Arc::new(AtomicUsize::new(0)),
            document_writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `set_item` calls so far.
    #[must_use]
    pub fn item_writes(&self) -> usize {
        self.item_writes.load(Ordering::SeqCst)
    }

    /// Number of `save_progress` calls so far.
    #[must_use]
    pub fn document_writes(&self) -> usize {
        self.document_writes.load(Ordering::SeqCst)
    }

    /// Current stored document, bypassing the trait (tests).
    #[must_use]
    pub fn document(&self, doc_id: &UserDocId) -> Option<ProgressDocument> {
        self.documents
            .lock()
            .ok()
            .and_then(|guard| guard.get(doc_id).cloned())
    }

    /// Current stored raw value, bypassing the trait (tests).
    #[must_use]
    pub fn item(&self, key: &str) -> Option<String> {
        self.items
            .lock()
            .ok()
            .and_then(|guard| guard.get(key).cloned())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryRepository {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        self.item_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl RemoteProgressStore for InMemoryRepository {
    async fn load_progress(
        &self,
        doc_id: &UserDocId,
    ) -> Result<Option<ProgressDocument>, StorageError> {
        let guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(doc_id).cloned())
    }

    async fn save_progress(
        &self,
        doc_id: &UserDocId,
        progress: &Progress,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        // Both arrays are replaced together, so a reader never sees half a write.
        guard.insert(
            doc_id.clone(),
            ProgressDocument {
                progress: progress.clone(),
                updated_at: Some(self.clock.now()),
            },
        );
        self.document_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Aggregates the local cache and optional remote store behind trait objects.
#[derive(Clone)]
pub struct Storage {
    pub cache: Arc<dyn KeyValueStore>,
    /// `None` when no remote document service is configured.
    pub remote: Option<Arc<dyn RemoteProgressStore>>,
}

impl Storage {
    /// Cache and remote backed by one shared in-memory repository.
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let cache: Arc<dyn KeyValueStore> = Arc::new(repo.clone());
        let remote: Arc<dyn RemoteProgressStore> = Arc::new(repo);
        Self {
            cache,
            remote: Some(remote),
        }
    }

    #[must_use]
    pub fn with_remote(mut self, remote: Arc<dyn RemoteProgressStore>) -> Self {
        self.remote = Some(remote);
        self
    }
}

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dex_core::Clock;
use dex_core::model::{Catalog, Progress, ProgressSnapshot, UserDocId, UserRef};
use storage::{KeyValueStore, RemoteProgressStore};
use tracing::{debug, info, warn};

use crate::progress_cache::ProgressCache;

//
// ─── EVENTS AND REPORTS ────────────────────────────────────────────────────────
//

/// Authentication change as delivered by the sign-in provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(UserRef),
    SignedOut,
}

/// Advisory shown next to progress when the remote store could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncNotice {
    /// The remote read or write failed; local progress is shown instead.
    Unavailable { reason: String },
    /// Signed in but no remote store is configured.
    NotConfigured,
}

impl fmt::Display for SyncNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncNotice::Unavailable { .. } => {
                write!(f, "Cloud sync is unavailable. Showing device-saved progress.")
            }
            SyncNotice::NotConfigured => {
                write!(f, "Cloud sync is not configured. Progress is saved on this device.")
            }
        }
    }
}

/// How a reconcile ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// No remote involvement: signed out, no usable id, or the remote failed.
    LocalOnly,
    /// Non-empty remote document replaced local progress.
    RemoteAdopted,
    /// Remote was empty; local progress was pushed up.
    LocalPushed,
    /// Remote and local already agree, or both are empty.
    Unchanged,
    /// The identity changed while this reconcile was in flight; its result was dropped.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub snapshot: ProgressSnapshot,
    pub action: SyncAction,
    pub notice: Option<SyncNotice>,
}

/// Outcome of the remote half of `persist`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemotePush {
    /// Signed out, no usable id, or no remote store.
    Skipped,
    Pushed,
    Failed,
    /// The identity changed before the write completed.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistReport {
    pub local_saved: bool,
    pub remote: RemotePush,
}

//
// ─── SYNCHRONIZER ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Default)]
struct SyncState {
    identity: Option<UserDocId>,
    /// Bumped on every identity change; async results carry the value they
    /// started with and are dropped if it moved on.
    generation: u64,
    view: ProgressSnapshot,
    /// Set once a reconcile has put the local (or adopted) snapshot into
    /// view; cleared on sign-out. An unloaded view is never persisted.
    loaded: bool,
    notice: Option<SyncNotice>,
}

/// Keeps the in-memory progress view, the local cache and the remote document
/// consistent across sign-in changes and answer events.
pub struct ProgressSynchronizer {
    clock: Clock,
    catalog: Arc<Catalog>,
    cache: ProgressCache,
    remote: Option<Arc<dyn RemoteProgressStore>>,
    state: Mutex<SyncState>,
}

impl ProgressSynchronizer {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<Catalog>,
        cache: Arc<dyn KeyValueStore>,
        remote: Option<Arc<dyn RemoteProgressStore>>,
    ) -> Self {
        Self {
            clock,
            catalog,
            cache: ProgressCache::new(cache),
            remote,
            state: Mutex::new(SyncState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current in-memory view.
    #[must_use]
    pub fn current(&self) -> ProgressSnapshot {
        self.lock().view.clone()
    }

    #[must_use]
    pub fn notice(&self) -> Option<SyncNotice> {
        self.lock().notice.clone()
    }

    /// Document key of the signed-in user, if any.
    #[must_use]
    pub fn identity(&self) -> Option<UserDocId> {
        self.lock().identity.clone()
    }

    /// Dispatch an authentication change.
    pub async fn handle_auth_change(&self, event: AuthEvent) -> ReconcileReport {
        match event {
            AuthEvent::SignedIn(user) => self.reconcile(Some(&user)).await,
            AuthEvent::SignedOut => self.sign_out(),
        }
    }

    /// Clear the in-memory view. The local cache is left as it is.
    pub fn sign_out(&self) -> ReconcileReport {
        let mut state = self.lock();
        state.identity = None;
        state.generation += 1;
        state.view = ProgressSnapshot::default();
        state.loaded = false;
        state.notice = None;
        info!("signed out; cleared progress view");
        ReconcileReport {
            snapshot: state.view.clone(),
            action: SyncAction::LocalOnly,
            notice: None,
        }
    }

    /// Load the local snapshot into view when nothing has been loaded since
    /// start-up or the last sign-out, so signed-out play builds on the device
    /// cache. Does nothing while a sign-in reconcile owns the view.
    pub async fn ensure_loaded(&self) {
        let needs_load = {
            let state = self.lock();
            !state.loaded && state.identity.is_none()
        };
        if needs_load {
            debug!("reloading local progress into an empty view");
            self.reconcile(None).await;
        }
    }

    /// Bring the view, local cache and remote document into agreement for
    /// `user`.
    ///
    /// Without a user (or without a usable id) the local snapshot is loaded
    /// into view and nothing remote is touched. With one, a non-empty remote
    /// document replaces local progress verbatim; otherwise non-empty local
    /// progress is pushed up. Remote failures keep local progress and raise a
    /// notice. Running it twice in a row is a no-op the second time.
    pub async fn reconcile(&self, user: Option<&UserRef>) -> ReconcileReport {
        let doc_id = user.and_then(UserRef::doc_id);
        let generation = self.begin(doc_id.clone());

        let local = self.cache.load().await;
        if !self.is_current(generation) {
            return self.superseded();
        }

        let Some(doc_id) = doc_id else {
            if user.is_some() {
                debug!("user has no usable id; staying local-only");
            }
            return self.finish(generation, local, None, SyncAction::LocalOnly, None);
        };

        let Some(remote) = self.remote.clone() else {
            return self.finish(
                generation,
                local,
                None,
                SyncAction::LocalOnly,
                Some(SyncNotice::NotConfigured),
            );
        };

        let loaded = match remote.load_progress(&doc_id).await {
            Ok(loaded) => loaded,
            Err(err) => {
                warn!(doc_id = %doc_id, error = %err, "failed to load remote progress");
                return self.finish(
                    generation,
                    local,
                    None,
                    SyncAction::LocalOnly,
                    Some(SyncNotice::Unavailable {
                        reason: err.to_string(),
                    }),
                );
            }
        };
        if !self.is_current(generation) {
            return self.superseded();
        }

        match loaded {
            Some(doc) if !doc.progress.is_empty() => {
                let unknown = self.catalog.unknown_ids(&doc.progress.collection).count();
                if unknown > 0 {
                    warn!(doc_id = %doc_id, unknown, "remote collection holds ids missing from the catalog");
                }
                let earned = self.catalog.earned_badges(&doc.progress.collection);
                let unearned = earned
                    .iter()
                    .filter(|breed| !doc.progress.badges.contains(breed))
                    .count();
                if unearned > 0 {
                    warn!(doc_id = %doc_id, unearned, "remote badges lag the collection");
                }

                if doc.progress == local {
                    debug!(doc_id = %doc_id, "remote and local already agree");
                    return self.finish(
                        generation,
                        local,
                        doc.updated_at,
                        SyncAction::Unchanged,
                        None,
                    );
                }

                info!(
                    doc_id = %doc_id,
                    collection_len = doc.progress.collection.len(),
                    badges_len = doc.progress.badges.len(),
                    "adopting remote progress"
                );
                if let Err(err) = self.cache.save(&doc.progress).await {
                    warn!(error = %err, "failed to persist adopted progress locally");
                }
                self.finish(
                    generation,
                    doc.progress,
                    doc.updated_at,
                    SyncAction::RemoteAdopted,
                    None,
                )
            }
            _ if !local.is_empty() => {
                match remote.save_progress(&doc_id, &local).await {
                    Ok(()) => {
                        info!(
                            doc_id = %doc_id,
                            collection_len = local.collection.len(),
                            "pushed local progress to empty remote"
                        );
                        let now = self.clock.now();
                        self.finish(generation, local, Some(now), SyncAction::LocalPushed, None)
                    }
                    Err(err) => {
                        warn!(doc_id = %doc_id, error = %err, "failed to push local progress");
                        self.finish(
                            generation,
                            local,
                            None,
                            SyncAction::LocalOnly,
                            Some(SyncNotice::Unavailable {
                                reason: err.to_string(),
                            }),
                        )
                    }
                }
            }
            _ => self.finish(generation, local, None, SyncAction::Unchanged, None),
        }
    }

    /// Apply `f` to the in-memory progress under the state lock.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns; the view is left untouched in that case.
    pub fn mutate<T, E>(
        &self,
        f: impl FnOnce(&mut Progress) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut state = self.lock();
        let mut next = state.view.progress.clone();
        let out = f(&mut next)?;
        state.view.progress = next;
        Ok(out)
    }

    /// Persist the current view: local cache first, then the remote document
    /// when a user is signed in. Neither failure touches the view.
    ///
    /// A view that was never loaded (fresh start or after sign-out) is not
    /// written anywhere.
    pub async fn persist(&self) -> PersistReport {
        let (progress, identity, generation) = {
            let state = self.lock();
            if !state.loaded {
                warn!("progress view not loaded; skipping persist");
                return PersistReport {
                    local_saved: false,
                    remote: RemotePush::Skipped,
                };
            }
            (
                state.view.progress.clone(),
                state.identity.clone(),
                state.generation,
            )
        };

        let local_saved = match self.cache.save(&progress).await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "failed to persist local progress");
                false
            }
        };

        let remote = match (identity, self.remote.clone()) {
            (Some(doc_id), Some(remote)) => {
                self.push_remote(remote.as_ref(), &doc_id, &progress, generation)
                    .await
            }
            _ => RemotePush::Skipped,
        };

        PersistReport {
            local_saved,
            remote,
        }
    }

    async fn push_remote(
        &self,
        remote: &dyn RemoteProgressStore,
        doc_id: &UserDocId,
        progress: &Progress,
        generation: u64,
    ) -> RemotePush {
        let result = remote.save_progress(doc_id, progress).await;

        let mut state = self.lock();
        if state.generation != generation {
            debug!(doc_id = %doc_id, "dropping push result for a previous identity");
            return RemotePush::Superseded;
        }
        match result {
            Ok(()) => {
                state.view.last_synced_at = Some(self.clock.now());
                state.notice = None;
                RemotePush::Pushed
            }
            Err(err) => {
                warn!(doc_id = %doc_id, error = %err, "failed to push progress");
                state.notice = Some(SyncNotice::Unavailable {
                    reason: err.to_string(),
                });
                RemotePush::Failed
            }
        }
    }

    /// Record the identity a reconcile targets. A change of identity
    /// invalidates every in-flight result for the previous one.
    fn begin(&self, doc_id: Option<UserDocId>) -> u64 {
        let mut state = self.lock();
        if state.identity != doc_id {
            state.identity = doc_id;
            state.generation += 1;
            state.view.last_synced_at = None;
        }
        state.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    fn superseded(&self) -> ReconcileReport {
        debug!("dropping reconcile result for a previous identity");
        let state = self.lock();
        ReconcileReport {
            snapshot: state.view.clone(),
            action: SyncAction::Superseded,
            notice: state.notice.clone(),
        }
    }

    fn finish(
        &self,
        generation: u64,
        progress: Progress,
        synced_at: Option<chrono::DateTime<chrono::Utc>>,
        action: SyncAction,
        notice: Option<SyncNotice>,
    ) -> ReconcileReport {
        let mut state = self.lock();
        if state.generation != generation {
            drop(state);
            return self.superseded();
        }

        // `begin` clears the sync time on an identity change, so `previous`
        // always belongs to this identity. Agreement keeps the time already
        // shown; it was stamped by whichever side wrote last.
        let previous = state.view.last_synced_at;
        let last_synced_at = match action {
            SyncAction::Unchanged => previous.or(synced_at),
            SyncAction::LocalOnly => synced_at.or(previous),
            _ => synced_at,
        };
        state.view = ProgressSnapshot::new(progress, last_synced_at);
        state.loaded = true;
        state.notice = notice.clone();

        ReconcileReport {
            snapshot: state.view.clone(),
            action,
            notice,
        }
    }
}

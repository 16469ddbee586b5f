use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dex_core::model::{
    BadgeState, BreedName, Catalog, CollectionState, Progress, UserDocId, UserRef, VariantId,
};
use dex_core::time::{fixed_clock, fixed_now};
use services::progress_cache::{BADGES_KEY, COLLECTION_KEY};
use services::{
    AuthEvent, CollectionService, ProgressCache, ProgressSynchronizer, RemotePush, SyncAction,
    SyncNotice,
};
use storage::{
    InMemoryRepository, KeyValueStore, ProgressDocument, RemoteProgressStore, StorageError,
};
use tokio::sync::Notify;

fn alice() -> UserRef {
    UserRef::from_uid("alice")
}

fn id(raw: &str) -> VariantId {
    VariantId::new(raw)
}

fn pug_progress() -> Progress {
    Progress::new(
        CollectionState::from_ids([id("pug-fawn"), id("pug-black")]),
        BadgeState::from_names([BreedName::new("Pug")]),
    )
}

fn synchronizer(
    cache: &InMemoryRepository,
    remote: Arc<dyn RemoteProgressStore>,
) -> Arc<ProgressSynchronizer> {
    Arc::new(ProgressSynchronizer::new(
        fixed_clock(),
        Arc::new(Catalog::builtin()),
        Arc::new(cache.clone()),
        Some(remote),
    ))
}

async fn seed_local(repo: &InMemoryRepository, progress: &Progress) {
    ProgressCache::new(Arc::new(repo.clone()))
        .save(progress)
        .await
        .unwrap();
}

/// Remote store that always fails, as when offline.
struct OfflineRemote;

#[async_trait]
impl RemoteProgressStore for OfflineRemote {
    async fn load_progress(
        &self,
        _doc_id: &UserDocId,
    ) -> Result<Option<ProgressDocument>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn save_progress(
        &self,
        _doc_id: &UserDocId,
        _progress: &Progress,
    ) -> Result<(), StorageError> {
        Err(StorageError::Connection("offline".into()))
    }
}

/// Remote store that can be switched between offline and online.
struct FlakyRemote {
    inner: InMemoryRepository,
    online: AtomicBool,
}

impl FlakyRemote {
    fn check(&self) -> Result<(), StorageError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Connection("offline".into()))
        }
    }
}

#[async_trait]
impl RemoteProgressStore for FlakyRemote {
    async fn load_progress(
        &self,
        doc_id: &UserDocId,
    ) -> Result<Option<ProgressDocument>, StorageError> {
        self.check()?;
        self.inner.load_progress(doc_id).await
    }

    async fn save_progress(
        &self,
        doc_id: &UserDocId,
        progress: &Progress,
    ) -> Result<(), StorageError> {
        self.check()?;
        self.inner.save_progress(doc_id, progress).await
    }
}

/// Remote store whose calls for one document wait for a release signal.
struct GatedRemote {
    inner: InMemoryRepository,
    gated: UserDocId,
    gate_loads: bool,
    entered: Notify,
    release: Notify,
}

impl GatedRemote {
    /// Gate reads of `user`'s document.
    fn loads(inner: InMemoryRepository, user: &UserRef) -> Arc<Self> {
        Self::build(inner, user, true)
    }

    /// Gate writes of `user`'s document.
    fn saves(inner: InMemoryRepository, user: &UserRef) -> Arc<Self> {
        Self::build(inner, user, false)
    }

    fn build(inner: InMemoryRepository, user: &UserRef, gate_loads: bool) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gated: user.doc_id().unwrap(),
            gate_loads,
            entered: Notify::new(),
            release: Notify::new(),
        })
    }

    async fn wait_if_gated(&self, doc_id: &UserDocId, is_load: bool) {
        if *doc_id == self.gated && is_load == self.gate_loads {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl RemoteProgressStore for GatedRemote {
    async fn load_progress(
        &self,
        doc_id: &UserDocId,
    ) -> Result<Option<ProgressDocument>, StorageError> {
        self.wait_if_gated(doc_id, true).await;
        self.inner.load_progress(doc_id).await
    }

    async fn save_progress(
        &self,
        doc_id: &UserDocId,
        progress: &Progress,
    ) -> Result<(), StorageError> {
        self.wait_if_gated(doc_id, false).await;
        self.inner.save_progress(doc_id, progress).await
    }
}

#[tokio::test]
async fn local_progress_bootstraps_empty_remote() {
    let cache = InMemoryRepository::new();
    let remote = InMemoryRepository::with_clock(fixed_clock());
    seed_local(
        &cache,
        &Progress::new(CollectionState::from_ids([id("labrador-yellow")]), BadgeState::new()),
    )
    .await;
    let sync = synchronizer(&cache, Arc::new(remote.clone()));

    let report = sync.reconcile(Some(&alice())).await;

    assert_eq!(report.action, SyncAction::LocalPushed);
    assert_eq!(report.snapshot.last_synced_at, Some(fixed_now()));
    let doc = remote.document(&alice().doc_id().unwrap()).unwrap();
    assert_eq!(doc.progress.collection.as_slice(), &[id("labrador-yellow")]);
    assert!(doc.progress.badges.is_empty());
}

#[tokio::test]
async fn non_empty_remote_replaces_local_verbatim() {
    let cache = InMemoryRepository::new();
    let remote = InMemoryRepository::with_clock(fixed_clock());
    remote
        .save_progress(&alice().doc_id().unwrap(), &pug_progress())
        .await
        .unwrap();
    let sync = synchronizer(&cache, Arc::new(remote.clone()));

    let report = sync.handle_auth_change(AuthEvent::SignedIn(alice())).await;

    assert_eq!(report.action, SyncAction::RemoteAdopted);
    assert_eq!(sync.current().progress, pug_progress());
    assert_eq!(
        cache.item(COLLECTION_KEY).as_deref(),
        Some(r#"["pug-fawn","pug-black"]"#)
    );
    assert_eq!(cache.item(BADGES_KEY).as_deref(), Some(r#"["Pug"]"#));
}

#[tokio::test]
async fn remote_wins_without_union() {
    let cache = InMemoryRepository::new();
    let remote = InMemoryRepository::new();
    seed_local(
        &cache,
        &Progress::new(CollectionState::from_ids([id("labrador-black")]), BadgeState::new()),
    )
    .await;
    remote
        .save_progress(&alice().doc_id().unwrap(), &pug_progress())
        .await
        .unwrap();
    let sync = synchronizer(&cache, Arc::new(remote.clone()));

    sync.reconcile(Some(&alice())).await;

    assert!(!sync.current().progress.collection.contains(&id("labrador-black")));
    assert_eq!(sync.current().progress, pug_progress());
}

#[tokio::test]
async fn reconcile_is_idempotent() {
    // The remote stamps `updatedAt` with its own clock, not the device's.
    let cache = InMemoryRepository::new();
    let remote = InMemoryRepository::new();
    seed_local(&cache, &pug_progress()).await;
    let sync = synchronizer(&cache, Arc::new(remote.clone()));

    let first = sync.reconcile(Some(&alice())).await;
    let item_writes = cache.item_writes();
    let document_writes = remote.document_writes();
    let second = sync.reconcile(Some(&alice())).await;

    assert_eq!(first.action, SyncAction::LocalPushed);
    assert_eq!(second.action, SyncAction::Unchanged);
    assert_eq!(first.snapshot, second.snapshot);
    assert_eq!(second.snapshot.last_synced_at, Some(fixed_now()));
    assert_eq!(cache.item_writes(), item_writes);
    assert_eq!(remote.document_writes(), document_writes);
}

#[tokio::test]
async fn repeat_unlock_writes_nothing() {
    let cache = InMemoryRepository::new();
    let remote = InMemoryRepository::new();
    let catalog = Arc::new(Catalog::builtin());
    let sync = synchronizer(&cache, Arc::new(remote.clone()));
    sync.reconcile(Some(&alice())).await;
    let collection = CollectionService::new(Arc::clone(&catalog), Arc::clone(&sync));

    let first = collection
        .record_answer(&id("labrador-yellow"), &id("labrador-yellow"))
        .await
        .unwrap();
    assert!(first.unlock.is_new());
    let item_writes = cache.item_writes();
    let document_writes = remote.document_writes();

    let again = collection
        .record_answer(&id("labrador-yellow"), &id("labrador-yellow"))
        .await
        .unwrap();

    assert!(again.correct);
    assert!(!again.unlock.is_new());
    assert_eq!(sync.current().progress.collection.len(), 1);
    assert_eq!(cache.item_writes(), item_writes);
    assert_eq!(remote.document_writes(), document_writes);
}

#[tokio::test]
async fn completing_a_breed_badges_it_once_everywhere() {
    let cache = InMemoryRepository::new();
    let remote = InMemoryRepository::new();
    let catalog = Arc::new(Catalog::builtin());
    let sync = synchronizer(&cache, Arc::new(remote.clone()));
    sync.reconcile(Some(&alice())).await;
    let collection = CollectionService::new(Arc::clone(&catalog), Arc::clone(&sync));

    collection
        .record_answer(&id("pug-fawn"), &id("pug-fawn"))
        .await
        .unwrap();
    let completing = collection
        .record_answer(&id("pug-black"), &id("pug-black"))
        .await
        .unwrap();
    let repeat = collection
        .record_answer(&id("pug-black"), &id("pug-black"))
        .await
        .unwrap();

    assert!(completing.badge.is_new());
    assert!(!repeat.badge.is_new());
    let doc = remote.document(&alice().doc_id().unwrap()).unwrap();
    assert_eq!(doc.progress.badges.as_slice(), &[BreedName::new("Pug")]);
    assert_eq!(cache.item(BADGES_KEY).as_deref(), Some(r#"["Pug"]"#));
}

#[tokio::test]
async fn signed_out_play_builds_on_device_cache() {
    let cache = InMemoryRepository::new();
    let remote = InMemoryRepository::new();
    let catalog = Arc::new(Catalog::builtin());
    seed_local(&cache, &pug_progress()).await;
    let sync = synchronizer(&cache, Arc::new(remote.clone()));
    sync.reconcile(Some(&alice())).await;
    sync.sign_out();
    let collection = CollectionService::new(Arc::clone(&catalog), Arc::clone(&sync));

    let outcome = collection
        .record_answer(&id("golden-dark"), &id("golden-dark"))
        .await
        .unwrap();

    assert!(outcome.unlock.is_new());
    let cached = ProgressCache::new(Arc::new(cache.clone())).load().await;
    assert_eq!(
        cached.collection.as_slice(),
        &[id("pug-fawn"), id("pug-black"), id("golden-dark")]
    );
    assert_eq!(cached.badges.as_slice(), &[BreedName::new("Pug")]);
    assert_eq!(remote.document_writes(), 1);
}

#[tokio::test]
async fn remote_failure_keeps_local_and_raises_notice() {
    let cache = InMemoryRepository::new();
    seed_local(&cache, &pug_progress()).await;
    let sync = synchronizer(&cache, Arc::new(OfflineRemote));

    let report = sync.reconcile(Some(&alice())).await;

    assert_eq!(report.action, SyncAction::LocalOnly);
    assert!(matches!(report.notice, Some(SyncNotice::Unavailable { .. })));
    assert_eq!(sync.current().progress, pug_progress());
}

#[tokio::test]
async fn failed_push_does_not_revert_unlock() {
    let cache = InMemoryRepository::new();
    let catalog = Arc::new(Catalog::builtin());
    let sync = synchronizer(&cache, Arc::new(OfflineRemote));
    sync.reconcile(Some(&alice())).await;
    let collection = CollectionService::new(Arc::clone(&catalog), Arc::clone(&sync));

    let outcome = collection
        .record_answer(&id("golden-dark"), &id("golden-dark"))
        .await
        .unwrap();

    assert!(outcome.unlock.is_new());
    assert!(sync.current().progress.collection.contains(&id("golden-dark")));
    assert_eq!(
        cache.item(COLLECTION_KEY).as_deref(),
        Some(r#"["golden-dark"]"#)
    );
    assert!(sync.notice().is_some());
}

#[tokio::test]
async fn successful_reconcile_clears_previous_notice() {
    let cache = InMemoryRepository::new();
    let remote = Arc::new(FlakyRemote {
        inner: InMemoryRepository::new(),
        online: AtomicBool::new(false),
    });
    let sync = synchronizer(&cache, remote.clone());

    sync.reconcile(Some(&alice())).await;
    assert!(sync.notice().is_some());

    remote.online.store(true, Ordering::SeqCst);
    sync.reconcile(Some(&alice())).await;
    assert!(sync.notice().is_none());
}

#[tokio::test]
async fn corrupt_cache_counts_as_empty() {
    let cache = InMemoryRepository::new();
    let remote = InMemoryRepository::new();
    cache.set_item(COLLECTION_KEY, "][").await.unwrap();
    cache.set_item(BADGES_KEY, "42").await.unwrap();
    let sync = synchronizer(&cache, Arc::new(remote.clone()));

    let report = sync.reconcile(Some(&alice())).await;

    assert_eq!(report.action, SyncAction::Unchanged);
    assert!(report.snapshot.is_empty());
    assert!(report.notice.is_none());
    assert_eq!(remote.document_writes(), 0);
}

#[tokio::test]
async fn stale_reconcile_result_is_dropped() {
    let cache = InMemoryRepository::new();
    let backing = InMemoryRepository::new();
    backing
        .save_progress(&alice().doc_id().unwrap(), &pug_progress())
        .await
        .unwrap();
    let remote = GatedRemote::loads(backing, &alice());
    let sync = synchronizer(&cache, remote.clone());

    let pending = tokio::spawn({
        let sync = Arc::clone(&sync);
        async move { sync.reconcile(Some(&alice())).await }
    });
    remote.entered.notified().await;

    let bob = sync.reconcile(Some(&UserRef::from_uid("bob"))).await;
    remote.release.notify_one();
    let stale = pending.await.unwrap();

    assert_eq!(bob.action, SyncAction::Unchanged);
    assert_eq!(stale.action, SyncAction::Superseded);
    assert!(sync.current().is_empty());
    assert_eq!(sync.identity(), UserRef::from_uid("bob").doc_id());
    assert_eq!(cache.item_writes(), 0);
}

#[tokio::test]
async fn push_for_previous_identity_is_dropped() {
    let cache = InMemoryRepository::new();
    let remote = GatedRemote::saves(InMemoryRepository::new(), &alice());
    let sync = synchronizer(&cache, remote.clone());
    sync.reconcile(Some(&alice())).await;
    sync.mutate(|progress| {
        progress.collection.insert(id("pug-fawn"));
        Ok::<_, ()>(())
    })
    .unwrap();

    let pending = tokio::spawn({
        let sync = Arc::clone(&sync);
        async move { sync.persist().await }
    });
    remote.entered.notified().await;
    sync.sign_out();
    remote.release.notify_one();
    let report = pending.await.unwrap();

    assert!(report.local_saved);
    assert_eq!(report.remote, RemotePush::Superseded);
    assert!(sync.current().is_empty());
    assert!(sync.current().last_synced_at.is_none());
    assert!(sync.notice().is_none());
}

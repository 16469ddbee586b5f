use storage::KeyValueStore;
use storage::Storage;
use storage::sqlite::SqliteRepository;

#[tokio::test]
async fn sqlite_roundtrip_overwrites_values() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert_eq!(repo.get_item("dogCollection").await.unwrap(), None);

    repo.set_item("dogCollection", r#"["pug-fawn"]"#).await.unwrap();
    repo.set_item("dogCollection", r#"["pug-fawn","pug-black"]"#)
        .await
        .unwrap();

    let stored = repo.get_item("dogCollection").await.unwrap();
    assert_eq!(stored.as_deref(), Some(r#"["pug-fawn","pug-black"]"#));
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.set_item("breedBadges", r#"["Pug"]"#).await.unwrap();
    repo.migrate().await.expect("second migrate");

    assert_eq!(
        repo.get_item("breedBadges").await.unwrap().as_deref(),
        Some(r#"["Pug"]"#)
    );
}

#[tokio::test]
async fn sqlite_storage_has_no_remote() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage?mode=memory&cache=shared")
        .await
        .expect("storage");
    assert!(storage.remote.is_none());

    storage.cache.set_item("k", "v").await.unwrap();
    assert_eq!(storage.cache.get_item("k").await.unwrap().as_deref(), Some("v"));
}

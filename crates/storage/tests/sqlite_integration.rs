use progress_core::codec::PROGRESS_STORAGE_KEY;
use storage::repository::{ProgressRepository, Storage};
use storage::sqlite::SqliteRepository;

#[tokio::test]
async fn sqlite_roundtrip_persists_payload() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    assert_eq!(repo.key(), PROGRESS_STORAGE_KEY);

    assert!(repo.load().await.unwrap().is_none());

    repo.save(r#"{"completedTopics":["caching"]}"#).await.unwrap();
    repo.save(r#"{"completedTopics":["caching","dns"]}"#)
        .await
        .unwrap();

    let fetched = repo.load().await.expect("load");
    assert_eq!(
        fetched.as_deref(),
        Some(r#"{"completedTopics":["caching","dns"]}"#)
    );
}

#[tokio::test]
async fn sqlite_clear_removes_only_its_slot() {
    let url = "sqlite:file:memdb_clear?mode=memory&cache=shared";
    let mine = SqliteRepository::connect(url).await.expect("connect");
    mine.migrate().await.expect("migrate");
    let theirs = mine.clone().with_key("another-app");

    mine.save("{}").await.unwrap();
    theirs.save("[]").await.unwrap();

    mine.clear().await.unwrap();
    assert!(mine.load().await.unwrap().is_none());
    assert_eq!(theirs.load().await.unwrap().as_deref(), Some("[]"));

    // Clearing an empty slot is not an error.
    mine.clear().await.unwrap();
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(applied, 1);
}

#[tokio::test]
async fn storage_sqlite_uses_requested_key() {
    let storage = Storage::sqlite(
        "sqlite:file:memdb_storage?mode=memory&cache=shared",
        "custom-progress",
    )
    .await
    .expect("storage");
    assert_eq!(storage.progress.key(), "custom-progress");

    storage.progress.save(r#"{"timeSpent":5}"#).await.unwrap();
    assert_eq!(
        storage.progress.load().await.unwrap().as_deref(),
        Some(r#"{"timeSpent":5}"#)
    );
}

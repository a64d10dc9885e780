//! Integration tests for CheckpointStore implementations
//!
//! The JSON file store runs against a temporary directory, so these tests
//! exercise the real on-disk layout and atomic writes.

use std::collections::BTreeMap;

use chrono::Utc;
use checkpoint::{
    CheckpointError, CheckpointStatus, CheckpointStore, JsonFileStore, MemoryStore, NoopStore,
    ProviderProgress, StoreConfig,
};
use types::{GameRecord, Provider};

fn game(id: &str, name: &str) -> GameRecord {
    GameRecord::new(id, name, &name.to_lowercase(), "https://img/thumb.png")
}

fn sample_progress() -> ProviderProgress {
    let mut progress = ProviderProgress::new(Provider::new("nolimit-city", "Nolimit City"));
    progress.set_total_games(100);
    progress.merge_page(0, vec![game("n1", "Mental"), game("n2", "Tombstone")]);
    progress.merge_page(78, vec![game("n3", "San Quentin &amp; Co")]);
    progress.record_offsets([0, 78], [39], [(39, 20)]);
    progress
}

/// Persisting then reloading reproduces the offset bookkeeping exactly
#[tokio::test]
async fn test_json_store_round_trip() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut store = JsonFileStore::new(&StoreConfig::rooted_at(dir.path()));
    let progress = sample_progress();
    let now = Utc::now();
    let checkpoint = progress.checkpoint(now, Some(uuid::Uuid::new_v4()));

    store
        .save(&checkpoint, &progress.games_file(now))
        .await
        .expect("Failed to save");

    let saved = store.load("nolimit-city").await.expect("Failed to load");
    let reloaded = saved.checkpoint.clone().expect("Checkpoint missing");
    assert_eq!(reloaded.completed_offsets, vec![0, 78]);
    assert_eq!(reloaded.failed_offsets, vec![39]);
    assert_eq!(reloaded.retry_counts, BTreeMap::from([(39, 20)]));
    assert_eq!(reloaded, checkpoint);

    let restored = ProviderProgress::restore(
        Provider::new("nolimit-city", "Nolimit City"),
        saved,
        types::PAGE_SIZE,
    )
    .expect("Failed to restore");
    assert_eq!(restored, progress);
}

/// The files on disk use the field names other tools read
#[tokio::test]
async fn test_json_store_file_format() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut store = JsonFileStore::new(&StoreConfig::rooted_at(dir.path()));
    let progress = sample_progress();
    let now = Utc::now();
    store
        .save(&progress.checkpoint(now, None), &progress.games_file(now))
        .await
        .expect("Failed to save");

    let raw = std::fs::read_to_string(store.checkpoint_path("nolimit-city")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    for field in [
        "timestamp",
        "provider_slug",
        "provider_name",
        "status",
        "total_games",
        "games_fetched",
        "is_complete",
        "needs_pagination",
        "completed_offsets",
        "failed_offsets",
        "retry_counts",
        "last_successful_offset",
    ] {
        assert!(value.get(field).is_some(), "missing {field}");
    }
    assert_eq!(value["status"], "in_progress");
    assert_eq!(value["last_successful_offset"], 78);
    assert_eq!(value["needs_pagination"], true);

    let raw = std::fs::read_to_string(store.games_path("nolimit-city")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let games = value["games"].as_array().unwrap();
    assert_eq!(games.len(), 3);
    assert_eq!(games[2]["id"], "n3");
    assert_eq!(
        games[2]["expectedFilename"],
        "Nolimit City - San Quentin & Co.webp"
    );
}

/// Loading a provider that was never saved yields empty progress
#[tokio::test]
async fn test_json_store_load_missing() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut store = JsonFileStore::new(&StoreConfig::rooted_at(dir.path()));
    let saved = store.load("hacksaw-gaming").await.expect("Failed to load");
    assert!(saved.is_empty());
}

/// A truncated checkpoint file surfaces as corruption, never as empty progress
#[tokio::test]
async fn test_json_store_detects_corruption() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut store = JsonFileStore::new(&StoreConfig::rooted_at(dir.path()));
    let path = store.checkpoint_path("hacksaw-gaming");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{"provider_slug": "hacksaw-gaming", "completed_"#).unwrap();

    let result = store.load("hacksaw-gaming").await;
    assert!(matches!(result, Err(CheckpointError::Corrupt { .. })));
}

/// A completed provider is saved with the completed status
#[tokio::test]
async fn test_completed_status_after_all_games() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut store = JsonFileStore::new(&StoreConfig::rooted_at(dir.path()));
    let mut progress = ProviderProgress::new(Provider::new("spribe", "Spribe"));
    progress.set_total_games(2);
    progress.merge_page(0, vec![game("s1", "Aviator"), game("s2", "Mines")]);
    progress.record_offsets([0], [], []);
    let now = Utc::now();
    store
        .save(&progress.checkpoint(now, None), &progress.games_file(now))
        .await
        .expect("Failed to save");

    let checkpoint = store
        .load("spribe")
        .await
        .expect("Failed to load")
        .checkpoint
        .expect("Checkpoint missing");
    assert_eq!(checkpoint.status, CheckpointStatus::Completed);
    assert!(checkpoint.is_complete);
    assert!(!checkpoint.needs_pagination);
}

/// Test store trait object compatibility
#[tokio::test]
async fn test_store_trait_objects() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let progress = sample_progress();
    let now = Utc::now();
    let stores: Vec<Box<dyn CheckpointStore>> = vec![
        Box::new(JsonFileStore::new(&StoreConfig::rooted_at(dir.path()))),
        Box::new(MemoryStore::new()),
        Box::new(NoopStore),
    ];
    for mut store in stores {
        store
            .save(&progress.checkpoint(now, None), &progress.games_file(now))
            .await
            .expect("Failed to save");
    }
}

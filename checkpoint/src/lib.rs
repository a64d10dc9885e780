pub mod config;
pub mod error;
pub mod metadata;
pub mod models;
pub mod progress;
pub mod retry;
pub mod stores;
pub mod summary;

pub use config::{StoreConfig, StoreSection};
pub use error::CheckpointError;
pub use metadata::{metadata_csv, metadata_rows, write_metadata_csv, GameMetadataRow};
pub use models::{CheckpointRecord, CheckpointStatus, GamesFile, SavedProgress, StoredGame};
pub use progress::ProviderProgress;
pub use retry::retry_with_backoff;
pub use stores::{CheckpointStore, JsonFileStore, MemoryStore};
pub use summary::{load_games_files, summarize, write_summary, CatalogSummary, ProviderSummary};

// NoopStore for dry runs where nothing should be persisted
pub struct NoopStore;

#[async_trait::async_trait]
impl stores::CheckpointStore for NoopStore {
    async fn load(&mut self, _provider_slug: &str) -> Result<SavedProgress, CheckpointError> {
        Ok(SavedProgress::default())
    }

    async fn save(
        &mut self,
        _checkpoint: &CheckpointRecord,
        _games: &GamesFile,
    ) -> Result<(), CheckpointError> {
        Ok(())
    }
}

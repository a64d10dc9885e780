use async_trait::async_trait;

use crate::models::{CheckpointRecord, GamesFile, SavedProgress};
use crate::CheckpointError;

/// Durable home for per-provider progress. A driver run is the only writer
/// for its provider while it runs.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&mut self, provider_slug: &str) -> Result<SavedProgress, CheckpointError>;

    /// Writes the games file and then the checkpoint. Both must be durable
    /// when this returns `Ok`.
    async fn save(
        &mut self,
        checkpoint: &CheckpointRecord,
        games: &GamesFile,
    ) -> Result<(), CheckpointError>;
}

#[async_trait]
impl<S: CheckpointStore + ?Sized> CheckpointStore for Box<S> {
    async fn load(&mut self, provider_slug: &str) -> Result<SavedProgress, CheckpointError> {
        (**self).load(provider_slug).await
    }

    async fn save(
        &mut self,
        checkpoint: &CheckpointRecord,
        games: &GamesFile,
    ) -> Result<(), CheckpointError> {
        (**self).save(checkpoint, games).await
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::CheckpointStore;
use crate::models::{CheckpointRecord, GamesFile, SavedProgress};
use crate::CheckpointError;

#[derive(Default)]
struct Inner {
    saved: HashMap<String, SavedProgress>,
    saves: usize,
    fail_after: Option<usize>,
}

/// Keeps progress in memory. Clones share the same storage, so a test can
/// hand one clone to a driver and inspect the other.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose saves start failing once `successful` saves went through.
    pub fn failing_after(successful: usize) -> Self {
        let store = Self::default();
        store.lock().fail_after = Some(successful);
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, provider_slug: &str, saved: SavedProgress) {
        self.lock().saved.insert(provider_slug.to_string(), saved);
    }

    pub fn get(&self, provider_slug: &str) -> Option<SavedProgress> {
        self.lock().saved.get(provider_slug).cloned()
    }

    pub fn save_count(&self) -> usize {
        self.lock().saves
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    async fn load(&mut self, provider_slug: &str) -> Result<SavedProgress, CheckpointError> {
        Ok(self.get(provider_slug).unwrap_or_default())
    }

    async fn save(
        &mut self,
        checkpoint: &CheckpointRecord,
        games: &GamesFile,
    ) -> Result<(), CheckpointError> {
        let mut inner = self.lock();
        if matches!(inner.fail_after, Some(limit) if inner.saves >= limit) {
            return Err(CheckpointError::io(
                format!("memory://{}", checkpoint.provider_slug),
                std::io::Error::new(std::io::ErrorKind::Other, "store unavailable"),
            ));
        }
        inner.saves += 1;
        inner.saved.insert(
            checkpoint.provider_slug.clone(),
            SavedProgress {
                checkpoint: Some(checkpoint.clone()),
                games: Some(games.clone()),
            },
        );
        Ok(())
    }
}

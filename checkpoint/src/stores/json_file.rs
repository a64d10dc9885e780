use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::CheckpointStore;
use crate::models::{CheckpointRecord, GamesFile, SavedProgress};
use crate::retry::retry_with_backoff;
use crate::{CheckpointError, StoreConfig};

/// Stores each provider as two JSON files:
/// `<checkpoint_dir>/<slug>_checkpoint.json` and
/// `<output_dir>/<slug>/games.json`.
pub struct JsonFileStore {
    checkpoint_dir: PathBuf,
    output_dir: PathBuf,
    write_retries: usize,
    retry_delay: Duration,
}

impl JsonFileStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            checkpoint_dir: config.checkpoint_dir.clone(),
            output_dir: config.output_dir.clone(),
            write_retries: config.write_retries,
            retry_delay: config.retry_delay,
        }
    }

    pub fn checkpoint_path(&self, provider_slug: &str) -> PathBuf {
        self.checkpoint_dir
            .join(format!("{provider_slug}_checkpoint.json"))
    }

    pub fn games_path(&self, provider_slug: &str) -> PathBuf {
        self.output_dir.join(provider_slug).join("games.json")
    }

    async fn write_json<T: Serialize>(&self, path: PathBuf, value: &T) -> Result<(), CheckpointError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        retry_with_backoff(
            || Box::pin(write_atomic(path.clone(), bytes.clone())),
            self.write_retries,
            self.retry_delay,
        )
        .await
        .map_err(|e| match e {
            CheckpointError::Io { path, source } if self.write_retries > 0 => {
                CheckpointError::RetryExhausted(format!(
                    "writing {} failed {} times: {source}",
                    path.display(),
                    self.write_retries + 1
                ))
            }
            other => other,
        })
    }
}

/// Writes to a sibling temp file and renames it over `path`, so readers see
/// either the old content or the new content and never a torn write.
pub async fn write_atomic(path: PathBuf, bytes: Vec<u8>) -> Result<(), CheckpointError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CheckpointError::io(parent, e))?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|e| CheckpointError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, &path)
        .await
        .map_err(|e| CheckpointError::io(&path, e))?;
    Ok(())
}

pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CheckpointError> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CheckpointError::io(path, e)),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| CheckpointError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

#[async_trait]
impl CheckpointStore for JsonFileStore {
    async fn load(&mut self, provider_slug: &str) -> Result<SavedProgress, CheckpointError> {
        let checkpoint_path = self.checkpoint_path(provider_slug);
        let games_path = self.games_path(provider_slug);
        let saved = SavedProgress {
            checkpoint: read_json(&checkpoint_path).await?,
            games: read_json(&games_path).await?,
        };
        tracing::debug!(
            "Loaded {} for {provider_slug}: checkpoint={} games={}",
            checkpoint_path.display(),
            saved.checkpoint.is_some(),
            saved.games.is_some()
        );
        Ok(saved)
    }

    async fn save(
        &mut self,
        checkpoint: &CheckpointRecord,
        games: &GamesFile,
    ) -> Result<(), CheckpointError> {
        let slug = &checkpoint.provider_slug;
        if games.provider_slug != *slug {
            return Err(CheckpointError::Config(format!(
                "games file for {} saved with checkpoint for {slug}",
                games.provider_slug
            )));
        }
        self.write_json(self.games_path(slug), games).await?;
        self.write_json(self.checkpoint_path(slug), checkpoint)
            .await?;
        tracing::info!(
            "Saved checkpoint for {slug}: {}/{} games, status {}",
            checkpoint.games_fetched,
            checkpoint
                .total_games
                .map_or_else(|| "?".to_string(), |t| t.to_string()),
            checkpoint.status
        );
        Ok(())
    }
}

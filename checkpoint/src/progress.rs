use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use types::page::is_page_aligned;
use types::{thumbnail_file_name, GameRecord, Offset, Provider};
use uuid::Uuid;

use crate::models::{CheckpointRecord, CheckpointStatus, GamesFile, SavedProgress, StoredGame};
use crate::CheckpointError;

/// Everything known about one provider's completion: fetched pages keyed by
/// offset plus the offset bookkeeping that gets persisted with them.
///
/// Merging a page replaces whatever was stored for that offset, so
/// re-fetching a page never duplicates its games.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProgress {
    provider: Provider,
    total_games: Option<u64>,
    records_by_offset: BTreeMap<Offset, Vec<GameRecord>>,
    completed_offsets: BTreeSet<Offset>,
    failed_offsets: BTreeSet<Offset>,
    retry_counts: BTreeMap<Offset, u32>,
}

impl ProviderProgress {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            total_games: None,
            records_by_offset: BTreeMap::new(),
            completed_offsets: BTreeSet::new(),
            failed_offsets: BTreeSet::new(),
            retry_counts: BTreeMap::new(),
        }
    }

    /// Rebuilds progress from what a store returned.
    ///
    /// Offsets that have games in the games file count as completed, unless
    /// the checkpoint written alongside it lists them as failed (a partial
    /// page kept while the offset is retried). A games file newer than the
    /// checkpoint means the checkpoint write never made it to disk, and the
    /// games file wins.
    pub fn restore(
        provider: Provider,
        saved: SavedProgress,
        page_size: u64,
    ) -> Result<Self, CheckpointError> {
        let slug = provider.slug.clone();
        let mut progress = Self::new(provider);
        let corrupt = |reason: String| CheckpointError::Corrupt {
            path: progress_path_hint(&slug),
            reason,
        };

        let mut games_written = None;
        if let Some(games) = saved.games {
            if games.provider_slug != slug {
                return Err(corrupt(format!(
                    "games file belongs to {}",
                    games.provider_slug
                )));
            }
            games_written = Some(games.timestamp);
            progress.total_games = games.total_games;
            for stored in games.games {
                progress
                    .records_by_offset
                    .entry(stored.source_offset)
                    .or_default()
                    .push(stored.record);
            }
        }
        let with_games: BTreeSet<Offset> = progress.records_by_offset.keys().copied().collect();

        let Some(checkpoint) = saved.checkpoint else {
            progress.completed_offsets = with_games;
            return Ok(progress);
        };
        if checkpoint.provider_slug != slug {
            return Err(corrupt(format!(
                "checkpoint belongs to {}",
                checkpoint.provider_slug
            )));
        }
        let offsets = checkpoint
            .completed_offsets
            .iter()
            .chain(checkpoint.failed_offsets.iter())
            .chain(checkpoint.retry_counts.keys());
        for offset in offsets {
            if !is_page_aligned(*offset, page_size) {
                return Err(corrupt(format!(
                    "offset {offset} is not a multiple of {page_size}"
                )));
            }
        }

        let stale = games_written.is_some_and(|written| written > checkpoint.timestamp);
        progress.total_games = checkpoint.total_games.or(progress.total_games);
        progress.completed_offsets = checkpoint.completed_offsets.into_iter().collect();
        progress.completed_offsets.extend(
            with_games
                .into_iter()
                .filter(|offset| stale || !checkpoint.failed_offsets.contains(offset)),
        );
        progress.failed_offsets = checkpoint
            .failed_offsets
            .into_iter()
            .filter(|offset| !progress.completed_offsets.contains(offset))
            .collect();
        progress.retry_counts = checkpoint
            .retry_counts
            .into_iter()
            .filter(|(offset, _)| !progress.completed_offsets.contains(offset))
            .collect();
        Ok(progress)
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn total_games(&self) -> Option<u64> {
        self.total_games
    }

    pub fn set_total_games(&mut self, total: u64) {
        self.total_games = Some(total);
    }

    /// Stores `records` as the content of `offset`, returning what was there.
    pub fn merge_page(
        &mut self,
        offset: Offset,
        records: Vec<GameRecord>,
    ) -> Option<Vec<GameRecord>> {
        self.records_by_offset.insert(offset, records)
    }

    pub fn records_at(&self, offset: Offset) -> Option<&[GameRecord]> {
        self.records_by_offset.get(&offset).map(Vec::as_slice)
    }

    /// Replaces the offset bookkeeping with a snapshot taken from the tracker.
    pub fn record_offsets(
        &mut self,
        completed: impl IntoIterator<Item = Offset>,
        failed: impl IntoIterator<Item = Offset>,
        retry_counts: impl IntoIterator<Item = (Offset, u32)>,
    ) {
        self.completed_offsets = completed.into_iter().collect();
        self.failed_offsets = failed.into_iter().collect();
        self.retry_counts = retry_counts
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .collect();
    }

    pub fn completed_offsets(&self) -> &BTreeSet<Offset> {
        &self.completed_offsets
    }

    pub fn failed_offsets(&self) -> &BTreeSet<Offset> {
        &self.failed_offsets
    }

    pub fn retry_counts(&self) -> &BTreeMap<Offset, u32> {
        &self.retry_counts
    }

    /// Unique games in offset order. A game listed on more than one page is
    /// kept at its lowest offset.
    pub fn merged_records(&self) -> Vec<(Offset, &GameRecord)> {
        let mut seen = HashSet::new();
        self.records_by_offset
            .iter()
            .flat_map(|(offset, records)| records.iter().map(move |r| (*offset, r)))
            .filter(|(_, record)| seen.insert(record.id.as_str()))
            .collect()
    }

    pub fn games_fetched(&self) -> u64 {
        self.merged_records().len() as u64
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.total_games, Some(total) if self.games_fetched() >= total)
    }

    pub fn needs_pagination(&self) -> bool {
        matches!(self.total_games, Some(total) if total > self.games_fetched())
    }

    pub fn last_successful_offset(&self) -> i64 {
        self.completed_offsets
            .iter()
            .next_back()
            .map_or(-1, |offset| *offset as i64)
    }

    pub fn checkpoint(&self, timestamp: DateTime<Utc>, run_id: Option<Uuid>) -> CheckpointRecord {
        let is_complete = self.is_complete();
        CheckpointRecord {
            timestamp,
            provider_slug: self.provider.slug.clone(),
            provider_name: self.provider.name.clone(),
            status: if is_complete {
                CheckpointStatus::Completed
            } else {
                CheckpointStatus::InProgress
            },
            total_games: self.total_games,
            games_fetched: self.games_fetched(),
            is_complete,
            needs_pagination: self.needs_pagination(),
            completed_offsets: self.completed_offsets.iter().copied().collect(),
            failed_offsets: self.failed_offsets.iter().copied().collect(),
            retry_counts: self.retry_counts.clone(),
            last_successful_offset: self.last_successful_offset(),
            run_id,
        }
    }

    pub fn games_file(&self, timestamp: DateTime<Utc>) -> GamesFile {
        let games: Vec<StoredGame> = self
            .merged_records()
            .into_iter()
            .map(|(offset, record)| StoredGame {
                expected_filename: thumbnail_file_name(&self.provider.name, &record.name),
                record: record.clone(),
                source_offset: offset,
            })
            .collect();
        GamesFile {
            timestamp,
            provider_slug: self.provider.slug.clone(),
            provider_name: self.provider.name.clone(),
            total_games: self.total_games,
            games_fetched: games.len() as u64,
            games,
        }
    }
}

fn progress_path_hint(slug: &str) -> std::path::PathBuf {
    std::path::PathBuf::from(format!("{slug}_checkpoint.json"))
}

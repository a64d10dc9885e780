use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use types::{GameRecord, Offset};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    Completed,
    InProgress,
}

impl Display for CheckpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointStatus::Completed => write!(f, "completed"),
            CheckpointStatus::InProgress => write!(f, "in_progress"),
        }
    }
}

/// Per-provider progress as written to `<slug>_checkpoint.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub timestamp: DateTime<Utc>,
    pub provider_slug: String,
    pub provider_name: String,
    pub status: CheckpointStatus,
    pub total_games: Option<u64>,
    pub games_fetched: u64,
    pub is_complete: bool,
    pub needs_pagination: bool,
    pub completed_offsets: Vec<Offset>,
    #[serde(default)]
    pub failed_offsets: Vec<Offset>,
    #[serde(default)]
    pub retry_counts: BTreeMap<Offset, u32>,
    pub last_successful_offset: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
}

/// A game as stored in the games file, tagged with the page it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredGame {
    #[serde(flatten)]
    pub record: GameRecord,
    pub source_offset: Offset,
    pub expected_filename: String,
}

/// Every game fetched so far for one provider, ordered by source offset and
/// then by position within the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamesFile {
    pub timestamp: DateTime<Utc>,
    pub provider_slug: String,
    pub provider_name: String,
    pub total_games: Option<u64>,
    pub games_fetched: u64,
    pub games: Vec<StoredGame>,
}

/// Whatever a store holds for one provider. Either half may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedProgress {
    pub checkpoint: Option<CheckpointRecord>,
    pub games: Option<GamesFile>,
}

impl SavedProgress {
    pub fn is_empty(&self) -> bool {
        self.checkpoint.is_none() && self.games.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_json_field_names() {
        let record = CheckpointRecord {
            timestamp: Utc::now(),
            provider_slug: "bgaming".to_string(),
            provider_name: "BGaming".to_string(),
            status: CheckpointStatus::InProgress,
            total_games: Some(100),
            games_fetched: 39,
            is_complete: false,
            needs_pagination: true,
            completed_offsets: vec![0],
            failed_offsets: vec![39],
            retry_counts: BTreeMap::from([(39, 2)]),
            last_successful_offset: 0,
            run_id: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "in_progress");
        assert_eq!(value["retry_counts"]["39"], 2);
        assert_eq!(value["last_successful_offset"], 0);
        assert!(value.get("run_id").is_none());

        let back: CheckpointRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_stored_game_flattens_record() {
        let stored = StoredGame {
            record: GameRecord::new("g1", "Plinko", "plinko", "https://img/plinko.png"),
            source_offset: 78,
            expected_filename: "Spribe - Plinko.webp".to_string(),
        };
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["id"], "g1");
        assert_eq!(value["thumbnailUrl"], "https://img/plinko.png");
        assert_eq!(value["sourceOffset"], 78);
        let back: StoredGame = serde_json::from_value(value).unwrap();
        assert_eq!(back, stored);
    }
}

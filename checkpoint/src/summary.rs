use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::models::GamesFile;
use crate::stores::json_file::{read_json, write_atomic};
use crate::CheckpointError;

const TOP_PROVIDERS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSummary {
    pub provider_slug: String,
    pub provider_name: String,
    pub total_games: u64,
    pub expected_games: Option<u64>,
    pub duplicates_removed: u64,
    pub blocked_games: u64,
    pub widget_enabled_games: u64,
    pub expected_thumbnails: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub generated_at: DateTime<Utc>,
    pub total_providers: usize,
    pub total_games: u64,
    pub duplicates_removed: u64,
    pub blocked_games: u64,
    pub widget_enabled_games: u64,
    pub top_providers: Vec<(String, u64)>,
    pub providers: Vec<ProviderSummary>,
}

fn summarize_provider(file: &GamesFile) -> ProviderSummary {
    let mut seen = HashSet::new();
    let unique: Vec<_> = file
        .games
        .iter()
        .filter(|game| seen.insert(game.record.id.as_str()))
        .collect();

    ProviderSummary {
        provider_slug: file.provider_slug.clone(),
        provider_name: file.provider_name.clone(),
        total_games: unique.len() as u64,
        expected_games: file.total_games,
        duplicates_removed: (file.games.len() - unique.len()) as u64,
        blocked_games: unique.iter().filter(|g| g.record.is_blocked).count() as u64,
        widget_enabled_games: unique
            .iter()
            .filter(|g| g.record.is_widget_enabled)
            .count() as u64,
        expected_thumbnails: unique
            .iter()
            .map(|g| g.expected_filename.clone())
            .collect(),
    }
}

/// Rolls the games files of every provider into one summary. Providers are
/// listed largest first, ties broken by slug.
pub fn summarize(files: &[GamesFile], generated_at: DateTime<Utc>) -> CatalogSummary {
    let providers: Vec<ProviderSummary> = files
        .iter()
        .map(summarize_provider)
        .sorted_by(|a, b| {
            b.total_games
                .cmp(&a.total_games)
                .then_with(|| a.provider_slug.cmp(&b.provider_slug))
        })
        .collect();

    CatalogSummary {
        generated_at,
        total_providers: providers.len(),
        total_games: providers.iter().map(|p| p.total_games).sum(),
        duplicates_removed: providers.iter().map(|p| p.duplicates_removed).sum(),
        blocked_games: providers.iter().map(|p| p.blocked_games).sum(),
        widget_enabled_games: providers.iter().map(|p| p.widget_enabled_games).sum(),
        top_providers: providers
            .iter()
            .take(TOP_PROVIDERS)
            .map(|p| (p.provider_name.clone(), p.total_games))
            .collect(),
        providers,
    }
}

/// Reads `<output_dir>/<slug>/games.json` for every provider directory.
/// Directories without a games file are skipped.
pub async fn load_games_files(output_dir: &Path) -> Result<Vec<GamesFile>, CheckpointError> {
    let mut entries = tokio::fs::read_dir(output_dir)
        .await
        .map_err(|e| CheckpointError::io(output_dir, e))?;
    let mut paths: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CheckpointError::io(output_dir, e))?
    {
        let path = entry.path().join("games.json");
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        if let Some(file) = read_json::<GamesFile>(&path).await? {
            files.push(file);
        }
    }
    tracing::info!(
        "Loaded {} games files from {}",
        files.len(),
        output_dir.display()
    );
    Ok(files)
}

pub async fn write_summary(path: &Path, summary: &CatalogSummary) -> Result<(), CheckpointError> {
    let bytes = serde_json::to_vec_pretty(summary)?;
    write_atomic(path.to_path_buf(), bytes).await
}

#[cfg(test)]
mod tests {
    use types::{thumbnail_file_name, GameRecord};

    use super::*;
    use crate::models::StoredGame;

    fn stored(id: &str, title: &str, provider: &str, blocked: bool) -> StoredGame {
        let mut record = GameRecord::new(id, title, id, "https://img/t.png");
        record.is_blocked = blocked;
        StoredGame {
            expected_filename: thumbnail_file_name(provider, title),
            record,
            source_offset: 0,
        }
    }

    fn file(slug: &str, name: &str, games: Vec<StoredGame>) -> GamesFile {
        GamesFile {
            timestamp: Utc::now(),
            provider_slug: slug.to_string(),
            provider_name: name.to_string(),
            total_games: Some(games.len() as u64),
            games_fetched: games.len() as u64,
            games,
        }
    }

    #[test]
    fn test_summarize_dedupes_and_ranks() {
        let files = vec![
            file("spribe", "Spribe", vec![stored("a", "Aviator", "Spribe", false)]),
            file(
                "bgaming",
                "BGaming",
                vec![
                    stored("b", "Elvis Frog", "BGaming", false),
                    stored("c", "Aztec Magic", "BGaming", true),
                    stored("b", "Elvis Frog", "BGaming", false),
                ],
            ),
        ];
        let summary = summarize(&files, Utc::now());
        assert_eq!(summary.total_providers, 2);
        assert_eq!(summary.total_games, 3);
        assert_eq!(summary.duplicates_removed, 1);
        assert_eq!(summary.blocked_games, 1);
        assert_eq!(summary.widget_enabled_games, 3);
        assert_eq!(summary.top_providers[0], ("BGaming".to_string(), 2));
        assert_eq!(
            summary.providers[0].expected_thumbnails,
            vec!["BGaming - Elvis Frog.webp", "BGaming - Aztec Magic.webp"]
        );
    }

    #[tokio::test]
    async fn test_load_games_files_skips_empty_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let games = file("spribe", "Spribe", vec![stored("a", "Aviator", "Spribe", false)]);
        write_atomic(
            dir.path().join("spribe").join("games.json"),
            serde_json::to_vec(&games).unwrap(),
        )
        .await
        .unwrap();
        std::fs::create_dir_all(dir.path().join("empty-provider")).unwrap();

        let loaded = load_games_files(dir.path()).await.unwrap();
        assert_eq!(loaded, vec![games]);
    }
}

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use types::GroupAssociation;

use crate::models::{GamesFile, StoredGame};
use crate::stores::json_file::write_atomic;
use crate::CheckpointError;

const LIST_SEPARATOR: &str = "; ";

/// One line of the per-game metadata export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameMetadataRow {
    pub game_id: String,
    pub title: String,
    pub slug: String,
    pub provider: String,
    pub provider_slug: String,
    pub webp_filename: String,
    pub webp_path: String,
    pub webp_exists: bool,
    pub thumbnail_url: String,
    pub player_count: u64,
    pub is_blocked: bool,
    pub is_widget_enabled: bool,
    pub categories: String,
    pub themes: String,
}

fn joined_groups(groups: &[GroupAssociation], kind: &str) -> String {
    groups
        .iter()
        .filter(|group| group.kind.as_deref() == Some(kind))
        .map(|group| group.name.as_deref().unwrap_or(&group.slug))
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

fn row(output_dir: &Path, file: &GamesFile, game: &StoredGame) -> GameMetadataRow {
    let webp_path = output_dir
        .join(&file.provider_slug)
        .join(&game.expected_filename);
    let record = &game.record;
    GameMetadataRow {
        game_id: record.id.clone(),
        title: record.name.clone(),
        slug: record.slug.clone(),
        provider: file.provider_name.clone(),
        provider_slug: file.provider_slug.clone(),
        webp_filename: game.expected_filename.clone(),
        webp_exists: webp_path.is_file(),
        webp_path: webp_path.display().to_string(),
        thumbnail_url: record.thumbnail_url.clone(),
        player_count: record.player_count,
        is_blocked: record.is_blocked,
        is_widget_enabled: record.is_widget_enabled,
        categories: joined_groups(&record.group_associations, "category"),
        themes: joined_groups(&record.group_associations, "theme"),
    }
}

/// One row per unique game of every provider, in games-file order.
/// Thumbnails are looked up under `<output_dir>/<provider_slug>/`.
pub fn metadata_rows(output_dir: &Path, files: &[GamesFile]) -> Vec<GameMetadataRow> {
    files
        .iter()
        .flat_map(|file| {
            let mut seen = HashSet::new();
            file.games
                .iter()
                .filter(move |game| seen.insert(game.record.id.as_str()))
                .map(move |game| row(output_dir, file, game))
        })
        .collect()
}

pub fn metadata_csv(rows: &[GameMetadataRow]) -> Result<Vec<u8>, CheckpointError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.into_inner()
        .map_err(|e| csv::Error::from(e.into_error()).into())
}

/// Writes the metadata export for `files` to `path` and returns the number
/// of rows.
pub async fn write_metadata_csv(
    path: &Path,
    output_dir: &Path,
    files: &[GamesFile],
) -> Result<usize, CheckpointError> {
    let rows = metadata_rows(output_dir, files);
    let bytes = metadata_csv(&rows)?;
    write_atomic(path.to_path_buf(), bytes).await?;
    tracing::info!("Wrote {} metadata rows to {}", rows.len(), path.display());
    Ok(rows.len())
}

use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupAssociation {
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// One game as listed by a provider page. Identity is `id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_blur_hash: Option<String>,
    #[serde(default)]
    pub is_blocked: bool,
    #[serde(default = "widget_enabled_default")]
    pub is_widget_enabled: bool,
    #[serde(default)]
    pub player_count: u64,
    #[serde(default)]
    pub group_associations: Vec<GroupAssociation>,
}

fn widget_enabled_default() -> bool {
    true
}

impl GameRecord {
    pub fn new(id: &str, name: &str, slug: &str, thumbnail_url: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            slug: slug.to_string(),
            thumbnail_url: thumbnail_url.to_string(),
            thumbnail_blur_hash: None,
            is_blocked: false,
            is_widget_enabled: true,
            player_count: 0,
            group_associations: Vec::new(),
        }
    }
}

impl Display for GameRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

const MAX_FILE_STEM_LEN: usize = 200;

/// Expected thumbnail file name: `"<Provider> - <Title>.webp"`.
pub fn thumbnail_file_name(provider_name: &str, title: &str) -> String {
    format!(
        "{} - {}.webp",
        sanitize_file_component(provider_name),
        sanitize_file_component(title)
    )
}

pub fn sanitize_file_component(raw: &str) -> String {
    let decoded = raw.replace("&amp;", "&");
    let stripped: String = decoded
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_FILE_STEM_LEN {
        collapsed
            .chars()
            .take(MAX_FILE_STEM_LEN)
            .collect::<String>()
            .trim_end()
            .to_string()
    } else {
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_file_name_strips_invalid_characters() {
        let name = thumbnail_file_name("Peter &amp; Sons", "Big  Bass: Splash?");
        assert_eq!(name, "Peter & Sons - Big Bass Splash.webp");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_file_component(&long).len(), MAX_FILE_STEM_LEN);
    }

    #[test]
    fn test_game_record_defaults_on_deserialize() {
        let record: GameRecord =
            serde_json::from_str(r#"{"id":"g1","name":"Gates of Olympus"}"#).unwrap();
        assert!(record.is_widget_enabled);
        assert!(!record.is_blocked);
        assert_eq!(record.player_count, 0);
        assert!(record.group_associations.is_empty());
        assert_eq!(record.slug, "");
    }

    #[test]
    fn test_game_record_serializes_camel_case() {
        let mut record = GameRecord::new("g1", "Sugar Rush", "sugar-rush", "https://img/1.png");
        record.thumbnail_blur_hash = Some("LKO2?U%2Tw=w".to_string());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["thumbnailUrl"], "https://img/1.png");
        assert_eq!(value["thumbnailBlurHash"], "LKO2?U%2Tw=w");
        assert_eq!(value["isWidgetEnabled"], true);
        assert_eq!(value["playerCount"], 0);
    }
}

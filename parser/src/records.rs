use std::collections::HashSet;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use types::{GameRecord, GroupAssociation, ProviderMeta};

use crate::ParseError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGame {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    name: String,
    slug: Option<String>,
    thumbnail_url: Option<String>,
    thumbnail_blur_hash: Option<String>,
    is_blocked: Option<bool>,
    is_widget_enabled: Option<bool>,
    player_count: Option<u64>,
    #[serde(default)]
    group_games: Vec<RawGroupGame>,
}

#[derive(Deserialize)]
struct RawGroupGame {
    group: Option<RawGroup>,
}

#[derive(Deserialize)]
struct RawGroup {
    slug: String,
    translation: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

impl From<RawGame> for GameRecord {
    fn from(raw: RawGame) -> Self {
        GameRecord {
            id: raw.id,
            name: clean_text(&raw.name),
            slug: raw.slug.unwrap_or_default(),
            thumbnail_url: raw.thumbnail_url.unwrap_or_default(),
            thumbnail_blur_hash: raw.thumbnail_blur_hash,
            is_blocked: raw.is_blocked.unwrap_or(false),
            is_widget_enabled: raw.is_widget_enabled.unwrap_or(true),
            player_count: raw.player_count.unwrap_or(0),
            group_associations: raw
                .group_games
                .into_iter()
                .filter_map(|gg| gg.group)
                .map(|group| GroupAssociation {
                    slug: group.slug,
                    name: group.translation.or(group.name).map(|n| clean_text(&n)),
                    kind: group.kind,
                })
                .collect(),
        }
    }
}

/// Decodes the escapes upstream leaves in free text.
pub fn clean_text(text: &str) -> String {
    text.replace("\\\"", "\"").replace("&amp;", "&")
}

/// Decodes a JSON string body taken straight from raw text.
pub fn unescape_json_fragment(fragment: &str) -> String {
    let decoded = serde_json::from_str::<String>(&format!("\"{fragment}\""))
        .unwrap_or_else(|_| fragment.to_string());
    clean_text(&decoded)
}

pub(crate) struct StructuredPage {
    pub meta: ProviderMeta,
    pub records: Vec<GameRecord>,
    pub skipped: usize,
}

fn catalog_group(value: &Value) -> Option<&Value> {
    value
        .pointer("/data/slugKuratorGroup")
        .or_else(|| value.get("slugKuratorGroup"))
}

fn upstream_message(value: &Value) -> Option<String> {
    let errors = value.get("errors")?.as_array()?;
    let first = errors.first()?;
    Some(
        first
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| first.to_string()),
    )
}

/// Reads provider meta and game records out of a fully parsed response.
pub(crate) fn page_from_value(value: &Value) -> Result<StructuredPage, ParseError> {
    let group = match catalog_group(value) {
        Some(Value::Null) | None => {
            if let Some(message) = upstream_message(value) {
                return Err(ParseError::Upstream(message));
            }
            return match catalog_group(value) {
                Some(_) => Err(ParseError::MissingGroup),
                None => Err(ParseError::UnexpectedPayload(
                    "json without a catalog group".to_string(),
                )),
            };
        }
        Some(group) => group,
    };

    let list = group
        .get("groupGamesList")
        .and_then(Value::as_array)
        .ok_or_else(|| ParseError::UnexpectedPayload("catalog group has no game list".to_string()))?;

    let meta = ProviderMeta {
        slug: group.get("slug").and_then(Value::as_str).map(str::to_string),
        name: group.get("name").and_then(Value::as_str).map(clean_text),
        game_count: group.get("gameCount").and_then(Value::as_u64),
    };

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(list.len());
    let mut skipped = 0;
    for item in list {
        let game = item.get("game").unwrap_or(item);
        match RawGame::deserialize(game) {
            Ok(raw) => {
                let record = GameRecord::from(raw);
                if seen.insert(record.id.clone()) {
                    records.push(record);
                } else {
                    log::debug!("Dropping repeated game id {} within one page", record.id);
                }
            }
            Err(err) => {
                skipped += 1;
                log::debug!("Skipping malformed game entry: {err}");
            }
        }
    }

    Ok(StructuredPage {
        meta,
        records,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_page_from_value_reads_nested_games() {
        let value = json!({
            "data": {"slugKuratorGroup": {
                "name": "Peter &amp; Sons",
                "slug": "peter-sons",
                "gameCount": 2,
                "groupGamesList": [
                    {"game": {
                        "id": "a1", "name": "Rotten", "slug": "rotten",
                        "thumbnailUrl": "https://img/rotten.png",
                        "isBlocked": false, "isWidgetEnabled": true, "playerCount": 7,
                        "groupGames": [{"group": {"slug": "slots", "translation": "Slots", "type": "category"}}]
                    }},
                    {"game": {"id": 42, "name": "Numbers \\\"Game\\\""}}
                ]
            }}
        });
        let page = page_from_value(&value).unwrap();
        assert_eq!(page.meta.name.as_deref(), Some("Peter & Sons"));
        assert_eq!(page.meta.game_count, Some(2));
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].player_count, 7);
        assert_eq!(page.records[0].group_associations[0].slug, "slots");
        assert_eq!(page.records[0].group_associations[0].name.as_deref(), Some("Slots"));
        assert_eq!(page.records[1].id, "42");
        assert_eq!(page.records[1].name, "Numbers \"Game\"");
    }

    #[test]
    fn test_page_from_value_skips_malformed_and_repeated() {
        let value = json!({"slugKuratorGroup": {"groupGamesList": [
            {"game": {"id": "a", "name": "A"}},
            {"game": {"name": "no id"}},
            {"game": {"id": "a", "name": "A again"}}
        ]}});
        let page = page_from_value(&value).unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.skipped, 1);
    }

    #[test]
    fn test_null_group_and_errors() {
        let missing = json!({"data": {"slugKuratorGroup": null}});
        assert!(matches!(page_from_value(&missing), Err(ParseError::MissingGroup)));

        let upstream = json!({"errors": [{"message": "rate limited"}], "data": null});
        assert_eq!(
            page_from_value(&upstream).err(),
            Some(ParseError::Upstream("rate limited".to_string()))
        );

        let foreign = json!({"hello": "world"});
        assert!(matches!(
            page_from_value(&foreign),
            Err(ParseError::UnexpectedPayload(_))
        ));
    }

    #[test]
    fn test_unescape_json_fragment() {
        assert_eq!(unescape_json_fragment(r#"Fish \"n\" Chips"#), "Fish \"n\" Chips");
        assert_eq!(unescape_json_fragment("Rock &amp; Roll"), "Rock & Roll");
        assert_eq!(unescape_json_fragment(r"bad \q escape"), r"bad \q escape");
    }
}

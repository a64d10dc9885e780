use std::collections::HashMap;
use std::ops::Range;

use regex::Regex;
use types::{GameRecord, GroupAssociation, ProviderMeta};

use crate::records::unescape_json_fragment;

/// Last-resort recovery of game records straight from raw text, for
/// payloads whose JSON structure could not be parsed at all.
///
/// Every `"id"` key marks a candidate; the object that directly holds it is
/// searched for the other fields, in whatever order they were written.
pub(crate) struct Salvager {
    anchor: Regex,
    name: Regex,
    slug: Regex,
    thumbnail_url: Regex,
    blur_hash: Regex,
    is_blocked: Regex,
    is_widget_enabled: Regex,
    player_count: Regex,
    group: Regex,
    group_name: Regex,
    group_kind: Regex,
    game_count: Regex,
    provider_name: Regex,
    empty_list: Regex,
}

pub(crate) struct Salvaged {
    pub meta: ProviderMeta,
    pub records: Vec<GameRecord>,
    pub capped: bool,
    pub empty_list: bool,
}

fn string_field(key: &str) -> Regex {
    Regex::new(&format!(r#""{key}"\s*:\s*"(?P<v>(?:[^"\\]|\\.)*)""#))
        .expect("Valid string field regex")
}

fn first_value(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .and_then(|caps| caps.name("v"))
        .map(|m| m.as_str().to_string())
}

/// For each byte position, the span of the innermost object that encloses
/// it. Objects left open at the end of the text run to the end.
fn enclosing_objects(text: &str, positions: &[usize]) -> Vec<Option<Range<usize>>> {
    let mut owners = vec![None; positions.len()];
    let mut closed: HashMap<usize, usize> = HashMap::new();
    let mut open: Vec<usize> = Vec::new();
    let mut next = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, byte) in text.bytes().enumerate() {
        while next < positions.len() && positions[next] <= idx {
            if positions[next] == idx && !in_string {
                owners[next] = open.last().copied();
            }
            next += 1;
        }
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => open.push(idx),
            b'}' => {
                if let Some(start) = open.pop() {
                    closed.insert(start, idx + 1);
                }
            }
            _ => {}
        }
    }

    owners
        .into_iter()
        .map(|owner| owner.map(|start| start..closed.get(&start).copied().unwrap_or(text.len())))
        .collect()
}

/// The text of `object` with every nested object and array removed, so only
/// its own keys remain.
fn own_fields(object: &str) -> String {
    let mut fields = String::with_capacity(object.len());
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for ch in object.chars() {
        if in_string {
            if depth == 1 {
                fields.push(ch);
            }
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '{' | '[' => depth += 1,
            '}' | ']' => depth = depth.saturating_sub(1),
            _ => {
                if ch == '"' {
                    in_string = true;
                }
                if depth == 1 {
                    fields.push(ch);
                }
            }
        }
    }
    fields
}

impl Salvager {
    pub fn new() -> Self {
        Self {
            anchor: Regex::new(r#""id"\s*:\s*"(?P<id>[^"\\]+)""#).expect("Valid anchor regex"),
            name: string_field("name"),
            slug: string_field("slug"),
            thumbnail_url: string_field("thumbnailUrl"),
            blur_hash: string_field("thumbnailBlurHash"),
            is_blocked: Regex::new(r#""isBlocked"\s*:\s*(?P<v>true|false)"#)
                .expect("Valid isBlocked regex"),
            is_widget_enabled: Regex::new(r#""isWidgetEnabled"\s*:\s*(?P<v>true|false)"#)
                .expect("Valid isWidgetEnabled regex"),
            player_count: Regex::new(r#""playerCount"\s*:\s*(?P<v>\d+)"#)
                .expect("Valid playerCount regex"),
            group: Regex::new(r#""group"\s*:\s*\{(?P<body>[^{}]*)\}"#).expect("Valid group regex"),
            group_name: string_field("translation"),
            group_kind: string_field("type"),
            game_count: Regex::new(r#""gameCount"\s*:\s*(?P<v>\d+)"#)
                .expect("Valid gameCount regex"),
            provider_name: Regex::new(
                r#""slugKuratorGroup"\s*:\s*\{[^{}\[]*?"name"\s*:\s*"(?P<v>(?:[^"\\]|\\.)*)""#,
            )
            .expect("Valid provider name regex"),
            empty_list: Regex::new(r#""groupGamesList"\s*:\s*\[\s*\]"#)
                .expect("Valid empty list regex"),
        }
    }

    /// Extracts at most `cap` records. A record needs an id, a name and a
    /// thumbnail url as keys of one object; every other field falls back to
    /// its default.
    pub fn salvage(&self, raw: &str, cap: usize) -> Salvaged {
        let meta = ProviderMeta {
            slug: None,
            name: first_value(&self.provider_name, raw).map(|n| unescape_json_fragment(&n)),
            game_count: first_value(&self.game_count, raw).and_then(|n| n.parse().ok()),
        };
        let empty_list = self.empty_list.is_match(raw);

        // the group object carries its own id and name, so only scan the list
        let games_text = raw
            .find("\"groupGamesList\"")
            .map_or(raw, |idx| &raw[idx..]);

        let anchors: Vec<_> = self
            .anchor
            .captures_iter(games_text)
            .filter_map(|caps| Some((caps.get(0)?.start(), caps.name("id")?.as_str())))
            .collect();
        let positions: Vec<usize> = anchors.iter().map(|(start, _)| *start).collect();
        let owners = enclosing_objects(games_text, &positions);

        let mut records: Vec<GameRecord> = Vec::new();
        let mut capped = false;
        for ((_, id), owner) in anchors.iter().zip(owners) {
            let Some(span) = owner else {
                continue;
            };
            let Some(record) = self.record_from_object(id, &games_text[span]) else {
                continue;
            };
            if records.iter().any(|r| r.id == record.id) {
                continue;
            }
            if records.len() >= cap {
                capped = true;
                break;
            }
            records.push(record);
        }

        Salvaged {
            meta,
            records,
            capped,
            empty_list,
        }
    }

    fn record_from_object(&self, id: &str, object: &str) -> Option<GameRecord> {
        let fields = own_fields(object);
        let name = first_value(&self.name, &fields)?;
        let thumbnail_url = first_value(&self.thumbnail_url, &fields)?;

        let mut record = GameRecord::new(
            id,
            &unescape_json_fragment(&name),
            &first_value(&self.slug, &fields).unwrap_or_default(),
            &unescape_json_fragment(&thumbnail_url),
        );
        record.thumbnail_blur_hash =
            first_value(&self.blur_hash, &fields).map(|h| unescape_json_fragment(&h));
        record.is_blocked = first_value(&self.is_blocked, &fields).as_deref() == Some("true");
        record.is_widget_enabled =
            first_value(&self.is_widget_enabled, &fields).as_deref() != Some("false");
        record.player_count = first_value(&self.player_count, &fields)
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        record.group_associations = self
            .group
            .captures_iter(object)
            .filter_map(|caps| caps.name("body").map(|m| m.as_str()))
            .filter_map(|body| {
                Some(GroupAssociation {
                    slug: first_value(&self.slug, body)?,
                    name: first_value(&self.group_name, body).map(|n| unescape_json_fragment(&n)),
                    kind: first_value(&self.group_kind, body),
                })
            })
            .collect();
        Some(record)
    }
}

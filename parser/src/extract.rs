use std::ops::Range;

use serde_json::Value;

use crate::classify::has_catalog_marker;

/// Parses `text` as a JSON object, rejecting every other JSON value.
pub fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

/// Content of the `<pre>` element a browser-backed proxy wraps JSON in.
/// A wrapper cut off before its closing tag yields everything after the
/// opening tag.
pub fn unwrap_pre(raw: &str) -> Option<String> {
    let open = raw.find("<pre")?;
    let content_start = open + raw[open..].find('>')? + 1;
    let rest = &raw[content_start..];
    let inner = match rest.find("</pre>") {
        Some(end) => &rest[..end],
        None => rest,
    };
    Some(decode_text_entities(inner.trim()))
}

fn decode_text_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Byte ranges of every top-level brace-delimited object in `text`, in order.
///
/// Braces inside JSON strings are ignored. An object still open when the
/// text ends is dropped, so a stream truncated mid-object is trimmed back to
/// the last point where the depth returned to zero.
pub fn balanced_objects(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, byte) in text.bytes().enumerate() {
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
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = idx;
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(start..idx + 1);
                }
            }
            _ => {}
        }
    }
    spans
}

/// Candidate object slices, catalog-looking ones first, larger before smaller.
pub fn ranked_objects(text: &str) -> Vec<&str> {
    let mut candidates: Vec<&str> = balanced_objects(text)
        .into_iter()
        .map(|span| &text[span])
        .collect();
    candidates.sort_by_key(|candidate| {
        (
            !has_catalog_marker(candidate),
            std::cmp::Reverse(candidate.len()),
        )
    });
    candidates
}

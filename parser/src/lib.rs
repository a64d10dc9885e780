//! Turns raw catalog responses into game records.
//!
//! Responses arrive as plain JSON, as JSON wrapped in a browser `<pre>`
//! element, truncated mid-stream, or as something else entirely (error
//! strings, challenge pages, analytics beacons). [`ResponseParser::parse`]
//! sniffs the payload first and then walks a fallback chain of extraction
//! strategies, returning a typed result on every branch.

mod classify;
mod error;
mod extract;
mod records;
mod salvage;

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use types::{GameRecord, ProviderMeta};

pub use classify::{classify, PayloadKind};
pub use error::ParseError;
pub use records::{clean_text, unescape_json_fragment};

use crate::records::page_from_value;
use crate::salvage::Salvager;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Trimmed payloads shorter than this are treated as error text.
    pub min_payload_len: usize,
    /// Upper bound on records pulled out by the regex salvage pass.
    pub max_salvaged_records: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            min_payload_len: 20,
            max_salvaged_records: 500,
        }
    }
}

/// Which strategy produced a [`ParsedPage`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExtractionPath {
    Direct,
    Wrapped,
    Balanced,
    Salvaged,
}

impl Display for ExtractionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExtractionPath::Direct => "direct",
            ExtractionPath::Wrapped => "wrapped",
            ExtractionPath::Balanced => "balanced",
            ExtractionPath::Salvaged => "salvaged",
        };
        write!(f, "{name}")
    }
}

/// A valid catalog page. An empty `records` list is a legitimate end of
/// data, never a parse failure.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedPage {
    pub meta: ProviderMeta,
    pub records: Vec<GameRecord>,
    pub path: ExtractionPath,
    pub skipped: usize,
}

pub struct ResponseParser {
    config: ParserConfig,
    salvager: Salvager,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser {
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            salvager: Salvager::new(),
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn parse(&self, raw: &str) -> Result<ParsedPage, ParseError> {
        let kind = classify(raw, self.config.min_payload_len);
        log::trace!("Classified {} byte payload as {kind}", raw.len());

        match kind {
            PayloadKind::ErrorText => {
                let trimmed = raw.trim();
                return Err(ParseError::TooShort {
                    len: trimmed.len(),
                    snippet: trimmed.to_string(),
                });
            }
            PayloadKind::Challenge | PayloadKind::Tracking | PayloadKind::Unknown => {
                return Err(ParseError::UnexpectedPayload(kind.to_string()));
            }
            PayloadKind::CatalogJson | PayloadKind::HtmlWrapped | PayloadKind::UpstreamError => {}
        }

        // A definite answer from a structured path (an upstream error or a
        // null group) is returned as is; only "could not parse" falls through.
        let mut structured_error = None;

        if let Some(value) = extract::parse_object(raw) {
            match page_from_value(&value) {
                Ok(page) => return Ok(self.finish(page, ExtractionPath::Direct)),
                Err(err) => structured_error = Some(err),
            }
        }

        if let Some(inner) = extract::unwrap_pre(raw) {
            if let Some(value) = extract::parse_object(&inner) {
                match page_from_value(&value) {
                    Ok(page) => return Ok(self.finish(page, ExtractionPath::Wrapped)),
                    Err(err) => structured_error = structured_error.or(Some(err)),
                }
            }
        }

        for candidate in extract::ranked_objects(raw) {
            let Some(value) = extract::parse_object(candidate) else {
                continue;
            };
            match page_from_value(&value) {
                Ok(page) => return Ok(self.finish(page, ExtractionPath::Balanced)),
                Err(err @ (ParseError::Upstream(_) | ParseError::MissingGroup)) => {
                    structured_error = structured_error.or(Some(err));
                }
                Err(_) => {}
            }
        }

        match structured_error {
            Some(err @ (ParseError::Upstream(_) | ParseError::MissingGroup)) => return Err(err),
            _ if kind == PayloadKind::UpstreamError => {
                return Err(ParseError::Upstream(
                    "error payload without a readable message".to_string(),
                ))
            }
            _ => {}
        }

        self.salvage(raw)
    }

    fn salvage(&self, raw: &str) -> Result<ParsedPage, ParseError> {
        let salvaged = self
            .salvager
            .salvage(raw, self.config.max_salvaged_records);
        if salvaged.records.is_empty() && !salvaged.empty_list {
            return Err(ParseError::Unrecoverable { len: raw.len() });
        }
        if salvaged.capped {
            log::warn!(
                "Salvage stopped at {} records, payload may hold more",
                self.config.max_salvaged_records
            );
        }
        log::debug!(
            "Salvaged {} records from {} byte payload",
            salvaged.records.len(),
            raw.len()
        );
        Ok(ParsedPage {
            meta: salvaged.meta,
            records: salvaged.records,
            path: ExtractionPath::Salvaged,
            skipped: 0,
        })
    }

    fn finish(&self, page: records::StructuredPage, path: ExtractionPath) -> ParsedPage {
        if page.skipped > 0 {
            log::debug!("Skipped {} malformed entries on {path} path", page.skipped);
        }
        ParsedPage {
            meta: page.meta,
            records: page.records,
            path,
            skipped: page.skipped,
        }
    }
}

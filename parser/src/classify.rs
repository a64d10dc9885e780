use std::fmt::Display;

/// What a raw response looks like before any extraction is attempted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PayloadKind {
    CatalogJson,
    HtmlWrapped,
    UpstreamError,
    Challenge,
    Tracking,
    ErrorText,
    Unknown,
}

impl Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PayloadKind::CatalogJson => "catalog json",
            PayloadKind::HtmlWrapped => "html-wrapped catalog json",
            PayloadKind::UpstreamError => "upstream error",
            PayloadKind::Challenge => "anti-bot challenge page",
            PayloadKind::Tracking => "tracking payload",
            PayloadKind::ErrorText => "error text",
            PayloadKind::Unknown => "unrecognised payload",
        };
        write!(f, "{name}")
    }
}

pub(crate) const CATALOG_MARKERS: &[&str] = &["\"slugKuratorGroup\"", "\"groupGamesList\""];

const WRAPPER_MARKERS: &[&str] = &["<pre", "<html", "<body"];

const CHALLENGE_MARKERS: &[&str] = &["cf-chl", "Just a moment...", "challenge-platform"];

const TRACKING_MARKERS: &[&str] = &[
    "google-analytics",
    "googletagmanager",
    "\"gtm.",
    "\"_ga\"",
    "\"event\"",
    "\"events\"",
    "\"sentry",
    "\"analytics\"",
];

pub fn has_catalog_marker(raw: &str) -> bool {
    CATALOG_MARKERS.iter().any(|marker| raw.contains(marker))
}

/// Sniffs the shape of `raw` without parsing it.
pub fn classify(raw: &str, min_len: usize) -> PayloadKind {
    let trimmed = raw.trim();
    if trimmed.len() < min_len {
        return PayloadKind::ErrorText;
    }
    let wrapped = WRAPPER_MARKERS
        .iter()
        .any(|marker| trimmed.contains(marker));
    if has_catalog_marker(trimmed) {
        return if wrapped {
            PayloadKind::HtmlWrapped
        } else {
            PayloadKind::CatalogJson
        };
    }
    if CHALLENGE_MARKERS
        .iter()
        .any(|marker| trimmed.contains(marker))
    {
        return PayloadKind::Challenge;
    }
    if trimmed.contains("\"errors\"") {
        return PayloadKind::UpstreamError;
    }
    if TRACKING_MARKERS
        .iter()
        .any(|marker| trimmed.contains(marker))
    {
        return PayloadKind::Tracking;
    }
    PayloadKind::Unknown
}

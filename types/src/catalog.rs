use thiserror::Error;

use crate::Provider;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub slug: &'static str,
    pub name: &'static str,
}

impl From<&CatalogEntry> for Provider {
    fn from(entry: &CatalogEntry) -> Self {
        Provider::new(entry.slug, entry.name)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    #[error("'{0}' is a game category, not a provider")]
    NotAProvider(String),

    #[error("Unknown provider: {0}")]
    Unknown(String),
}

const fn entry(slug: &'static str, name: &'static str) -> CatalogEntry {
    CatalogEntry { slug, name }
}

pub const PROVIDERS: &[CatalogEntry] = &[
    entry("pragmatic-play", "Pragmatic Play"),
    entry("stake-originals", "Stake Originals"),
    entry("hacksaw-gaming", "Hacksaw Gaming"),
    entry("evolution-gaming", "Evolution Gaming"),
    entry("no-limit-city", "No Limit City"),
    entry("massive-studios", "Massive Studios"),
    entry("twist-gaming", "Twist Gaming"),
    entry("titan-gaming", "Titan Gaming"),
    entry("backseat-gaming", "Backseat Gaming"),
    entry("b-gaming", "B Gaming"),
    entry("push-gaming", "Push Gaming"),
    entry("hacksaw-openrgs", "Hacksaw OpenRGS"),
    entry("stake-engine", "Stake Engine"),
    entry("shady-lady", "Shady Lady"),
    entry("relax-gaming", "Relax Gaming"),
    entry("avatarux", "Avatarux"),
    entry("thunderkick", "Thunderkick"),
    entry("penguin-king", "Penguin King"),
    entry("fat-panda", "Fat Panda"),
    entry("peter-sons", "Peter & Sons"),
    entry("playn-go", "Play'n GO"),
    entry("popiplay", "Popiplay"),
    entry("paperclip-gaming", "Paperclip Gaming"),
    entry("elk-studios", "Elk Studios"),
    entry("print-studios", "Print Studios"),
    entry("bullshark-games", "Bullshark Games"),
    entry("netent", "NetEnt"),
    entry("big-time-gaming", "Big Time Gaming"),
    entry("red-tiger", "Red Tiger"),
    entry("pg-soft", "PG Soft"),
    entry("onetouch", "OneTouch"),
    entry("slotmill", "Slotmill"),
    entry("live88", "Live88"),
    entry("gamomat", "Gamomat"),
    entry("3-oaks-gaming", "3 Oaks Gaming"),
    entry("games-global", "Games Global"),
    entry("endorphina", "Endorphina"),
    entry("voltent", "VoltEnt"),
    entry("just-slots", "Just Slots"),
    entry("fantasma-games", "Fantasma Games"),
    entry("blueprint", "Blueprint"),
    entry("belatra", "Belatra"),
    entry("playson", "Playson"),
    entry("novomatic", "Novomatic"),
    entry("skywind", "Skywind"),
    entry("quickspin", "Quickspin"),
    entry("red-rake-gaming", "Red Rake Gaming"),
    entry("game-art", "Game Art"),
    entry("spinomenal", "Spinomenal"),
];

/// Group slugs that look like providers in URLs but are editorial categories.
pub const NON_PROVIDER_SLUGS: &[&str] = &[
    "slots",
    "live-casino",
    "new-releases",
    "stake-exclusives",
    "table-games",
    "game-shows",
    "blackjack",
    "roulette",
    "baccarat",
    "burst-games",
    "enhanced-rtp",
    "featured-slots",
    "bonus-buy",
    "megaways",
    "popular",
    "publishers",
];

pub fn all_providers() -> Vec<Provider> {
    PROVIDERS.iter().map(Provider::from).collect()
}

pub fn is_category_slug(slug: &str) -> bool {
    NON_PROVIDER_SLUGS
        .iter()
        .any(|category| category.eq_ignore_ascii_case(slug.trim()))
}

/// Resolves a slug or display name (case-insensitive) to a catalog provider.
pub fn find_provider(query: &str) -> Result<Provider, CatalogError> {
    let query = query.trim();
    if is_category_slug(query) {
        return Err(CatalogError::NotAProvider(query.to_string()));
    }
    PROVIDERS
        .iter()
        .find(|entry| {
            entry.slug.eq_ignore_ascii_case(query) || entry.name.eq_ignore_ascii_case(query)
        })
        .map(Provider::from)
        .ok_or_else(|| CatalogError::Unknown(query.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_catalog_slugs_are_unique() {
        let slugs: HashSet<_> = PROVIDERS.iter().map(|e| e.slug).collect();
        assert_eq!(slugs.len(), PROVIDERS.len());
    }

    #[test]
    fn test_no_provider_is_also_a_category() {
        assert!(PROVIDERS.iter().all(|e| !is_category_slug(e.slug)));
    }

    #[test]
    fn test_find_by_slug_and_name() {
        let by_slug = find_provider("playn-go").unwrap();
        let by_name = find_provider("play'n go").unwrap();
        assert_eq!(by_slug, by_name);
        assert_eq!(by_slug.name, "Play'n GO");
    }

    #[test]
    fn test_category_is_rejected() {
        assert_eq!(
            find_provider("Live-Casino"),
            Err(CatalogError::NotAProvider("Live-Casino".to_string()))
        );
        assert_eq!(
            find_provider("nope"),
            Err(CatalogError::Unknown("nope".to_string()))
        );
    }
}

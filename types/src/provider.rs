use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provider {
    pub slug: String,
    pub name: String,
}

impl Provider {
    pub fn new(slug: &str, name: &str) -> Self {
        Self {
            slug: slug.to_string(),
            name: name.to_string(),
        }
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.slug)
    }
}

/// Provider-level facts carried alongside a page of games.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderMeta {
    pub slug: Option<String>,
    pub name: Option<String>,
    pub game_count: Option<u64>,
}

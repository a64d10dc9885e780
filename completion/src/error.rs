use checkpoint::CheckpointError;
use parser::ParseError;
use thiserror::Error;
use types::{CatalogError, FetchError, Offset};

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Persistence error: {0}")]
    Persistence(#[from] CheckpointError),

    #[error("Unknown provider: {0}")]
    UnknownProvider(#[from] CatalogError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetcher error: {0}")]
    Fetcher(String),
}

/// Why a single page attempt failed. Absorbed into tracker state, never
/// returned from a run.
#[derive(Error, Debug)]
pub enum PageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Why a provider run stopped before reaching its target.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    #[error("{} offsets failed permanently (budget {budget}): {offsets:?}", .offsets.len())]
    FailureBudget { offsets: Vec<Offset>, budget: usize },

    #[error("{streak} empty pages in a row with {fetched}/{} games", expected_str(.expected))]
    EmptyResponseBudget {
        streak: usize,
        fetched: u64,
        expected: Option<u64>,
    },

    #[error("No fetchable offsets left with {fetched}/{} games", expected_str(.expected))]
    Shortfall { fetched: u64, expected: Option<u64> },
}

fn expected_str(expected: &Option<u64>) -> String {
    expected.map_or_else(|| "?".to_string(), |e| e.to_string())
}

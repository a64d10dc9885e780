pub mod config;
pub mod driver;
pub mod error;
pub mod report;
pub mod tracker;

use types::{all_providers, find_provider, Provider};

pub use config::{CompletionConfig, PipelineConfig};
pub use driver::CompletionDriver;
pub use error::{AbortReason, CompletionError, PageError};
pub use report::{Phase, RunOutcome, RunReport};
pub use tracker::{OffsetState, OffsetTracker};

/// Resolves provider slugs or display names against the catalog. With
/// `all` set every catalog provider is returned and `queries` is ignored.
pub fn resolve_providers(queries: &[String], all: bool) -> Result<Vec<Provider>, CompletionError> {
    if all {
        return Ok(all_providers());
    }
    if queries.is_empty() {
        return Err(CompletionError::Config(
            "no providers given; pass --provider or --all".to_string(),
        ));
    }
    let mut providers: Vec<Provider> = Vec::with_capacity(queries.len());
    for query in queries {
        let provider = find_provider(query)?;
        if !providers.contains(&provider) {
            providers.push(provider);
        }
    }
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_providers() {
        let providers =
            resolve_providers(&["Pragmatic Play".to_string(), "pragmatic-play".to_string()], false)
                .unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(resolve_providers(&[], true).unwrap().len(), 49);
        assert!(matches!(
            resolve_providers(&["slots".to_string()], false),
            Err(CompletionError::UnknownProvider(_))
        ));
        assert!(matches!(
            resolve_providers(&[], false),
            Err(CompletionError::Config(_))
        ));
    }
}

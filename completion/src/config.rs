use std::path::Path;
use std::time::Duration;

use checkpoint::StoreSection;
use fetchers::CommandConfig;
use parser::ParserConfig;
use serde::{Deserialize, Serialize};
use types::PAGE_SIZE;

use crate::CompletionError;

/// Knobs for one provider completion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub page_size: u64,
    /// Failed attempts after which an offset is given up on.
    pub max_retries: u32,
    /// Permanently failed offsets that abort the run.
    pub failure_budget: usize,
    /// Consecutive empty pages that end the run.
    pub empty_response_budget: usize,
    pub concurrency: usize,
    pub fetch_timeout_ms: u64,
    pub batch_delay_ms: u64,
    pub reset_exhausted_on_resume: bool,
    pub parser: ParserConfig,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            max_retries: 20,
            failure_budget: 3,
            empty_response_budget: 10,
            concurrency: 3,
            fetch_timeout_ms: 60_000,
            batch_delay_ms: 1000,
            reset_exhausted_on_resume: true,
            parser: ParserConfig::default(),
        }
    }
}

impl CompletionConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn validate(&self) -> Result<(), CompletionError> {
        let invalid = |msg: &str| Err(CompletionError::Config(msg.to_string()));
        if self.page_size == 0 {
            return invalid("page_size must be positive");
        }
        if self.concurrency == 0 {
            return invalid("concurrency must be positive");
        }
        if self.max_retries == 0 {
            return invalid("max_retries must be positive");
        }
        if self.failure_budget == 0 || self.empty_response_budget == 0 {
            return invalid("budgets must be positive");
        }
        Ok(())
    }
}

/// The pipeline YAML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub completion: CompletionConfig,
    pub store: StoreSection,
    pub fetcher: CommandConfig,
}

impl PipelineConfig {
    pub fn from_yaml(text: &str) -> Result<Self, CompletionError> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|e| CompletionError::Config(e.to_string()))?;
        config.completion.validate()?;
        Ok(config)
    }

    /// Reads `path`, falling back to defaults when there is no file.
    pub fn load(path: Option<&Path>) -> Result<Self, CompletionError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_yaml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(CompletionError::Config(format!(
                "reading {}: {e}",
                path.display()
            ))),
        }
    }
}

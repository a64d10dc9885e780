use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const CHECKPOINT_DIR_ENV: &str = "CATALOG_CHECKPOINT_DIR";
pub const OUTPUT_DIR_ENV: &str = "CATALOG_OUTPUT_DIR";

/// The `store` section of a pipeline YAML file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub checkpoint_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub write_retries: Option<usize>,
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub checkpoint_dir: PathBuf,
    pub output_dir: PathBuf,
    pub write_retries: usize,
    pub retry_delay: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from_cli_or_env_or_yaml(None, None, None)
    }
}

fn resolve_dir(
    cli_arg: Option<PathBuf>,
    env_key: &str,
    yaml_value: Option<PathBuf>,
    default: &str,
) -> PathBuf {
    if let Some(arg) = cli_arg {
        arg
    } else if let Ok(env) = std::env::var(env_key) {
        PathBuf::from(env)
    } else if let Some(yaml) = yaml_value {
        yaml
    } else {
        PathBuf::from(default)
    }
}

impl StoreConfig {
    pub fn from_cli_or_env_or_yaml(
        cli_checkpoint_dir: Option<PathBuf>,
        cli_output_dir: Option<PathBuf>,
        yaml_config: Option<&StoreSection>,
    ) -> Self {
        let yaml = yaml_config.cloned().unwrap_or_default();
        Self {
            checkpoint_dir: resolve_dir(
                cli_checkpoint_dir,
                CHECKPOINT_DIR_ENV,
                yaml.checkpoint_dir,
                "checkpoints",
            ),
            output_dir: resolve_dir(cli_output_dir, OUTPUT_DIR_ENV, yaml.output_dir, "catalog_games"),
            write_retries: yaml.write_retries.unwrap_or(3),
            retry_delay: Duration::from_millis(yaml.retry_delay_ms.unwrap_or(100)),
        }
    }

    /// Both directories under one root, for tests and throwaway runs.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            checkpoint_dir: root.join("checkpoints"),
            output_dir: root.join("catalog_games"),
            write_retries: 3,
            retry_delay: Duration::from_millis(10),
        }
    }
}

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use types::{FetchError, PageFetcher, PageRequest};

use crate::graphql::games_query;

const STDERR_SNIPPET_LEN: usize = 500;

/// How to launch the proxy client that performs the actual request. This is
/// the `fetcher` section of a pipeline YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            program: "node".to_string(),
            args: vec!["robust_graphql_fetcher.js".to_string()],
            working_dir: None,
            env: BTreeMap::new(),
        }
    }
}

/// Runs the configured program once per page and returns its stdout.
///
/// The page is described to the child through `PROVIDER_SLUG`,
/// `PROVIDER_NAME`, `GAMES_OFFSET`, `GAMES_LIMIT` and `GAMES_QUERY` (the
/// GraphQL request body). The child is killed when the fetch future is
/// dropped, so a caller-side timeout terminates it.
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    config: CommandConfig,
}

impl CommandFetcher {
    pub fn new(config: CommandConfig) -> Self {
        Self { config }
    }

    fn command(&self, request: &PageRequest) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .envs(&self.config.env)
            .env("PROVIDER_SLUG", &request.provider_slug)
            .env("PROVIDER_NAME", &request.provider_name)
            .env("GAMES_OFFSET", request.offset.to_string())
            .env("GAMES_LIMIT", request.limit.to_string())
            .env(
                "GAMES_QUERY",
                games_query(&request.provider_slug, request.offset, request.limit).to_string(),
            )
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl PageFetcher for CommandFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<String, FetchError> {
        log::debug!("Running {} for {request}", self.config.program);
        let output = self.command(request).output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::NonZeroExit {
                code: output.status.code(),
                stderr: stderr.trim().chars().take(STDERR_SNIPPET_LEN).collect(),
            });
        }
        if !output.stderr.is_empty() {
            log::trace!(
                "{request} stderr: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn request(offset: u64) -> PageRequest {
        PageRequest {
            provider_slug: "evolution".to_string(),
            provider_name: "Evolution".to_string(),
            offset,
            limit: 39,
        }
    }

    fn shell(script: &str) -> CommandFetcher {
        CommandFetcher::new(CommandConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            working_dir: None,
            env: BTreeMap::new(),
        })
    }

    #[tokio::test]
    async fn test_passes_page_through_environment() {
        let fetcher = shell(r#"printf '%s|%s|%s|%s' "$PROVIDER_SLUG" "$PROVIDER_NAME" "$GAMES_OFFSET" "$GAMES_LIMIT""#);
        let raw = fetcher.fetch(&request(78)).await.unwrap();
        assert_eq!(raw, "evolution|Evolution|78|39");
    }

    #[tokio::test]
    async fn test_query_body_in_environment() {
        let fetcher = shell(r#"printf '%s' "$GAMES_QUERY""#);
        let raw = fetcher.fetch(&request(39)).await.unwrap();
        let body: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(body["variables"]["offset"], 39);
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let fetcher = shell("echo 'proxy quota exceeded' >&2; exit 3");
        match fetcher.fetch(&request(0)).await {
            Err(FetchError::NonZeroExit { code, stderr }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "proxy quota exceeded");
            }
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let fetcher = CommandFetcher::new(CommandConfig {
            program: "/nonexistent/fetcher-binary".to_string(),
            ..CommandConfig::default()
        });
        assert!(matches!(
            fetcher.fetch(&request(0)).await,
            Err(FetchError::Spawn(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout_drops_child() {
        let fetcher = shell("sleep 30");
        let started = Instant::now();
        let result =
            tokio::time::timeout(Duration::from_millis(200), fetcher.fetch(&request(0))).await;
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use types::{FetchError, GameRecord, Offset, PageFetcher, PageRequest};

/// One canned answer.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedResponse {
    Payload(String),
    Transport(String),
    Exit(i32),
    /// Never completes; only a caller-side timeout ends the call.
    Hang,
}

impl ScriptedResponse {
    pub fn payload(raw: impl Into<String>) -> Self {
        ScriptedResponse::Payload(raw.into())
    }
}

#[derive(Default)]
struct Script {
    queued: HashMap<Offset, VecDeque<ScriptedResponse>>,
    fallback: Option<ScriptedResponse>,
    calls: Vec<PageRequest>,
}

/// Answers fetches from per-offset queues of canned responses, for tests
/// and offline replays. Each offset's queue is consumed front to back; once
/// it is empty the fallback answers, or a transport error if there is none.
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    script: Arc<Mutex<Script>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    latency: Duration,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn respond(self, offset: Offset, response: ScriptedResponse) -> Self {
        self.push(offset, response);
        self
    }

    pub fn otherwise(self, response: ScriptedResponse) -> Self {
        self.lock().fallback = Some(response);
        self
    }

    pub fn push(&self, offset: Offset, response: ScriptedResponse) {
        self.lock()
            .queued
            .entry(offset)
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self) -> Vec<PageRequest> {
        self.lock().calls.clone()
    }

    pub fn calls_for(&self, offset: Offset) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|request| request.offset == offset)
            .count()
    }

    /// Highest number of fetches that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self, request: &PageRequest) -> Option<ScriptedResponse> {
        let mut script = self.lock();
        script.calls.push(request.clone());
        let queued = script
            .queued
            .get_mut(&request.offset)
            .and_then(VecDeque::pop_front);
        queued.or_else(|| script.fallback.clone())
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<String, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let response = self.next_response(request);
        if self.latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.latency).await;
        }

        match response {
            Some(ScriptedResponse::Payload(raw)) => Ok(raw),
            Some(ScriptedResponse::Transport(message)) => Err(FetchError::Transport(message)),
            Some(ScriptedResponse::Exit(code)) => Err(FetchError::NonZeroExit {
                code: Some(code),
                stderr: String::new(),
            }),
            Some(ScriptedResponse::Hang) => std::future::pending().await,
            None => Err(FetchError::Transport(format!(
                "no scripted response for {request}"
            ))),
        }
    }
}

/// A well-formed catalog response listing `games` for one provider.
pub fn catalog_payload(
    provider_slug: &str,
    provider_name: &str,
    game_count: u64,
    games: &[GameRecord],
) -> String {
    let list: Vec<_> = games
        .iter()
        .map(|game| json!({"id": format!("gg-{}", game.id), "game": game}))
        .collect();
    json!({
        "data": {
            "slugKuratorGroup": {
                "id": format!("group-{provider_slug}"),
                "slug": provider_slug,
                "name": provider_name,
                "gameCount": game_count,
                "groupGamesList": list,
            }
        }
    })
    .to_string()
}

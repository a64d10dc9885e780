use checkpoint::{CheckpointStore, ProviderProgress};
use chrono::Utc;
use futures::future::join_all;
use parser::{ExtractionPath, ParsedPage, ResponseParser};
use types::page::page_limit;
use types::{FetchError, Offset, PageFetcher, PageRequest, Provider};
use uuid::Uuid;

use crate::report::{Phase, RunOutcome, RunReport};
use crate::tracker::OffsetTracker;
use crate::{AbortReason, CompletionConfig, CompletionError, PageError};

/// Brings one provider's checkpoint up to its advertised game count.
///
/// Each loop fetches a batch of offsets concurrently, waits for every member
/// to settle, merges the successes, and flushes the checkpoint before the
/// next batch is planned. Offset-level failures become tracker state; only
/// persistence failures end a run with an error.
pub struct CompletionDriver<F, S> {
    config: CompletionConfig,
    fetcher: F,
    store: S,
    parser: ResponseParser,
}

/// State owned by a single `run` call.
struct Run {
    id: Uuid,
    progress: ProviderProgress,
    tracker: OffsetTracker,
    resumed: bool,
    page_size: u64,
    batches: usize,
    attempts: usize,
    failures: usize,
    empty_streak: usize,
}

/// A page that holds some records but fewer than its slot while more games
/// should follow it. A salvaged page is short even at the end of the catalog,
/// since its tail was cut off.
fn is_short_page(offset: Offset, count: usize, total: u64, page_size: u64, salvaged: bool) -> bool {
    let expected = page_limit(offset, Some(total), page_size);
    count > 0 && (count as u64) < expected && (salvaged || offset.saturating_add(expected) < total)
}

impl Run {
    fn merge(&mut self, request: PageRequest, result: Result<ParsedPage, PageError>) {
        let offset = request.offset;
        let page = match result {
            Ok(page) => page,
            Err(err) => {
                self.failures += 1;
                if self.tracker.mark_failed(offset) {
                    log::warn!("[{}] {request} failed: {err}", self.id);
                } else {
                    log::error!(
                        "[{}] Giving up on {request} after {} attempts: {err}",
                        self.id,
                        self.tracker.retry_counts().get(&offset).copied().unwrap_or(0)
                    );
                }
                return;
            }
        };

        if let Some(count) = page.meta.game_count {
            if self.progress.total_games() != Some(count) {
                log::info!(
                    "[{}] {} advertises {count} games (was {:?})",
                    self.id,
                    request.provider_slug,
                    self.progress.total_games()
                );
                self.progress.set_total_games(count);
            }
        }
        let salvaged = page.path == ExtractionPath::Salvaged;
        if salvaged {
            log::warn!(
                "[{}] {request} recovered {} records from a damaged payload",
                self.id,
                page.records.len()
            );
        }

        let count = page.records.len();
        let short = match self.progress.total_games() {
            Some(total) => is_short_page(offset, count, total, self.page_size, salvaged),
            // a cut-off page must not be mistaken for the end of the catalog
            None => salvaged && count > 0 && (count as u64) < request.limit,
        };
        if short {
            // keep what arrived, but the offset stays open until a full page lands
            self.failures += 1;
            self.empty_streak = 0;
            self.progress.merge_page(offset, page.records);
            if self.tracker.mark_failed(offset) {
                log::warn!("[{}] {request} returned only {count} records, will retry", self.id);
            } else {
                log::error!(
                    "[{}] Giving up on {request} after repeated short pages ({count} records)",
                    self.id
                );
            }
            return;
        }

        self.tracker.mark_completed(offset, count);
        if let Some(previous) = self.progress.merge_page(offset, page.records) {
            log::debug!(
                "[{}] Replaced {} records at offset {offset}",
                self.id,
                previous.len()
            );
        }
        if count == 0 {
            self.empty_streak += 1;
        } else {
            self.empty_streak = 0;
        }

        // a short page with no advertised total marks the end of the catalog
        if self.progress.total_games().is_none() && (count as u64) < request.limit {
            let fetched = self.progress.games_fetched();
            log::info!(
                "[{}] Short page at offset {offset}, taking {fetched} as the total",
                self.id
            );
            self.progress.set_total_games(fetched);
        }
    }

    fn report(self, outcome: RunOutcome) -> RunReport {
        RunReport {
            run_id: self.id,
            provider: self.progress.provider().clone(),
            outcome,
            resumed: self.resumed,
            total_games: self.progress.total_games(),
            games_fetched: self.progress.games_fetched(),
            batches: self.batches,
            fetch_attempts: self.attempts,
            failed_attempts: self.failures,
            completed_offsets: self
                .tracker
                .completed()
                .into_iter()
                .map(|(offset, _)| offset)
                .collect(),
            exhausted_offsets: self.tracker.permanently_failed(),
        }
    }
}

impl<F: PageFetcher, S: CheckpointStore> CompletionDriver<F, S> {
    pub fn new(config: CompletionConfig, fetcher: F, store: S) -> Result<Self, CompletionError> {
        config.validate()?;
        let parser = ResponseParser::with_config(config.parser.clone());
        Ok(Self {
            config,
            fetcher,
            store,
            parser,
        })
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    fn enter(&self, run: &Run, phase: Phase) {
        log::debug!(
            "[{}] {} -> {phase}",
            run.id,
            run.progress.provider().slug
        );
    }

    async fn start(&mut self, provider: &Provider) -> Result<Run, CompletionError> {
        let id = Uuid::new_v4();
        let saved = self.store.load(&provider.slug).await?;
        let resumed = !saved.is_empty();
        let progress = ProviderProgress::restore(provider.clone(), saved, self.config.page_size)?;

        let page_size = self.config.page_size;
        let total = progress.total_games();
        let mut requeued = Vec::new();
        let completed: Vec<(Offset, usize)> = progress
            .completed_offsets()
            .iter()
            .filter_map(|offset| {
                let count = progress.records_at(*offset).map_or(0, |records| records.len());
                if total.is_some_and(|total| is_short_page(*offset, count, total, page_size, false)) {
                    requeued.push(*offset);
                    None
                } else {
                    Some((*offset, count))
                }
            })
            .collect();

        let mut tracker = OffsetTracker::new(page_size, self.config.max_retries);
        tracker.restore(
            completed,
            progress.failed_offsets().iter().copied(),
            progress
                .retry_counts()
                .iter()
                .map(|(offset, count)| (*offset, *count)),
        );
        if !requeued.is_empty() {
            log::info!("[{id}] Refetching short pages at offsets {requeued:?}");
        }

        if resumed {
            log::info!(
                "[{id}] Resuming {provider}: {} games, {} offsets done, {} failed",
                progress.games_fetched(),
                progress.completed_offsets().len(),
                progress.failed_offsets().len()
            );
            if self.config.reset_exhausted_on_resume {
                let reset = tracker.reset_exhausted();
                if reset > 0 {
                    log::info!("[{id}] Gave {reset} exhausted offsets a fresh retry budget");
                }
            }
        }

        Ok(Run {
            id,
            progress,
            tracker,
            resumed,
            page_size,
            batches: 0,
            attempts: 0,
            failures: 0,
            empty_streak: 0,
        })
    }

    async fn fetch_page(&self, request: PageRequest) -> (PageRequest, Result<ParsedPage, PageError>) {
        let timeout = self.config.fetch_timeout();
        let result = match tokio::time::timeout(timeout, self.fetcher.fetch(&request)).await {
            Ok(Ok(raw)) => self.parser.parse(&raw).map_err(PageError::from),
            Ok(Err(err)) => Err(PageError::from(err)),
            Err(_) => Err(PageError::from(FetchError::Timeout(timeout))),
        };
        (request, result)
    }

    async fn persist(&mut self, run: &mut Run) -> Result<(), CompletionError> {
        run.progress.record_offsets(
            run.tracker
                .completed()
                .into_iter()
                .map(|(offset, _)| offset),
            run.tracker.failed(),
            run.tracker.retry_counts(),
        );
        let now = Utc::now();
        let checkpoint = run.progress.checkpoint(now, Some(run.id));
        let games = run.progress.games_file(now);
        self.store.save(&checkpoint, &games).await?;
        Ok(())
    }

    pub async fn run(&mut self, provider: &Provider) -> Result<RunReport, CompletionError> {
        let mut run = self.start(provider).await?;

        if run.progress.is_complete() {
            log::info!(
                "[{}] {provider} already has all {} games",
                run.id,
                run.progress.games_fetched()
            );
            return Ok(run.report(RunOutcome::AlreadyComplete));
        }

        let outcome = loop {
            self.enter(&run, Phase::Scanning);
            let fetched = run.progress.games_fetched();
            let total = run.progress.total_games();
            if total.is_some_and(|total| fetched >= total) {
                break RunOutcome::Complete;
            }
            // until the total is known, fetch one page at a time
            let (target, width) = match total {
                Some(total) => (total, self.config.concurrency),
                None => (u64::MAX, 1),
            };
            let batch = run.tracker.next_batch(fetched, target, width);
            if batch.is_empty() {
                break RunOutcome::Aborted(AbortReason::Shortfall {
                    fetched,
                    expected: total,
                });
            }

            self.enter(&run, Phase::Fetching);
            let page_size = self.config.page_size;
            let requests: Vec<PageRequest> = batch
                .into_iter()
                .filter(|offset| run.tracker.mark_in_progress(*offset))
                .map(|offset| PageRequest {
                    provider_slug: provider.slug.clone(),
                    provider_name: provider.name.clone(),
                    offset,
                    limit: page_limit(offset, total, page_size),
                })
                .collect();
            run.batches += 1;
            run.attempts += requests.len();
            let mut results =
                join_all(requests.into_iter().map(|request| self.fetch_page(request))).await;

            self.enter(&run, Phase::Merging);
            results.sort_by_key(|(request, _)| request.offset);
            let failures_before = run.failures;
            let settled = results.len();
            for (request, result) in results {
                run.merge(request, result);
            }
            log::info!(
                "[{}] {provider} batch {}: {} ok, {} failed, {}/{} games",
                run.id,
                run.batches,
                settled - (run.failures - failures_before),
                run.failures - failures_before,
                run.progress.games_fetched(),
                run.progress
                    .total_games()
                    .map_or_else(|| "?".to_string(), |t| t.to_string())
            );

            self.enter(&run, Phase::Persisting);
            self.persist(&mut run).await?;

            let exhausted = run.tracker.permanently_failed();
            if exhausted.len() >= self.config.failure_budget {
                break RunOutcome::Aborted(AbortReason::FailureBudget {
                    offsets: exhausted,
                    budget: self.config.failure_budget,
                });
            }
            if run.empty_streak >= self.config.empty_response_budget && !run.progress.is_complete()
            {
                break RunOutcome::Aborted(AbortReason::EmptyResponseBudget {
                    streak: run.empty_streak,
                    fetched: run.progress.games_fetched(),
                    expected: run.progress.total_games(),
                });
            }

            let delay = self.config.batch_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        };

        self.enter(&run, outcome.final_phase());
        match &outcome {
            RunOutcome::Aborted(reason) => {
                log::error!("[{}] {provider} aborted: {reason}", run.id)
            }
            _ => log::info!(
                "[{}] {provider} complete with {} games",
                run.id,
                run.progress.games_fetched()
            ),
        }
        Ok(run.report(outcome))
    }

    /// Runs each provider in turn. A run that ends with an error does not
    /// stop the ones after it.
    pub async fn run_each(
        &mut self,
        providers: &[Provider],
    ) -> Vec<Result<RunReport, CompletionError>> {
        let mut results = Vec::with_capacity(providers.len());
        for provider in providers {
            let result = self.run(provider).await;
            if let Err(err) = &result {
                log::error!("{provider} failed, moving on: {err}");
            }
            results.push(result);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use checkpoint::MemoryStore;
    use fetchers::{catalog_payload, ScriptedFetcher, ScriptedResponse};
    use types::GameRecord;

    use super::*;

    fn quick_config() -> CompletionConfig {
        CompletionConfig {
            batch_delay_ms: 0,
            fetch_timeout_ms: 200,
            ..CompletionConfig::default()
        }
    }

    fn games(prefix: &str, count: usize) -> Vec<GameRecord> {
        (0..count)
            .map(|i| {
                let id = format!("{prefix}{i}");
                GameRecord::new(&id, &format!("Game {id}"), &id, "https://img/x.png")
            })
            .collect()
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let config = CompletionConfig {
            concurrency: 0,
            ..quick_config()
        };
        assert!(matches!(
            CompletionDriver::new(config, ScriptedFetcher::new(), MemoryStore::new()),
            Err(CompletionError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_total_stops_at_short_page() {
        let provider = Provider::new("spribe", "Spribe");
        let page_zero = {
            // no gameCount in this payload
            let raw = catalog_payload("spribe", "Spribe", 0, &games("a", 39));
            raw.replace("\"gameCount\":0,", "")
        };
        let fetcher = ScriptedFetcher::new()
            .respond(0, ScriptedResponse::payload(page_zero))
            .respond(
                39,
                ScriptedResponse::payload(
                    catalog_payload("spribe", "Spribe", 0, &games("b", 5))
                        .replace("\"gameCount\":0,", ""),
                ),
            );
        let mut driver = CompletionDriver::new(quick_config(), fetcher, MemoryStore::new()).unwrap();
        let report = driver.run(&provider).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::Complete);
        assert_eq!(report.total_games, Some(44));
        assert_eq!(report.batches, 2);
    }

    #[test]
    fn test_short_page_detection() {
        // middle page cut short
        assert!(is_short_page(0, 12, 78, 39, false));
        // full page, empty page, and the natural last page
        assert!(!is_short_page(0, 39, 78, 39, false));
        assert!(!is_short_page(39, 0, 78, 39, false));
        assert!(!is_short_page(78, 22, 100, 39, false));
        // a salvaged last page lost its tail
        assert!(is_short_page(78, 10, 100, 39, true));
        assert!(!is_short_page(78, 22, 100, 39, true));
    }

    #[tokio::test]
    async fn test_parse_errors_count_as_failed_attempts() {
        let provider = Provider::new("spribe", "Spribe");
        let fetcher = ScriptedFetcher::new()
            .respond(0, ScriptedResponse::payload("error"))
            .respond(
                0,
                ScriptedResponse::payload(catalog_payload("spribe", "Spribe", 3, &games("s", 3))),
            );
        let mut driver = CompletionDriver::new(quick_config(), fetcher, MemoryStore::new()).unwrap();
        let report = driver.run(&provider).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::Complete);
        assert_eq!(report.failed_attempts, 1);
        assert_eq!(report.fetch_attempts, 2);
        assert_eq!(driver.fetcher().calls_for(0), 2);
    }
}

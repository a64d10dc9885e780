use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

/// Runs `operation` until it succeeds or `max_retries` retries have failed.
/// The wait doubles after every failure, plus up to half of it again as
/// random jitter.
pub async fn retry_with_backoff<F, T, E>(
    mut operation: F,
    max_retries: usize,
    initial_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Pin<Box<dyn Future<Output = Result<T, E>> + Send>>,
    E: std::fmt::Display,
{
    let mut delay = initial_delay;
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_retries => {
                attempt += 1;
                let wait = with_jitter(delay);
                tracing::warn!(
                    "Attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    wait
                );
                sleep(wait).await;
                delay *= 2;
            }
            Err(e) => return Err(e),
        }
    }
}

fn with_jitter(delay: Duration) -> Duration {
    let spread = delay.as_millis() as u64 / 2;
    delay + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
}

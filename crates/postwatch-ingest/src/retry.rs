//! Bounded retry with exponential back-off and jitter for platform API calls.
//!
//! Rate-limit responses are never retried here: a 429 means the budget for
//! the current window is spent, and retrying would only spend more of it.

use std::future::Future;
use std::time::Duration;

use crate::error::IngestError;

const MAX_DELAY_MS: u64 = 60_000;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** connect failures, timeouts, and HTTP 5xx.
///
/// **Not retriable:** [`IngestError::RateLimited`], 4xx statuses, malformed
/// bodies, invalid requests, storage errors.
pub(crate) fn is_retriable(err: &IngestError) -> bool {
    match err {
        IngestError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        IngestError::UnexpectedStatus { status, .. } => *status >= 500,
        IngestError::RateLimited { .. }
        | IngestError::Deserialize { .. }
        | IngestError::InvalidRequest(_)
        | IngestError::Db(_) => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// The n-th retry waits `backoff_base_ms × 2^(n-1)` ± 25 % jitter, capped at
/// 60 s. Non-retriable errors are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, IngestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, IngestError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay = backoff_delay(backoff_base_ms, attempt);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "platform API transient error, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn backoff_delay(backoff_base_ms: u64, attempt: u32) -> Duration {
    let computed = backoff_base_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
    let capped = computed.min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    Duration::from_millis(jittered)
}

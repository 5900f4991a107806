//! Retry with exponential back-off and jitter for source adapters.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors (network failures, 429, 5xx). Non-transient errors —
//! including [`CollectError::Auth`] and [`CollectError::RateLimitExceeded`]
//! — are returned immediately without any retry.

use std::future::Future;
use std::time::Duration;

use crate::error::CollectError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - Network-level failures: timeout, connection reset.
/// - HTTP 429 and 5xx responses: transient server-side conditions.
///
/// **Not retriable (hard stop):**
/// - [`CollectError::Auth`] — bad credentials; retrying won't fix it.
/// - [`CollectError::RateLimitExceeded`] — local budget spent; the source is
///   skipped for the rest of the cycle.
/// - [`CollectError::Deserialize`] — malformed response; retrying won't fix it.
/// - [`CollectError::UnexpectedStatus`] — deterministic client errors.
pub(crate) fn is_retriable(err: &CollectError) -> bool {
    match err {
        CollectError::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.status()
                    .is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
        }
        CollectError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
        CollectError::Auth { .. }
        | CollectError::RateLimitExceeded { .. }
        | CollectError::SourceUnavailable { .. }
        | CollectError::Deserialize { .. }
        | CollectError::InvalidBaseUrl { .. }
        | CollectError::Db(_) => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// Back-off schedule with `backoff_base_ms = 500`:
///
/// | Attempt | Sleep before next attempt     |
/// |---------|-------------------------------|
/// | 1       | 500 ms × 2⁰ ± 25 % jitter    |
/// | 2       | 500 ms × 2¹ ± 25 % jitter    |
/// | 3       | 500 ms × 2² ± 25 % jitter    |
///
/// Delay is capped at 60 s. Non-retriable errors are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, CollectError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CollectError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient source error — retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

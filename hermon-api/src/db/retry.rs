//! Retry logic for optimistic writes
//!
//! Retries an operation that lost a version check (or hit a transient
//! SQLite lock) with exponential backoff. Any other error is returned
//! immediately.

use hermon_common::{Error, Result};
use rand::Rng;
use std::time::Duration;

/// Default attempt budget for ledger writes
///
/// Sized so a burst of a few dozen writers on one ledger still converges.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 32;

const INITIAL_BACKOFF_MS: u64 = 5;
const MAX_BACKOFF_MS: u64 = 200;

/// Retry `operation` while it fails with a version conflict or lock
///
/// **Backoff Strategy:**
/// - Initial ceiling: 5ms
/// - Max ceiling: 200ms
/// - Multiplier: 2
/// - Actual sleep is uniform in `[1, ceiling]` so losers of the same race
///   do not wake up together
pub async fn retry_on_conflict<F, Fut, T>(
    operation_name: &str,
    max_attempts: u32,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        "Database operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                let retryable = match &err {
                    Error::VersionConflict(_) => true,
                    Error::Database(db_err) => db_err.to_string().contains("database is locked"),
                    _ => false,
                };

                if !retryable {
                    return Err(err);
                }

                if attempt >= max_attempts {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        "Database operation failed: retry budget exhausted"
                    );
                    return Err(Error::Internal(format!(
                        "{} failed after {} attempts: {}",
                        operation_name, attempt, err
                    )));
                }

                let sleep_ms = rand::thread_rng().gen_range(1..=backoff_ms);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    sleep_ms,
                    "Concurrent write detected, will retry after backoff"
                );

                tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}

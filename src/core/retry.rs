//! Shared retry policy with exponential backoff
//!
//! One retry helper used by the upsert engine and warehouse query paths, so
//! backoff behavior is configured in a single place instead of ad-hoc loops
//! at each call site. Only errors classified as transient are retried;
//! referential and schema failures always surface on the first attempt.

use crate::domain::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (1 disables retrying)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay
    pub max_delay_ms: u64,
    /// Multiplier applied to the delay after each retry
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Result of a retried operation plus how many attempts it took
#[derive(Debug)]
pub struct RetryReport<T> {
    /// Final outcome after retries were exhausted or the operation succeeded
    pub result: Result<T>,
    /// Number of attempts actually made
    pub attempts: u32,
}

impl<T> RetryReport<T> {
    /// Discard the attempt count and return the plain result
    pub fn into_result(self) -> Result<T> {
        self.result
    }
}

/// Run an operation, retrying transient failures with exponential backoff
///
/// Non-transient errors (foreign-key violations, schema mismatches,
/// configuration problems) return immediately with `attempts` reflecting how
/// far the loop got. A small random jitter is added to each delay to avoid
/// retry storms against a recovering warehouse.
///
/// # Examples
///
/// ```no_run
/// use tributary::core::retry::{retry_transient, RetryPolicy};
///
/// # async fn example() -> tributary::domain::Result<()> {
/// let policy = RetryPolicy::default();
/// let report = retry_transient(&policy, "chunk upsert", || async {
///     // some fallible warehouse call
///     Ok::<_, tributary::domain::SyncError>(42u64)
/// })
/// .await;
/// let rows = report.result?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_transient<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> RetryReport<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    let mut delay_ms = policy.initial_delay_ms;

    loop {
        match op().await {
            Ok(value) => {
                return RetryReport {
                    result: Ok(value),
                    attempts: attempt,
                }
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let jitter = rand::thread_rng().gen_range(0..=delay_ms / 4 + 1);
                let wait = (delay_ms + jitter).min(policy.max_delay_ms);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = wait,
                    error = %e,
                    "Transient failure, retrying {what}"
                );
                sleep(Duration::from_millis(wait)).await;
                attempt += 1;
                delay_ms = ((delay_ms as f64 * policy.backoff_multiplier) as u64)
                    .min(policy.max_delay_ms);
            }
            Err(e) => {
                return RetryReport {
                    result: Err(e),
                    attempts: attempt,
                }
            }
        }
    }
}

/// Convenience wrapper for callers that don't need the attempt count
pub async fn with_retries<T, F, Fut>(policy: &RetryPolicy, what: &str, op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_transient(policy, what, op).await.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WarehouseError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        // Two simulated connection drops, then success within a bound of 3.
        let calls = AtomicU32::new(0);
        let report = retry_transient(&fast_policy(3), "test op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(WarehouseError::ConnectionLost("reset by peer".into()).into())
                } else {
                    Ok(99u64)
                }
            }
        })
        .await;

        assert_eq!(report.attempts, 3);
        assert_eq!(report.result.unwrap(), 99);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let report = retry_transient(&fast_policy(3), "test op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<u64, _>(WarehouseError::Timeout("statement".into()).into()) }
        })
        .await;

        assert_eq!(report.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(report.result.unwrap_err().is_transient());
    }

    #[tokio::test]
    async fn test_referential_failure_not_retried() {
        let calls = AtomicU32::new(0);
        let report = retry_transient(&fast_policy(5), "test op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<u64, _>(
                    WarehouseError::ForeignKeyViolation {
                        constraint: "fk_dim_categories".into(),
                        detail: "Key (category_id)=(3)".into(),
                    }
                    .into(),
                )
            }
        })
        .await;

        assert_eq!(report.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(report.result.unwrap_err().is_referential());
    }

    #[tokio::test]
    async fn test_schema_failure_not_retried() {
        let report = retry_transient(&fast_policy(5), "test op", || async {
            Err::<u64, _>(WarehouseError::SchemaMismatch("no such column".into()).into())
        })
        .await;
        assert_eq!(report.attempts, 1);
    }

    #[tokio::test]
    async fn test_first_try_success() {
        let report = retry_transient(&fast_policy(3), "test op", || async { Ok(1u64) }).await;
        assert_eq!(report.attempts, 1);
    }
}

//! Timeout and bounded retry around sink calls.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tracing::warn;

use crate::error::{Result, ScanSeedError};

/// Largest backoff exponent: delays stop doubling after 16x the base.
const MAX_BACKOFF_SHIFT: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay: Duration,
    /// Limit for a single attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.base_delay * (1u32 << shift)
    }

    /// Run `op` until it succeeds, fails with a non-retriable error, or the
    /// retry budget is spent.
    pub async fn run<T, F, Fut>(&self, table: &str, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            let result = match tokio::time::timeout(self.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(ScanSeedError::Timeout {
                    table: table.to_string(),
                    operation: operation.to_string(),
                    seconds: self.timeout.as_secs(),
                }),
            };

            let error = match result {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retriable() => return Err(e),
                Err(e) => e,
            };

            if attempt >= self.max_retries {
                return Err(ScanSeedError::RetriesExhausted {
                    table: table.to_string(),
                    operation: operation.to_string(),
                    attempts: attempt + 1,
                    last_error: Box::new(error),
                });
            }

            attempt += 1;
            let delay = self.delay_for(attempt);
            warn!(
                "{} on {} failed ({}), retrying (attempt {}/{}) in {}ms",
                operation,
                table,
                error,
                attempt,
                self.max_retries,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Counts attempts that started and attempts that ran to completion.
///
/// A timed-out attempt is dropped mid-flight, so it is started but never
/// finished. Its effect on the sink is unknown: the statement may still have
/// been applied.
#[derive(Debug, Default)]
pub struct AttemptTracker {
    started: AtomicU32,
    finished: AtomicU32,
}

impl AttemptTracker {
    /// Mark an attempt as started. Returns whether an earlier attempt was
    /// abandoned.
    pub fn begin(&self) -> bool {
        let abandoned = self.any_abandoned();
        self.started.fetch_add(1, Ordering::SeqCst);
        abandoned
    }

    pub fn finish(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }

    /// Whether some attempt never returned.
    pub fn any_abandoned(&self) -> bool {
        self.started.load(Ordering::SeqCst) != self.finished.load(Ordering::SeqCst)
    }
}

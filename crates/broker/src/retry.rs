use std::time::Duration;

/// Re-exported so callers configuring a `RequestBroker` don't need their own
/// dependency on `exponential-backoff`.
pub use exponential_backoff::Backoff;

/// Wraps `exponential_backoff::Backoff` with jittered retry-count tracking:
/// exponential backoff on {408, 429, 5xx, connection errors} with a capped
/// retry count.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        RetryPolicy {
            max_retries,
            backoff: Backoff::new(max_retries, Duration::from_millis(200), Some(Duration::from_secs(10))),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// The delay before attempt number `attempt` (1-indexed), or `None` once
    /// retries are exhausted.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_retries {
            return None;
        }
        self.backoff.next(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Status codes that are retried
pub fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}

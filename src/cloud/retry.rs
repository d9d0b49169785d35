//! Deadline-bounded exponential backoff.
//!
//! [`RetryPolicy::default`] is the policy attached to every publish: it starts at 100ms,
//! grows by 1.3x per attempt up to 60s per wait, and gives up once 60s have elapsed in
//! total. Only the kinds in [`ErrorKind::TRANSIENT`] are retried.

use crate::cloud::traits::{CloudIOError, CloudResult, ErrorKind};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub maximum: Duration,
    pub multiplier: f64,
    pub deadline: Duration,
    pub retryable: Vec<ErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            maximum: Duration::from_secs(60),
            multiplier: 1.3,
            deadline: Duration::from_secs(60),
            retryable: ErrorKind::TRANSIENT.to_vec(),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    #[must_use]
    pub fn with_delays(mut self, initial: Duration, maximum: Duration) -> Self {
        self.initial = initial;
        self.maximum = maximum;
        self
    }

    #[must_use]
    pub fn with_retryable(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.retryable = kinds.into_iter().collect();
        self
    }

    #[must_use]
    pub fn should_retry(&self, err: &CloudIOError) -> bool {
        self.retryable.contains(&err.kind)
    }

    /// The wait that follows `current`, capped at [`RetryPolicy::maximum`].
    #[must_use]
    pub fn next_delay(&self, current: Duration) -> Duration {
        let scaled = current.as_secs_f64() * self.multiplier.max(1.0);
        let capped = scaled.min(self.maximum.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

/// Retry a function with exponential backoff until it succeeds, fails with a
/// non-retryable kind, or the policy deadline has passed. The final wait is
/// shortened to the time left, so the last attempt runs at the deadline.
///
/// # Example
/// ```
/// use cloudutils::cloud::retry::{RetryPolicy, retry_with_backoff};
///
/// let value = retry_with_backoff(&RetryPolicy::default(), || Ok(42)).unwrap();
/// assert_eq!(value, 42);
/// ```
///
/// # Errors
///
/// Returns the last error if:
/// - The operation fails with a kind outside the policy's allow-list
/// - The overall deadline is exhausted
pub fn retry_with_backoff<F, T>(policy: &RetryPolicy, mut operation: F) -> CloudResult<T>
where
    F: FnMut() -> CloudResult<T>,
{
    let start = Instant::now();
    let mut attempt = 0u32;
    let mut delay = policy.initial;

    loop {
        attempt += 1;
        match operation() {
            Ok(result) => return Ok(result),
            Err(err) => {
                if !policy.should_retry(&err) {
                    return Err(err);
                }

                let elapsed = start.elapsed();
                if elapsed >= policy.deadline {
                    warn!(attempt, error = %err, "retry deadline exhausted");
                    return Err(err.with_context(format!(
                        "retry deadline of {:?} exhausted after {attempt} attempts",
                        policy.deadline
                    )));
                }

                // The last wait is cut short so one attempt lands on the deadline.
                let wait = delay.min(policy.deadline - elapsed);
                debug!(attempt, ?wait, error = %err, "transient failure, retrying");
                std::thread::sleep(wait);
                delay = policy.next_delay(delay);
            }
        }
    }
}

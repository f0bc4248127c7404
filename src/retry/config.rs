//! Backoff parameters consumed by the retry strategies.

use std::time::Duration;

use super::strategy::{ExponentialBackoff, NoRetry, RetryStrategy};

/// Default number of retries. Zero disables retrying.
pub const DEFAULT_MAX_RETRY_COUNT: u32 = 0;
/// Default lower bound for the wait between attempts.
pub const DEFAULT_MIN_BACKOFF: Duration = Duration::from_secs(1);
/// Default upper bound for the exponential part of the wait.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);
/// Default upper bound for the random jitter added to each wait.
pub const DEFAULT_DELTA_BACKOFF: Duration = Duration::from_secs(1);

/// Immutable retry configuration shared by every operation of a publisher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffParameters {
    pub max_retry_count: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    pub delta_backoff: Duration,
}

impl Default for BackoffParameters {
    fn default() -> Self {
        Self {
            max_retry_count: DEFAULT_MAX_RETRY_COUNT,
            min_backoff: DEFAULT_MIN_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            delta_backoff: DEFAULT_DELTA_BACKOFF,
        }
    }
}

impl BackoffParameters {
    /// Select the strategy matching these parameters.
    ///
    /// A retry count of zero selects [`NoRetry`].
    pub fn strategy(&self) -> Box<dyn RetryStrategy> {
        if self.max_retry_count == 0 {
            Box::new(NoRetry)
        } else {
            Box::new(ExponentialBackoff::new(self.clone()))
        }
    }

    /// Largest wait any evaluation can produce.
    pub fn max_wait(&self) -> Duration {
        self.max_backoff.saturating_add(self.delta_backoff)
    }
}

//! Retry strategies and the decisions they produce.

use std::{fmt, time::Duration};

use rand::Rng;

use crate::transport::TransportError;

use super::config::BackoffParameters;

/// Supplies a random jitter in `0..=max`.
pub type JitterSource = Box<dyn Fn(Duration) -> Duration + Send + Sync>;

/// Uniform jitter drawn from the thread-local RNG.
pub fn random_jitter(max: Duration) -> Duration {
    let max_ns = max.as_nanos().min(u128::from(u64::MAX)) as u64;
    if max_ns == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rand::thread_rng().gen_range(0..=max_ns))
}

/// Outcome of one retry evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryDecision {
    pub should_retry: bool,
    pub wait: Duration,
}

impl RetryDecision {
    /// Retry after waiting `wait`.
    pub fn retry_after(wait: Duration) -> Self {
        Self {
            should_retry: true,
            wait,
        }
    }

    /// Stop retrying.
    pub fn give_up() -> Self {
        Self {
            should_retry: false,
            wait: Duration::ZERO,
        }
    }
}

/// Decides whether a failed operation should be attempted again.
///
/// `attempt` is the number of failures already evaluated for the current
/// operation, starting at zero. Implementations must not inspect `failure`
/// to change their answer.
pub trait RetryStrategy: Send + Sync + fmt::Debug {
    fn evaluate(&self, attempt: u32, failure: &TransportError) -> RetryDecision;
}

/// Strategy that never retries.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRetry;

impl RetryStrategy for NoRetry {
    fn evaluate(&self, _attempt: u32, _failure: &TransportError) -> RetryDecision {
        RetryDecision::give_up()
    }
}

/// Jittered exponential backoff bounded by `max_retry_count` attempts.
pub struct ExponentialBackoff {
    params: BackoffParameters,
    jitter: JitterSource,
}

impl ExponentialBackoff {
    /// Create a strategy drawing jitter from the thread-local RNG.
    pub fn new(params: BackoffParameters) -> Self {
        Self::with_jitter(params, Box::new(random_jitter))
    }

    /// Create a strategy with a custom jitter source.
    pub fn with_jitter(params: BackoffParameters, jitter: JitterSource) -> Self {
        Self { params, jitter }
    }

    pub fn parameters(&self) -> &BackoffParameters {
        &self.params
    }

    /// Exponential part of the wait for `attempt`, without jitter.
    ///
    /// Never below `min_backoff`, even when `max_backoff` is smaller.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.params
            .min_backoff
            .saturating_mul(factor)
            .min(self.params.max_backoff)
            .max(self.params.min_backoff)
    }

    fn jittered(&self, attempt: u32) -> Duration {
        let delta = self.params.delta_backoff;
        let jitter = (self.jitter)(delta).min(delta);
        self.base_delay(attempt).saturating_add(jitter)
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn evaluate(&self, attempt: u32, _failure: &TransportError) -> RetryDecision {
        if attempt < self.params.max_retry_count {
            RetryDecision::retry_after(self.jittered(attempt))
        } else {
            RetryDecision::give_up()
        }
    }
}

impl fmt::Debug for ExponentialBackoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExponentialBackoff")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

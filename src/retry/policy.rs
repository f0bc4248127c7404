//! Retry policy wrapper that notifies an observer on every evaluation.

use std::fmt;

use crate::{observer::RetryObserver, transport::TransportError};

use super::{
    config::BackoffParameters,
    strategy::{NoRetry, RetryDecision, RetryStrategy},
};

/// Strategy plus the observer injected at construction.
pub struct RetryPolicy {
    strategy: Box<dyn RetryStrategy>,
    observer: Option<RetryObserver>,
}

impl RetryPolicy {
    pub fn new(strategy: Box<dyn RetryStrategy>, observer: Option<RetryObserver>) -> Self {
        Self { strategy, observer }
    }

    /// Policy selected by `params`: [`NoRetry`] for a zero retry count,
    /// exponential backoff otherwise.
    pub fn from_parameters(params: &BackoffParameters, observer: Option<RetryObserver>) -> Self {
        Self::new(params.strategy(), observer)
    }

    /// Policy that never retries but still notifies.
    pub fn no_retry(observer: Option<RetryObserver>) -> Self {
        Self::new(Box::new(NoRetry), observer)
    }

    /// Notify the observer, then ask the strategy for a decision.
    pub fn should_retry(&self, attempt: u32, failure: &TransportError) -> RetryDecision {
        if let Some(observer) = &self.observer {
            observer(attempt, failure);
        }
        self.strategy.evaluate(attempt, failure)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("strategy", &self.strategy)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// Attempt counter for a single operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryState {
    attempts: u32,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failures evaluated so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Evaluate `failure` against `policy` and count it.
    pub fn evaluate(&mut self, policy: &RetryPolicy, failure: &TransportError) -> RetryDecision {
        let decision = policy.should_retry(self.attempts, failure);
        self.attempts = self.attempts.saturating_add(1);
        decision
    }
}

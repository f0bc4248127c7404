//! Retry policy engine.
//!
//! A [`RetryPolicy`] pairs a [`RetryStrategy`] with an optional observer. On
//! every failed attempt the caller asks the policy whether to try again; the
//! observer is notified exactly once per evaluation, including the one that
//! gives up. The per-operation attempt counter lives in [`RetryState`] and is
//! never shared between operations.
//!
//! Two strategies are provided:
//!
//! - [`NoRetry`]: every evaluation gives up.
//! - [`ExponentialBackoff`]: retries while the attempt count is below
//!   `max_retry_count`, waiting `min(max, min * 2^n) + jitter(0..=delta)`.
//!
//! Waits between attempts are interruptible through a
//! [`CancellationToken`].

mod cancel;
mod config;
mod policy;
mod strategy;


pub use cancel::{CancelTrigger, CancellationToken, cancellation};
pub use config::{
    BackoffParameters, DEFAULT_DELTA_BACKOFF, DEFAULT_MAX_BACKOFF, DEFAULT_MAX_RETRY_COUNT,
    DEFAULT_MIN_BACKOFF,
};
pub use policy::{RetryPolicy, RetryState};
pub use strategy::{
    ExponentialBackoff, JitterSource, NoRetry, RetryDecision, RetryStrategy, random_jitter,
};

//! Retry observers.
//!
//! An observer is called with the attempt count and the failure on every
//! retry evaluation, including the final one that gives up. Observers run on
//! the publishing thread and should return promptly without panicking.

use std::sync::Arc;

use chrono::Local;
use log::warn;

use crate::transport::TransportError;

/// Callback invoked as `(attempt, failure)` on every retry evaluation.
pub type RetryObserver = Arc<dyn Fn(u32, &TransportError) + Send + Sync>;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Log a retry evaluation at `warn` with a local timestamp.
pub fn log_retry(attempt: u32, failure: &TransportError) {
    warn!(
        "retry evaluation at {}: attempt {attempt}, failure: {failure}",
        Local::now().format(TIMESTAMP_FORMAT)
    );
}

/// Observer that forwards every evaluation to [`log_retry`].
pub fn logging_observer() -> RetryObserver {
    Arc::new(log_retry)
}

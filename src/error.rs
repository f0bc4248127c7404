//! Error types surfaced by the publisher.
//!
//! The partitioner and the retry policy never fail on their own. Every
//! failure is raised at the point where a batch is handed to the transport,
//! and any failure that happens after some batches were accepted carries a
//! [`Progress`] snapshot so callers can avoid re-sending delivered records.

use std::{fmt, io, time::Duration};

use thiserror::Error;

use crate::{serialise::SerializationError, transport::TransportError};

/// Errors raised while constructing a publisher.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid user supplied configuration.
    #[error("invalid publisher configuration: {0}")]
    InvalidConfig(String),
    /// Underlying I/O error whilst reading configuration or creating the
    /// transport.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Batches and records accepted by the transport before a failure.
///
/// Batches are dispatched in order, so the delivered records are always a
/// prefix of the input sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub batches: usize,
    pub records: usize,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} batches / {} records already delivered",
            self.batches, self.records
        )
    }
}

/// Errors returned by a publish call.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The records could not be serialised. Nothing was sent.
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    /// The retry policy refused another attempt.
    #[error("retries exhausted after {attempts} failed attempts ({progress}): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: TransportError,
        progress: Progress,
    },
    /// A pending backoff wait was aborted.
    #[error("publish cancelled after {attempts} failed attempts ({progress})")]
    Cancelled { attempts: u32, progress: Progress },
    /// The next retry would have finished past the operation timeout.
    #[error("operation timed out after {elapsed:?} ({progress}): {source}")]
    TimedOut {
        elapsed: Duration,
        #[source]
        source: TransportError,
        progress: Progress,
    },
}

impl PublishError {
    /// Partial progress made before the failure.
    pub fn progress(&self) -> Progress {
        match self {
            Self::Serialization(_) => Progress::default(),
            Self::Exhausted { progress, .. }
            | Self::Cancelled { progress, .. }
            | Self::TimedOut { progress, .. } => *progress,
        }
    }

    /// Slice of `records` that the transport already accepted.
    ///
    /// `records` must be the same sequence that was passed to the failed
    /// publish call.
    pub fn delivered<'a, T>(&self, records: &'a [T]) -> &'a [T] {
        let count = self.progress().records.min(records.len());
        &records[..count]
    }

    /// Whether the failure came from a cancelled backoff wait.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Errors returned when a submission cannot be queued.
#[derive(Debug, Error)]
pub enum EnqueueError {
    /// The queue is at capacity; the submission was dropped.
    #[error("publisher queue full")]
    QueueFull,
    /// The worker has shut down; the submission was dropped.
    #[error("publisher closed")]
    Closed,
    /// The records could not be converted before queuing.
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn delivered_returns_prefix() {
        let err = PublishError::Cancelled {
            attempts: 2,
            progress: Progress {
                batches: 1,
                records: 3,
            },
        };
        let records = ["a", "b", "c", "d", "e"];
        assert_eq!(err.delivered(&records), &["a", "b", "c"]);
        assert!(err.is_cancelled());
    }

    #[rstest]
    fn serialization_failure_has_no_progress() {
        let err = PublishError::from(SerializationError::NotAnArray);
        assert_eq!(err.progress(), Progress::default());
        assert!(err.delivered(&[1, 2, 3]).is_empty());
    }

    #[rstest]
    fn exhausted_message_mentions_progress() {
        let err = PublishError::Exhausted {
            attempts: 4,
            source: TransportError::Rejected { status: 503 },
            progress: Progress {
                batches: 2,
                records: 16,
            },
        };
        let text = err.to_string();
        assert!(text.contains("4 failed attempts"));
        assert!(text.contains("2 batches / 16 records"));
    }
}

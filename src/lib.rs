//! Core library for femtopublish.
//!
//! Publishes telemetry records to an ingestion endpoint. Record sequences are
//! split into size-bounded batches that preserve input order, and every
//! failed batch delivery is retried under a jittered exponential backoff
//! policy that reports each evaluation to an optional observer.

pub mod batch;
pub mod error;
pub mod file_config;
pub mod observer;
pub mod publisher;
pub mod rate_limited_warner;
pub mod retry;
pub mod serialise;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use batch::{Batch, DEFAULT_MAX_BATCH_BYTES, Partitioner, SizeAccounting, partition_sizes};
pub use error::{ConfigError, EnqueueError, Progress, PublishError};
pub use observer::{RetryObserver, log_retry, logging_observer};
pub use publisher::{
    PublishOutcome, PublishReport, PublishTicket, Publisher, PublisherBuilder, PublisherConfig,
    QueuedPublisher,
};
pub use retry::{
    BackoffParameters, CancelTrigger, CancellationToken, ExponentialBackoff, NoRetry,
    RetryDecision, RetryPolicy, RetryState, RetryStrategy, cancellation,
};
pub use serialise::{PayloadCodec, PayloadFormat, SerializationError, TextEncoding};
pub use transport::{HttpTransport, Payload, TransportError, TransportSender};

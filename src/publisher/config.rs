//! Configuration structures consumed by the publisher lifecycle.
//!
//! `PublisherBuilder` constructs these values before passing them to
//! [`Publisher`](super::Publisher) for runtime use.

use std::time::Duration;

use crate::{
    batch::{DEFAULT_MAX_BATCH_BYTES, Partitioner, SizeAccounting},
    error::ConfigError,
    rate_limited_warner::DEFAULT_WARN_INTERVAL,
    retry::BackoffParameters,
    serialise::{PayloadCodec, PayloadFormat, TextEncoding},
};

/// Default bounded channel capacity used by the queued publisher.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
/// Default connection timeout applied by the HTTP transport.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default bound on delivering one batch, retries included.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(240);

/// Configuration object describing how to construct a
/// [`Publisher`](super::Publisher).
#[derive(Clone, Debug)]
pub struct PublisherConfig {
    /// Ingestion endpoint. Must not be blank.
    pub endpoint: String,
    /// Retry count and backoff timings.
    pub backoff: BackoffParameters,
    /// Bound on delivering one batch, including every retry.
    pub operation_timeout: Duration,
    /// Timeout for establishing connections.
    pub connect_timeout: Duration,
    /// Byte limit for one batch.
    pub max_batch_bytes: usize,
    /// Wire format for batch payloads.
    pub format: PayloadFormat,
    /// Charset for text payloads.
    pub encoding: TextEncoding,
    /// How batch sizes are accounted against `max_batch_bytes`.
    pub size_accounting: SizeAccounting,
    /// Bounded queue capacity for the queued publisher.
    pub capacity: usize,
    /// Interval between rate-limited warnings.
    pub warn_interval: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            backoff: BackoffParameters::default(),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
            format: PayloadFormat::default(),
            encoding: TextEncoding::default(),
            size_accounting: SizeAccounting::default(),
            capacity: DEFAULT_CHANNEL_CAPACITY,
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

impl PublisherConfig {
    /// Check the invariants every publisher relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "endpoint must not be empty".into(),
            ));
        }
        ensure_nonzero(self.max_batch_bytes as u128, "max_batch_bytes")?;
        ensure_nonzero(self.capacity as u128, "capacity")?;
        ensure_nonzero(self.operation_timeout.as_nanos(), "operation_timeout")?;
        ensure_nonzero(self.connect_timeout.as_nanos(), "connect_timeout")?;
        if self.backoff.min_backoff > self.backoff.max_backoff {
            return Err(ConfigError::InvalidConfig(format!(
                "min_backoff ({:?}) must not exceed max_backoff ({:?})",
                self.backoff.min_backoff, self.backoff.max_backoff
            )));
        }
        Ok(())
    }

    pub fn codec(&self) -> PayloadCodec {
        PayloadCodec::new(self.format, self.encoding)
    }

    pub fn partitioner(&self) -> Partitioner {
        Partitioner::new(self.codec(), self.max_batch_bytes, self.size_accounting)
    }
}

fn ensure_nonzero(value: u128, field: &str) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::InvalidConfig(format!(
            "{field} must be greater than zero"
        )))
    } else {
        Ok(())
    }
}

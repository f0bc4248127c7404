//! Synchronous publisher: partition, encode, and deliver in order.

use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::Serialize;

use crate::{
    batch::Partitioner,
    error::{ConfigError, Progress, PublishError},
    observer::RetryObserver,
    retry::{CancellationToken, RetryPolicy, RetryState},
    serialise::{SerializationError, parse_json_array},
    transport::{Payload, TransportError, TransportSender},
};

use super::config::PublisherConfig;

/// Outcome of a successful publish call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Batches accepted by the transport.
    pub batches: usize,
    /// Records accepted by the transport.
    pub records: usize,
    /// Failed attempts that were retried, summed over all batches.
    pub retries: u32,
}

impl PublishReport {
    fn progress(&self) -> Progress {
        Progress {
            batches: self.batches,
            records: self.records,
        }
    }
}

/// Why delivering one batch stopped.
enum DeliveryFailure {
    Exhausted {
        attempts: u32,
        source: TransportError,
    },
    Cancelled {
        attempts: u32,
    },
    TimedOut {
        elapsed: Duration,
        source: TransportError,
    },
}

impl DeliveryFailure {
    fn into_error(self, progress: Progress) -> PublishError {
        match self {
            Self::Exhausted { attempts, source } => PublishError::Exhausted {
                attempts,
                source,
                progress,
            },
            Self::Cancelled { attempts } => PublishError::Cancelled { attempts, progress },
            Self::TimedOut { elapsed, source } => PublishError::TimedOut {
                elapsed,
                source,
                progress,
            },
        }
    }
}

/// Splits record sequences into size-bounded batches and delivers each one
/// through the transport, retrying failures according to the policy.
///
/// Each publish call gets its own attempt counter per batch; the policy and
/// its parameters are shared across calls.
pub struct Publisher<S> {
    transport: S,
    policy: RetryPolicy,
    partitioner: Partitioner,
    operation_timeout: Duration,
}

impl<S: TransportSender> Publisher<S> {
    /// Construct a publisher from a validated configuration.
    pub fn new(
        config: &PublisherConfig,
        transport: S,
        observer: Option<RetryObserver>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            transport,
            policy: RetryPolicy::from_parameters(&config.backoff, observer),
            partitioner: config.partitioner(),
            operation_timeout: config.operation_timeout,
        })
    }

    /// Replace the retry policy, keeping everything else.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn partitioner(&self) -> &Partitioner {
        &self.partitioner
    }

    pub fn transport(&self) -> &S {
        &self.transport
    }

    /// Publish `records`, returning once every batch has been accepted.
    pub fn publish<T: Serialize>(&mut self, records: &[T]) -> Result<PublishReport, PublishError> {
        self.publish_with_cancel(records, &CancellationToken::never())
    }

    /// Publish a pre-serialised JSON array of records.
    pub fn publish_json(&mut self, json_array: &str) -> Result<PublishReport, PublishError> {
        let records = parse_json_array(json_array)?;
        self.publish(&records)
    }

    /// Publish `records`, aborting pending backoff waits when `cancel` fires.
    ///
    /// Every batch is encoded before the first one is sent, so a
    /// serialisation failure never leaves a partial delivery behind.
    pub fn publish_with_cancel<T: Serialize>(
        &mut self,
        records: &[T],
        cancel: &CancellationToken,
    ) -> Result<PublishReport, PublishError> {
        let batches = self.partitioner.partition(records)?;
        let codec = self.partitioner.codec();
        let payloads = batches
            .iter()
            .map(|batch| {
                let bytes = codec.encode_batch(batch.records())?;
                Ok((
                    batch.len(),
                    Payload::new(bytes, codec.format().content_type(), codec.charset()),
                ))
            })
            .collect::<Result<Vec<_>, SerializationError>>()?;

        let mut report = PublishReport::default();
        let total = payloads.len();
        for (index, (count, payload)) in payloads.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(PublishError::Cancelled {
                    attempts: 0,
                    progress: report.progress(),
                });
            }
            let retries = self
                .deliver(payload, cancel)
                .map_err(|failure| failure.into_error(report.progress()))?;
            report.batches += 1;
            report.records += count;
            report.retries = report.retries.saturating_add(retries);
            debug!(
                "publisher delivered batch {}/{total} ({count} records, {} bytes, {retries} retries)",
                index + 1,
                payload.len()
            );
        }
        Ok(report)
    }

    /// Send one payload until it is accepted or the policy gives up.
    ///
    /// Returns the number of failed attempts that preceded the success.
    fn deliver(
        &mut self,
        payload: &Payload,
        cancel: &CancellationToken,
    ) -> Result<u32, DeliveryFailure> {
        let started = Instant::now();
        let mut state = RetryState::new();
        loop {
            let err = match self.transport.send(payload) {
                Ok(()) => return Ok(state.attempts()),
                Err(err) => err,
            };
            warn!("publisher send failed: {err}");
            let decision = state.evaluate(&self.policy, &err);
            if !decision.should_retry {
                warn!(
                    "publisher giving up after {} failed attempts",
                    state.attempts()
                );
                return Err(DeliveryFailure::Exhausted {
                    attempts: state.attempts(),
                    source: err,
                });
            }
            let elapsed = started.elapsed();
            if elapsed.saturating_add(decision.wait) > self.operation_timeout {
                warn!("publisher operation timeout reached after {elapsed:?}");
                return Err(DeliveryFailure::TimedOut {
                    elapsed,
                    source: err,
                });
            }
            debug!("publisher retrying in {:?}", decision.wait);
            if cancel.wait(decision.wait) {
                warn!("publisher retry wait cancelled");
                return Err(DeliveryFailure::Cancelled {
                    attempts: state.attempts(),
                });
            }
        }
    }
}

impl<S> std::fmt::Debug for Publisher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("policy", &self.policy)
            .field("partitioner", &self.partitioner)
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}

//! Public queued publisher type.

use std::{sync::Arc, thread, time::Duration};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use serde::Serialize;

use crate::{
    error::EnqueueError,
    publisher::{Publisher, config::PublisherConfig},
    rate_limited_warner::RateLimitedWarner,
    serialise::{SerializationError, parse_json_array},
    transport::TransportSender,
};

use super::worker::{
    ActiveCancel, PublishCommand, PublishOutcome, enqueue_submission, flush_queue, spawn_worker,
    warn_drop,
};

/// Handle to the outcome of one queued submission.
#[derive(Debug)]
pub struct PublishTicket {
    outcome: Receiver<PublishOutcome>,
}

impl PublishTicket {
    /// Block until the submission finishes.
    ///
    /// Returns `None` if the worker exited without reporting an outcome.
    pub fn wait(self) -> Option<PublishOutcome> {
        self.outcome.recv().ok()
    }

    /// Block for at most `timeout`.
    ///
    /// Returns `None` on timeout or if the worker exited without reporting.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<PublishOutcome> {
        match self.outcome.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// Publisher running on a background worker thread.
///
/// Submissions are delivered one at a time in the order they were accepted.
pub struct QueuedPublisher {
    tx: Option<Sender<PublishCommand>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    active: ActiveCancel,
    warner: RateLimitedWarner,
    shutdown_timeout: Duration,
}

impl QueuedPublisher {
    /// Move `publisher` onto a worker thread.
    pub fn spawn<S>(publisher: Publisher<S>, config: &PublisherConfig) -> Self
    where
        S: TransportSender + 'static,
    {
        let active = ActiveCancel::default();
        let (tx, handle) = spawn_worker(publisher, config.capacity, Arc::clone(&active));
        Self {
            tx: Some(tx),
            handle: Mutex::new(Some(handle)),
            active,
            warner: RateLimitedWarner::new(config.warn_interval),
            shutdown_timeout: config.operation_timeout,
        }
    }

    /// Queue `records` for publishing.
    ///
    /// Records are converted to JSON values up front, so conversion errors
    /// are reported here rather than through the ticket.
    pub fn submit<T: Serialize>(&self, records: &[T]) -> Result<PublishTicket, EnqueueError> {
        let values = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(SerializationError::from)?;
        self.enqueue(values)
    }

    /// Queue a pre-serialised JSON array of records.
    pub fn submit_json(&self, json_array: &str) -> Result<PublishTicket, EnqueueError> {
        self.enqueue(parse_json_array(json_array)?)
    }

    fn enqueue(&self, records: Vec<serde_json::Value>) -> Result<PublishTicket, EnqueueError> {
        let Some(tx) = self.tx.as_ref() else {
            warn_drop(&self.warner, "closed");
            return Err(EnqueueError::Closed);
        };
        let (outcome_tx, outcome_rx) = bounded(1);
        let command = PublishCommand::Submit {
            records,
            outcome: outcome_tx,
        };
        enqueue_submission(tx, command, &self.warner)?;
        Ok(PublishTicket {
            outcome: outcome_rx,
        })
    }

    /// Wait until every earlier submission has finished.
    pub fn flush(&self, timeout: Duration) -> bool {
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };
        self.warner.flush(|count| {
            log::warn!("QueuedPublisher dropped {count} submissions in the last interval");
        });
        flush_queue(tx, timeout)
    }

    /// Abort the backoff wait of the submission currently being delivered.
    ///
    /// Returns `false` when no submission was in flight.
    pub fn cancel(&self) -> bool {
        self.active.cancel_active()
    }

    /// Drain pending submissions and wait for the worker to exit.
    ///
    /// If the worker has not drained the queue within the operation timeout,
    /// the in-flight submission and everything queued behind it fail with
    /// `Cancelled`.
    pub fn close(&mut self) {
        self.request_shutdown();
        self.join_worker();
    }

    fn request_shutdown(&mut self) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        let (ack_tx, ack_rx) = bounded(1);
        if tx.send(PublishCommand::Shutdown(ack_tx)).is_err() {
            return;
        }
        if ack_rx.recv_timeout(self.shutdown_timeout).is_err() {
            log::warn!("QueuedPublisher shutdown not acknowledged; cancelling pending submissions");
            self.active.abort_all();
        }
    }

    fn join_worker(&mut self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            log::warn!("QueuedPublisher: worker thread panicked");
        }
    }
}

impl Drop for QueuedPublisher {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for QueuedPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedPublisher")
            .field("open", &self.tx.is_some())
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

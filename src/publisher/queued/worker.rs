//! Worker thread driving queued submissions.

use std::{sync::Arc, thread, time::Duration};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use log::{debug, warn};
use parking_lot::Mutex;
use serde_json::Value;

use crate::{
    error::{EnqueueError, Progress, PublishError},
    publisher::{PublishReport, Publisher},
    rate_limited_warner::RateLimitedWarner,
    retry::{CancelTrigger, CancellationToken, cancellation},
    transport::TransportSender,
};

/// Outcome delivered to a [`PublishTicket`](super::PublishTicket).
pub type PublishOutcome = Result<PublishReport, PublishError>;

/// Cancellation shared between the handle and the worker.
///
/// Once `abort_all` has run, the in-flight submission is cancelled and every
/// later submission fails with `Cancelled` before its first send.
#[derive(Debug, Default)]
pub struct CancelState {
    slot: Mutex<CancelSlot>,
}

#[derive(Debug, Default)]
struct CancelSlot {
    active: Option<CancelTrigger>,
    closing: bool,
}

impl CancelState {
    /// Install a fresh trigger for the next submission.
    ///
    /// Returns `None` once the publisher is closing.
    fn begin(&self) -> Option<CancellationToken> {
        let mut slot = self.slot.lock();
        if slot.closing {
            return None;
        }
        let (trigger, token) = cancellation();
        slot.active = Some(trigger);
        Some(token)
    }

    fn finish(&self) {
        self.slot.lock().active.take();
    }

    /// Cancel the in-flight submission only.
    pub fn cancel_active(&self) -> bool {
        match self.slot.lock().active.as_ref() {
            Some(trigger) => {
                trigger.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel the in-flight submission and every one still queued.
    pub fn abort_all(&self) {
        let mut slot = self.slot.lock();
        slot.closing = true;
        if let Some(trigger) = slot.active.as_ref() {
            trigger.cancel();
        }
    }
}

pub type ActiveCancel = Arc<CancelState>;

/// Commands processed by the worker thread.
#[derive(Debug)]
pub enum PublishCommand {
    Submit {
        records: Vec<Value>,
        outcome: Sender<PublishOutcome>,
    },
    Flush(Sender<()>),
    Shutdown(Sender<()>),
}

pub fn spawn_worker<S>(
    publisher: Publisher<S>,
    capacity: usize,
    active: ActiveCancel,
) -> (Sender<PublishCommand>, thread::JoinHandle<()>)
where
    S: TransportSender + 'static,
{
    let (tx, rx) = bounded(capacity);
    let handle = thread::spawn(move || worker_loop(rx, publisher, &active));
    (tx, handle)
}

fn worker_loop<S: TransportSender>(
    rx: Receiver<PublishCommand>,
    mut publisher: Publisher<S>,
    active: &ActiveCancel,
) {
    while let Ok(cmd) = rx.recv() {
        match cmd {
            PublishCommand::Submit { records, outcome } => {
                let result = publish_submission(&mut publisher, &records, active);
                if let Err(err) = &result {
                    warn!("QueuedPublisher submission failed: {err}");
                }
                if outcome.send(result).is_err() {
                    debug!("QueuedPublisher outcome dropped; ticket no longer held");
                }
            }
            PublishCommand::Flush(ack) => {
                let _ = ack.send(());
            }
            PublishCommand::Shutdown(ack) => {
                let _ = ack.send(());
                break;
            }
        }
    }
}

fn publish_submission<S: TransportSender>(
    publisher: &mut Publisher<S>,
    records: &[Value],
    active: &ActiveCancel,
) -> PublishOutcome {
    let Some(token) = active.begin() else {
        return Err(PublishError::Cancelled {
            attempts: 0,
            progress: Progress::default(),
        });
    };
    let result = publisher.publish_with_cancel(records, &token);
    active.finish();
    result
}

pub fn enqueue_submission(
    tx: &Sender<PublishCommand>,
    command: PublishCommand,
    warner: &RateLimitedWarner,
) -> Result<(), EnqueueError> {
    match tx.try_send(command) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(_)) => {
            warn_drop(warner, "queue full");
            Err(EnqueueError::QueueFull)
        }
        Err(TrySendError::Disconnected(_)) => {
            warn_drop(warner, "disconnected");
            Err(EnqueueError::Closed)
        }
    }
}

pub fn warn_drop(warner: &RateLimitedWarner, reason: &str) {
    warner.record_drop();
    warner.warn_if_due(|count| {
        warn!("QueuedPublisher {reason}; dropped {count} submissions");
    });
}

/// Wait until the worker has processed every command queued before this one.
pub fn flush_queue(tx: &Sender<PublishCommand>, timeout: Duration) -> bool {
    let (ack_tx, ack_rx) = bounded(1);
    if tx
        .send_timeout(PublishCommand::Flush(ack_tx), timeout)
        .is_err()
    {
        return false;
    }
    ack_rx.recv_timeout(timeout).is_ok()
}

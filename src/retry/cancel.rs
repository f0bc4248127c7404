//! Cooperative cancellation for backoff waits.
//!
//! The trigger holds the only sender of a zero-capacity channel. Cancelling
//! sets a flag and drops that sender, which wakes every waiting token at
//! once. Dropping the trigger without cancelling leaves waits running to
//! completion.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, never};
use parking_lot::Mutex;

/// Create a linked trigger/token pair.
pub fn cancellation() -> (CancelTrigger, CancellationToken) {
    let (tx, rx) = bounded(0);
    let cancelled = Arc::new(AtomicBool::new(false));
    let trigger = CancelTrigger {
        cancelled: Arc::clone(&cancelled),
        signal: Mutex::new(Some(tx)),
    };
    let token = CancellationToken {
        cancelled,
        signal: rx,
    };
    (trigger, token)
}

/// Aborts waits on every token cloned from its pair.
#[derive(Debug)]
pub struct CancelTrigger {
    cancelled: Arc<AtomicBool>,
    signal: Mutex<Option<Sender<()>>>,
}

impl CancelTrigger {
    /// Cancel all current and future waits. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.signal.lock().take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Observes a [`CancelTrigger`].
#[derive(Clone, Debug)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    signal: Receiver<()>,
}

impl CancellationToken {
    /// Token that is never cancelled.
    pub fn never() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            signal: never(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Block for `timeout` unless cancelled first.
    ///
    /// Returns `true` when the wait was cut short by cancellation.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        let deadline = Instant::now().checked_add(timeout);
        match self.signal.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                if self.is_cancelled() {
                    return true;
                }
                // Trigger dropped without cancelling; finish the wait.
                match deadline {
                    Some(deadline) => {
                        thread::sleep(deadline.saturating_duration_since(Instant::now()))
                    }
                    None => thread::sleep(timeout),
                }
                false
            }
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::never()
    }
}

//! A transport that replays scripted outcomes for test assertions.
//!
//! Clones share the same script and recordings, so a test can keep one handle
//! while the publisher owns another.

use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;

use crate::transport::{Payload, TransportError, TransportSender};

#[derive(Default)]
struct Script {
    outcomes: VecDeque<Result<(), TransportError>>,
    sent: Vec<Payload>,
    accepted: Vec<Payload>,
}

/// Transport returning queued outcomes in order, then succeeding forever.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    /// Create a transport that accepts every payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that returns `outcomes` before accepting.
    pub fn with_outcomes(outcomes: impl IntoIterator<Item = Result<(), TransportError>>) -> Self {
        let transport = Self::new();
        transport.script.lock().outcomes.extend(outcomes);
        transport
    }

    /// Queue `count` copies of `failure`.
    pub fn fail_times(&self, count: usize, failure: TransportError) -> &Self {
        self.script
            .lock()
            .outcomes
            .extend(std::iter::repeat_n(Err(failure), count));
        self
    }

    /// Every payload passed to `send`, failed attempts included.
    pub fn sent(&self) -> Vec<Payload> {
        self.script.lock().sent.clone()
    }

    /// Payloads that were accepted.
    pub fn accepted(&self) -> Vec<Payload> {
        self.script.lock().accepted.clone()
    }

    /// Number of `send` calls so far.
    pub fn attempts(&self) -> usize {
        self.script.lock().sent.len()
    }
}

impl TransportSender for ScriptedTransport {
    fn send(&mut self, payload: &Payload) -> Result<(), TransportError> {
        let mut script = self.script.lock();
        script.sent.push(payload.clone());
        let outcome = script.outcomes.pop_front().unwrap_or(Ok(()));
        if outcome.is_ok() {
            script.accepted.push(payload.clone());
        }
        outcome
    }
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let script = self.script.lock();
        f.debug_struct("ScriptedTransport")
            .field("pending", &script.outcomes.len())
            .field("sent", &script.sent.len())
            .finish()
    }
}

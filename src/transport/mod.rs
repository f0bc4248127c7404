//! Transport boundary used by the publisher.
//!
//! A [`TransportSender`] accepts one encoded batch at a time and reports
//! success or a [`TransportError`]. It neither batches nor retries; both are
//! layered above it by the publisher.

mod http;

use thiserror::Error;

pub use http::HttpTransport;

/// Encoded batch handed to a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    bytes: Vec<u8>,
    content_type: &'static str,
    charset: Option<&'static str>,
}

impl Payload {
    pub fn new(bytes: Vec<u8>, content_type: &'static str, charset: Option<&'static str>) -> Self {
        Self {
            bytes,
            content_type,
            charset,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn charset(&self) -> Option<&'static str> {
        self.charset
    }

    /// Value for a `Content-Type` header, including the charset when known.
    pub fn content_type_header(&self) -> String {
        match self.charset {
            Some(charset) => format!("{}; charset={}", self.content_type, charset),
            None => self.content_type.to_string(),
        }
    }
}

/// Failure reported by a transport.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The endpoint could not be reached.
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),
    /// The endpoint answered but did not accept the payload.
    #[error("endpoint rejected payload with status {status}")]
    Rejected { status: u16 },
}

/// Sends one encoded batch to the remote endpoint.
pub trait TransportSender: Send {
    /// Deliver `payload`, blocking until the endpoint accepts or rejects it.
    fn send(&mut self, payload: &Payload) -> Result<(), TransportError>;
}

impl<S: TransportSender + ?Sized> TransportSender for Box<S> {
    fn send(&mut self, payload: &Payload) -> Result<(), TransportError> {
        (**self).send(payload)
    }
}

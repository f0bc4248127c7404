//! HTTP transport backed by a pooled `ureq` agent.

use std::{io, sync::Arc, time::Duration};

use native_tls::TlsConnector;
use ureq::{Agent, AgentBuilder};

use crate::error::ConfigError;

use super::{Payload, TransportError, TransportSender};

/// Posts each batch to a fixed URL.
///
/// Any 2xx answer counts as delivered. Every other status and every
/// connection failure is reported as a [`TransportError`] for the retry
/// policy to judge.
pub struct HttpTransport {
    agent: Agent,
    url: String,
}

impl HttpTransport {
    /// Build a transport for `url`.
    ///
    /// `request_timeout` bounds a single request end to end.
    pub fn new(
        url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "HTTP transport requires a URL".into(),
            ));
        }
        let connector = TlsConnector::new().map_err(io::Error::other)?;
        let agent = AgentBuilder::new()
            .tls_connector(Arc::new(connector))
            .timeout_connect(connect_timeout)
            .timeout(request_timeout)
            .build();
        Ok(Self { agent, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TransportSender for HttpTransport {
    fn send(&mut self, payload: &Payload) -> Result<(), TransportError> {
        let result = self
            .agent
            .post(&self.url)
            .set("Content-Type", &payload.content_type_header())
            .send_bytes(payload.bytes());
        match result {
            Ok(response) => classify_status(response.status()),
            Err(ureq::Error::Status(code, _)) => classify_status(code),
            Err(ureq::Error::Transport(err)) => Err(TransportError::Unreachable(err.to_string())),
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("url", &self.url)
            .finish()
    }
}

/// Maps an HTTP status onto the transport outcome.
pub(crate) fn classify_status(status: u16) -> Result<(), TransportError> {
    match status {
        200..=299 => Ok(()),
        _ => Err(TransportError::Rejected { status }),
    }
}

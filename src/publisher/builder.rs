//! Builder for [`Publisher`] and [`QueuedPublisher`].
//!
//! Exposes endpoint configuration, timeouts, batch limits, payload format,
//! and exponential backoff parameters. Values are validated when the
//! configuration is built; nothing is checked in the setters.

use std::{sync::Arc, time::Duration};

use crate::{
    batch::SizeAccounting,
    error::ConfigError,
    observer::RetryObserver,
    serialise::{PayloadFormat, TextEncoding},
    transport::{HttpTransport, TransportError, TransportSender},
};

use super::{Publisher, QueuedPublisher, config::PublisherConfig};

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(ConfigError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Builder for constructing publishers.
#[derive(Clone, Default)]
pub struct PublisherBuilder {
    endpoint: Option<String>,
    max_retry_count: Option<u32>,
    min_backoff_ms: Option<u64>,
    max_backoff_ms: Option<u64>,
    delta_backoff_ms: Option<u64>,
    operation_timeout_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
    max_batch_bytes: Option<usize>,
    capacity: Option<usize>,
    format: Option<PayloadFormat>,
    encoding: Option<TextEncoding>,
    size_accounting: Option<SizeAccounting>,
    observer: Option<RetryObserver>,
}

impl PublisherBuilder {
    /// Create a new builder with no endpoint configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a builder from an existing configuration.
    pub fn from_config(config: &PublisherConfig) -> Self {
        Self {
            endpoint: Some(config.endpoint.clone()),
            max_retry_count: Some(config.backoff.max_retry_count),
            min_backoff_ms: Some(duration_ms(config.backoff.min_backoff)),
            max_backoff_ms: Some(duration_ms(config.backoff.max_backoff)),
            delta_backoff_ms: Some(duration_ms(config.backoff.delta_backoff)),
            operation_timeout_ms: Some(duration_ms(config.operation_timeout)),
            connect_timeout_ms: Some(duration_ms(config.connect_timeout)),
            max_batch_bytes: Some(config.max_batch_bytes),
            capacity: Some(config.capacity),
            format: Some(config.format),
            encoding: Some(config.encoding),
            size_accounting: Some(config.size_accounting),
            observer: None,
        }
    }

    /// Set the ingestion endpoint (required).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    option_setter!(
        #[doc = "Set the number of retries after the first failed attempt. Zero disables retrying."]
        with_max_retry_count,
        max_retry_count,
        u32
    );
    option_setter!(
        #[doc = "Set the minimum backoff in milliseconds."]
        with_min_backoff_ms,
        min_backoff_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the maximum backoff in milliseconds."]
        with_max_backoff_ms,
        max_backoff_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the upper bound of the random jitter in milliseconds."]
        with_delta_backoff_ms,
        delta_backoff_ms,
        u64
    );
    option_setter!(
        #[doc = "Bound one batch's delivery, retries included, in milliseconds."]
        with_operation_timeout_ms,
        operation_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the connect timeout in milliseconds."]
        with_connect_timeout_ms,
        connect_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the byte limit for one batch."]
        with_max_batch_bytes,
        max_batch_bytes,
        usize
    );
    option_setter!(
        #[doc = "Set the bounded queue capacity of the queued publisher."]
        with_capacity,
        capacity,
        usize
    );
    option_setter!(
        #[doc = "Select the payload wire format."]
        with_format,
        format,
        PayloadFormat
    );
    option_setter!(
        #[doc = "Select the charset for text payloads."]
        with_encoding,
        encoding,
        TextEncoding
    );
    option_setter!(
        #[doc = "Select how batch sizes are accounted against the limit."]
        with_size_accounting,
        size_accounting,
        SizeAccounting
    );

    /// Install a retry observer.
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(u32, &TransportError) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_endpoint()?;
        self.validate_sizes()?;
        self.validate_timeouts()?;
        Ok(())
    }

    fn validate_endpoint(&self) -> Result<(), ConfigError> {
        match &self.endpoint {
            None => Err(ConfigError::InvalidConfig(
                "publisher requires an endpoint".into(),
            )),
            Some(endpoint) if endpoint.trim().is_empty() => Err(ConfigError::InvalidConfig(
                "endpoint must not be empty".into(),
            )),
            _ => Ok(()),
        }
    }

    fn validate_sizes(&self) -> Result<(), ConfigError> {
        if let Some(bytes) = self.max_batch_bytes {
            ensure_positive!(bytes, "max_batch_bytes")?;
        }
        if let Some(capacity) = self.capacity {
            ensure_positive!(capacity, "capacity")?;
        }
        Ok(())
    }

    fn validate_timeouts(&self) -> Result<(), ConfigError> {
        if let Some(timeout) = self.operation_timeout_ms {
            ensure_positive!(timeout, "operation_timeout_ms")?;
        }
        if let Some(timeout) = self.connect_timeout_ms {
            ensure_positive!(timeout, "connect_timeout_ms")?;
        }
        Ok(())
    }

    /// Resolve every option against the defaults and validate the result.
    pub fn build_config(&self) -> Result<PublisherConfig, ConfigError> {
        self.validate()?;

        let defaults = PublisherConfig::default();
        let mut config = PublisherConfig {
            endpoint: self.endpoint.clone().unwrap_or_default(),
            operation_timeout: self
                .operation_timeout_ms
                .map_or(defaults.operation_timeout, Duration::from_millis),
            connect_timeout: self
                .connect_timeout_ms
                .map_or(defaults.connect_timeout, Duration::from_millis),
            max_batch_bytes: self.max_batch_bytes.unwrap_or(defaults.max_batch_bytes),
            capacity: self.capacity.unwrap_or(defaults.capacity),
            format: self.format.unwrap_or(defaults.format),
            encoding: self.encoding.unwrap_or(defaults.encoding),
            size_accounting: self.size_accounting.unwrap_or(defaults.size_accounting),
            ..defaults
        };

        let backoff = &mut config.backoff;
        if let Some(count) = self.max_retry_count {
            backoff.max_retry_count = count;
        }
        if let Some(ms) = self.min_backoff_ms {
            backoff.min_backoff = Duration::from_millis(ms);
        }
        if let Some(ms) = self.max_backoff_ms {
            backoff.max_backoff = Duration::from_millis(ms);
        }
        if let Some(ms) = self.delta_backoff_ms {
            backoff.delta_backoff = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Build a publisher sending through `transport`.
    pub fn build<S: TransportSender>(&self, transport: S) -> Result<Publisher<S>, ConfigError> {
        let config = self.build_config()?;
        Publisher::new(&config, transport, self.observer.clone())
    }

    /// Build a publisher sending over HTTP to the configured endpoint.
    pub fn build_http(&self) -> Result<Publisher<HttpTransport>, ConfigError> {
        let config = self.build_config()?;
        let transport = http_transport(&config)?;
        Publisher::new(&config, transport, self.observer.clone())
    }

    /// Build a queued publisher sending through `transport` on a worker
    /// thread.
    pub fn build_queued<S>(&self, transport: S) -> Result<QueuedPublisher, ConfigError>
    where
        S: TransportSender + 'static,
    {
        let config = self.build_config()?;
        let publisher = Publisher::new(&config, transport, self.observer.clone())?;
        Ok(QueuedPublisher::spawn(publisher, &config))
    }

    /// Build a queued publisher sending over HTTP.
    pub fn build_queued_http(&self) -> Result<QueuedPublisher, ConfigError> {
        let config = self.build_config()?;
        let transport = http_transport(&config)?;
        let publisher = Publisher::new(&config, transport, self.observer.clone())?;
        Ok(QueuedPublisher::spawn(publisher, &config))
    }
}

impl std::fmt::Debug for PublisherBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublisherBuilder")
            .field("endpoint", &self.endpoint)
            .field("max_retry_count", &self.max_retry_count)
            .field("min_backoff_ms", &self.min_backoff_ms)
            .field("max_backoff_ms", &self.max_backoff_ms)
            .field("delta_backoff_ms", &self.delta_backoff_ms)
            .field("operation_timeout_ms", &self.operation_timeout_ms)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("max_batch_bytes", &self.max_batch_bytes)
            .field("capacity", &self.capacity)
            .field("format", &self.format)
            .field("encoding", &self.encoding)
            .field("size_accounting", &self.size_accounting)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

fn http_transport(config: &PublisherConfig) -> Result<HttpTransport, ConfigError> {
    HttpTransport::new(
        config.endpoint.clone(),
        config.connect_timeout,
        config.operation_timeout,
    )
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

//! Publisher lifecycle: configuration, building, and delivery.
//!
//! [`Publisher`] partitions a record sequence into size-bounded batches,
//! encodes them, and hands each one to a [`TransportSender`] in order,
//! consulting its [`RetryPolicy`] after every failed attempt.
//! [`QueuedPublisher`] runs the same loop on a worker thread.
//!
//! [`TransportSender`]: crate::transport::TransportSender
//! [`RetryPolicy`]: crate::retry::RetryPolicy

mod builder;
pub mod config;
mod dispatch;
mod queued;


pub use builder::PublisherBuilder;
pub use config::PublisherConfig;
pub use dispatch::{PublishReport, Publisher};
pub use queued::{PublishOutcome, PublishTicket, QueuedPublisher};

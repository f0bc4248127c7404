//! Publisher running on a dedicated worker thread.
//!
//! Callers submit record sequences through a bounded channel and receive a
//! [`PublishTicket`] per submission. The worker owns the [`Publisher`] and
//! delivers submissions strictly in order.
//!
//! [`Publisher`]: crate::publisher::Publisher

mod handler;
mod worker;

pub use handler::{PublishTicket, QueuedPublisher};
pub use worker::PublishOutcome;

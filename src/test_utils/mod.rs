//! Helpers shared across unit and integration tests.
//!
//! Compiled for unit tests and, through the `test-util` feature, for the
//! integration tests under `tests/`.

pub mod scripted_transport;

pub use scripted_transport::ScriptedTransport;

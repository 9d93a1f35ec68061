//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`gateway`]: scriptable in-memory [`ExchangeGateway`](crate::port::ExchangeGateway).
//! - [`predictor`]: fixed or queued predictor responses.
//! - [`notifier`]: notifier that records every event.
//! - [`domain`]: opportunity builders.
//! - [`config`]: run configurations tuned for fast tests.

pub mod config;
pub mod domain;
pub mod gateway;
pub mod notifier;
pub mod predictor;

//! Implementations of ports (hexagonal adapters).

pub mod executor;
pub mod notifier;
pub mod predictor;
pub mod sandbox;
pub mod store;

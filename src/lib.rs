//! Arbflow - cross-venue arbitrage transaction orchestration.
//!
//! Takes detected price gaps between two venues and runs each one as a
//! four-leg transaction (fund, buy, transfer, sell) under a concurrency
//! cap, with predictor and policy gates in front and a graceful drain on
//! shutdown.
//!
//! # Modules
//!
//! - [`domain`] - Opportunities, transactions, decisions, outcome codes, stats
//! - [`port`] - Traits at the system edges: gateway, predictor, notifier, store, leg executor
//! - [`application`] - Policy engine, state machine, concurrency limiter, orchestration engine
//! - [`adapter`] - Port implementations: simulation, sandbox HTTP client, SQLite store
//! - [`config`] - TOML configuration and logging setup
//! - [`cli`] - Command-line interface
//! - [`error`] - Error types for the crate
//!
//! # Features
//!
//! - `testkit` - Mock gateway, scripted predictor and recording notifier
//!   for integration tests

pub mod adapter;
pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use error::{Error, Result};

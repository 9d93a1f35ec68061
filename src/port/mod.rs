//! Capability traits the engine depends on.
//!
//! Adapters implement these; the application layer only sees the traits.

pub mod exchange;
pub mod executor;
pub mod notifier;
pub mod predictor;
pub mod store;

pub use exchange::{ExchangeGateway, OrderFill, OrderSide, Quote, WithdrawReceipt};
pub use executor::{Fill, Funding, LegExecutor, Transfer};
pub use notifier::{Event, Notifier};
pub use predictor::Predictor;
pub use store::{OperationRecord, StateSnapshot, Store};

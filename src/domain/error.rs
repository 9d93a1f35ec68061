//! Domain validation errors for core domain types.
//!
//! These errors are returned when an opportunity snapshot violates a basic
//! invariant or when a transaction is asked to move against its fixed
//! forward sequence.
//!
//! # Examples
//!
//! ```
//! use arbflow::domain::error::DomainError;
//! use arbflow::domain::Opportunity;
//! use rust_decimal_macros::dec;
//!
//! let opportunity = Opportunity::builder()
//!     .symbol("BTC/USDT")
//!     .buy_venue("binance")
//!     .sell_venue("kraken")
//!     .buy_price(dec!(0))
//!     .sell_price(dec!(100))
//!     .investment(dec!(100))
//!     .build()
//!     .unwrap();
//!
//! assert!(matches!(
//!     opportunity.validate(),
//!     Err(DomainError::NonPositivePrice { .. })
//! ));
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

use super::transaction::TransactionState;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Buy and sell prices must be strictly positive.
    #[error("{side} price must be positive, got {price}")]
    NonPositivePrice {
        /// Which side of the gap carried the invalid price.
        side: &'static str,
        /// The invalid price.
        price: Decimal,
    },

    /// The investment amount must be strictly positive.
    #[error("investment must be positive, got {amount}")]
    NonPositiveInvestment {
        /// The invalid amount.
        amount: Decimal,
    },

    /// Fee rates and fixed fees cannot be negative.
    #[error("fee {field} cannot be negative, got {value}")]
    NegativeFee {
        /// Name of the fee field.
        field: &'static str,
        /// The invalid value.
        value: Decimal,
    },

    /// Buying and selling on the same venue is not a cross-venue gap.
    #[error("buy and sell venue must differ, both are {venue}")]
    SameVenue {
        /// The repeated venue id.
        venue: String,
    },

    /// Symbols must have the `BASE/QUOTE` shape.
    #[error("malformed symbol '{symbol}', expected BASE/QUOTE")]
    MalformedSymbol {
        /// The rejected symbol text.
        symbol: String,
    },

    /// Transactions only move forward along the leg sequence.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// State the transaction was in.
        from: TransactionState,
        /// State that was requested.
        to: TransactionState,
    },
}

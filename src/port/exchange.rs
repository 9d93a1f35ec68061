//! Exchange gateway port.
//!
//! The gateway is the only way legs reach a venue in sandbox and live
//! modes. Every call is an await point; errors are typed so the state
//! machine can record them on the failed transaction.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Amount, Price, Quantity, Symbol, VenueId};
use crate::error::GatewayError;

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Top-of-book quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub bid: Price,
    pub ask: Price,
}

/// Result of a market order. `filled_amount` may be less than requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderFill {
    /// Base quantity filled.
    pub filled_amount: Quantity,
    pub avg_price: Price,
    /// Fee charged, in quote.
    pub fee: Amount,
}

/// Result of a withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawReceipt {
    /// Fee charged, in units of the withdrawn currency.
    pub fee: Amount,
}

/// Venue access for price discovery, orders and transfers.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Current quote for `symbol` at `venue`.
    async fn get_price(&self, venue: &VenueId, symbol: &Symbol) -> Result<Quote, GatewayError>;

    /// Free quote-currency balance at `venue`.
    async fn get_balance(&self, venue: &VenueId) -> Result<Amount, GatewayError>;

    /// Place a market order.
    ///
    /// For buys `amount` is the quote to spend; for sells it is the base
    /// quantity to sell.
    async fn place_market_order(
        &self,
        venue: &VenueId,
        symbol: &Symbol,
        side: OrderSide,
        amount: Amount,
    ) -> Result<OrderFill, GatewayError>;

    /// Move `amount` of `currency` from `venue` to `destination`.
    async fn withdraw(
        &self,
        venue: &VenueId,
        currency: &str,
        amount: Amount,
        destination: &VenueId,
    ) -> Result<WithdrawReceipt, GatewayError>;

    /// Gateway name for logging.
    fn name(&self) -> &'static str;
}

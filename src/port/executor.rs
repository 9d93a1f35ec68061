//! Leg execution port.
//!
//! One implementation per execution mode. The state machine only talks to
//! this trait, so leg sequencing and policy stay identical across modes.

use async_trait::async_trait;

use crate::domain::{Amount, ExecutionMode, Opportunity, Price, Quantity, Rate};
use crate::error::GatewayError;

/// Quote made available at the buy venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Funding {
    pub available: Amount,
    /// Fee charged in quote while funding.
    pub fee: Amount,
}

/// An executed buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    /// Base quantity actually traded.
    pub quantity: Quantity,
    pub avg_price: Price,
    /// Trading fee in quote.
    pub fee: Amount,
}

impl Fill {
    /// `quantity × avg_price`, before fees.
    #[must_use]
    pub fn notional(&self) -> Amount {
        self.quantity * self.avg_price
    }
}

/// An executed asset transfer between venues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    /// Base quantity that arrived at the sell venue.
    pub received: Quantity,
    /// Fee charged in quote on top of any in-kind deduction.
    pub fee: Amount,
}

/// Performs the effect of each leg for one execution mode.
#[async_trait]
pub trait LegExecutor: Send + Sync {
    fn mode(&self) -> ExecutionMode;

    /// Make `amount` of quote available at the buy venue.
    async fn fund(&self, opportunity: &Opportunity, amount: Amount)
        -> Result<Funding, GatewayError>;

    /// Current entry (ask) price at the buy venue.
    async fn quote_entry(&self, opportunity: &Opportunity) -> Result<Price, GatewayError>;

    /// Spend up to `quote_amount` buying the base asset. Fills may be partial.
    async fn buy(&self, opportunity: &Opportunity, quote_amount: Amount)
        -> Result<Fill, GatewayError>;

    /// Move `quantity` of the base asset from the buy venue to the sell venue.
    async fn transfer(
        &self,
        opportunity: &Opportunity,
        quantity: Quantity,
    ) -> Result<Transfer, GatewayError>;

    /// Fee rate the sale leg will be charged, used to project the exit.
    ///
    /// Defaults to the rate quoted with the opportunity.
    fn exit_fee_rate(&self, opportunity: &Opportunity) -> Rate {
        opportunity.sell_fee_rate()
    }

    /// Current exit (bid) price at the sell venue.
    async fn quote_exit(&self, opportunity: &Opportunity) -> Result<Price, GatewayError>;

    /// Sell `quantity` of the base asset at the sell venue. Fills may be partial.
    async fn sell(&self, opportunity: &Opportunity, quantity: Quantity)
        -> Result<Fill, GatewayError>;
}

//! Opportunity type with builder pattern.
//!
//! An `Opportunity` is an immutable snapshot of a cross-venue price gap:
//! buy the base asset at one venue, sell it at another. It carries the
//! fee estimates the detector saw so the engine can judge the gap after
//! costs before any leg runs.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{Symbol, VenueId};
use super::money::{Amount, Price, Quantity, Rate};

/// Error returned when building an Opportunity fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpportunityBuildError {
    MissingSymbol,
    MissingBuyVenue,
    MissingSellVenue,
    MissingBuyPrice,
    MissingSellPrice,
    MissingInvestment,
}

impl fmt::Display for OpportunityBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSymbol => write!(f, "symbol is required"),
            Self::MissingBuyVenue => write!(f, "buy_venue is required"),
            Self::MissingSellVenue => write!(f, "sell_venue is required"),
            Self::MissingBuyPrice => write!(f, "buy_price is required"),
            Self::MissingSellPrice => write!(f, "sell_price is required"),
            Self::MissingInvestment => write!(f, "investment is required"),
        }
    }
}

impl std::error::Error for OpportunityBuildError {}

/// A detected cross-venue price gap.
///
/// Use `Opportunity::builder()` to construct instances. Construction only
/// checks that required fields are present; call [`Opportunity::validate`]
/// before acting on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    symbol: Symbol,
    buy_venue: VenueId,
    sell_venue: VenueId,
    buy_price: Price,
    sell_price: Price,
    investment: Amount,
    #[serde(default)]
    buy_fee_rate: Rate,
    #[serde(default)]
    sell_fee_rate: Rate,
    #[serde(default)]
    withdrawal_fee: Amount,
    #[serde(default = "Utc::now")]
    detected_at: DateTime<Utc>,
}

impl Opportunity {
    /// Create a new builder for constructing an Opportunity.
    pub fn builder() -> OpportunityBuilder {
        OpportunityBuilder::new()
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn buy_venue(&self) -> &VenueId {
        &self.buy_venue
    }

    pub fn sell_venue(&self) -> &VenueId {
        &self.sell_venue
    }

    pub fn buy_price(&self) -> Price {
        self.buy_price
    }

    pub fn sell_price(&self) -> Price {
        self.sell_price
    }

    /// Investment in quote currency.
    pub fn investment(&self) -> Amount {
        self.investment
    }

    /// Estimated trading fee rate at the buy venue.
    pub fn buy_fee_rate(&self) -> Rate {
        self.buy_fee_rate
    }

    /// Estimated trading fee rate at the sell venue.
    pub fn sell_fee_rate(&self) -> Rate {
        self.sell_fee_rate
    }

    /// Fixed fee for moving the asset between venues, in quote currency.
    pub fn withdrawal_fee(&self) -> Amount {
        self.withdrawal_fee
    }

    pub fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }

    /// Copy of this snapshot with a different investment amount.
    #[must_use]
    pub fn with_investment(&self, investment: Amount) -> Self {
        Self {
            investment,
            ..self.clone()
        }
    }

    /// Check the snapshot's invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.symbol.is_well_formed() {
            return Err(DomainError::MalformedSymbol {
                symbol: self.symbol.to_string(),
            });
        }
        if self.buy_price <= Decimal::ZERO {
            return Err(DomainError::NonPositivePrice {
                side: "buy",
                price: self.buy_price,
            });
        }
        if self.sell_price <= Decimal::ZERO {
            return Err(DomainError::NonPositivePrice {
                side: "sell",
                price: self.sell_price,
            });
        }
        if self.investment <= Decimal::ZERO {
            return Err(DomainError::NonPositiveInvestment {
                amount: self.investment,
            });
        }
        for (field, value) in [
            ("buy_fee_rate", self.buy_fee_rate),
            ("sell_fee_rate", self.sell_fee_rate),
            ("withdrawal_fee", self.withdrawal_fee),
        ] {
            if value < Decimal::ZERO {
                return Err(DomainError::NegativeFee { field, value });
            }
        }
        if self.buy_venue == self.sell_venue {
            return Err(DomainError::SameVenue {
                venue: self.buy_venue.to_string(),
            });
        }
        Ok(())
    }

    /// Gross price gap as a percentage of the buy price.
    pub fn spread_pct(&self) -> Decimal {
        if self.buy_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.sell_price - self.buy_price) / self.buy_price * Decimal::ONE_HUNDRED
    }

    /// Quantity the investment buys once the buy fee is reserved.
    pub fn estimated_quantity(&self) -> Quantity {
        let unit_cost = self.buy_price * (Decimal::ONE + self.buy_fee_rate);
        if unit_cost <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.investment / unit_cost
    }

    /// Net profit after all fees if the asset is sold at the quoted sell price.
    pub fn estimated_profit(&self) -> Amount {
        self.estimated_profit_at(self.sell_price)
    }

    /// Net profit after all fees if the asset is sold at `exit_price`.
    pub fn estimated_profit_at(&self, exit_price: Price) -> Amount {
        let proceeds =
            self.estimated_quantity() * exit_price * (Decimal::ONE - self.sell_fee_rate);
        proceeds - self.withdrawal_fee - self.investment
    }

    /// Estimated profit as a percentage of the investment.
    pub fn estimated_profit_pct(&self) -> Decimal {
        if self.investment <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.estimated_profit() / self.investment * Decimal::ONE_HUNDRED
    }

    /// Absolute fee total implied by the snapshot, for display.
    pub fn estimated_fees(&self) -> Amount {
        self.investment * self.buy_fee_rate
            + self.estimated_quantity() * self.sell_price * self.sell_fee_rate
            + self.withdrawal_fee
    }
}

/// Builder for constructing `Opportunity` instances.
///
/// # Example
///
/// ```
/// use arbflow::domain::Opportunity;
/// use rust_decimal_macros::dec;
///
/// let opportunity = Opportunity::builder()
///     .symbol("BTC/USDT")
///     .buy_venue("binance")
///     .sell_venue("kraken")
///     .buy_price(dec!(100))
///     .sell_price(dec!(105))
///     .investment(dec!(100))
///     .build()
///     .unwrap();
///
/// assert_eq!(opportunity.estimated_profit(), dec!(5));
/// ```
#[derive(Debug, Default)]
pub struct OpportunityBuilder {
    symbol: Option<Symbol>,
    buy_venue: Option<VenueId>,
    sell_venue: Option<VenueId>,
    buy_price: Option<Price>,
    sell_price: Option<Price>,
    investment: Option<Amount>,
    buy_fee_rate: Rate,
    sell_fee_rate: Rate,
    withdrawal_fee: Amount,
    detected_at: Option<DateTime<Utc>>,
}

impl OpportunityBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbol(mut self, symbol: impl Into<Symbol>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn buy_venue(mut self, venue: impl Into<VenueId>) -> Self {
        self.buy_venue = Some(venue.into());
        self
    }

    pub fn sell_venue(mut self, venue: impl Into<VenueId>) -> Self {
        self.sell_venue = Some(venue.into());
        self
    }

    pub fn buy_price(mut self, price: Price) -> Self {
        self.buy_price = Some(price);
        self
    }

    pub fn sell_price(mut self, price: Price) -> Self {
        self.sell_price = Some(price);
        self
    }

    pub fn investment(mut self, amount: Amount) -> Self {
        self.investment = Some(amount);
        self
    }

    /// Set the per-leg trading fee rates and the fixed withdrawal fee.
    pub fn fees(mut self, buy_fee_rate: Rate, sell_fee_rate: Rate, withdrawal_fee: Amount) -> Self {
        self.buy_fee_rate = buy_fee_rate;
        self.sell_fee_rate = sell_fee_rate;
        self.withdrawal_fee = withdrawal_fee;
        self
    }

    pub fn detected_at(mut self, at: DateTime<Utc>) -> Self {
        self.detected_at = Some(at);
        self
    }

    /// Build the Opportunity.
    ///
    /// # Errors
    ///
    /// Returns `OpportunityBuildError` if any required field is missing.
    pub fn build(self) -> Result<Opportunity, OpportunityBuildError> {
        Ok(Opportunity {
            symbol: self.symbol.ok_or(OpportunityBuildError::MissingSymbol)?,
            buy_venue: self.buy_venue.ok_or(OpportunityBuildError::MissingBuyVenue)?,
            sell_venue: self.sell_venue.ok_or(OpportunityBuildError::MissingSellVenue)?,
            buy_price: self.buy_price.ok_or(OpportunityBuildError::MissingBuyPrice)?,
            sell_price: self.sell_price.ok_or(OpportunityBuildError::MissingSellPrice)?,
            investment: self.investment.ok_or(OpportunityBuildError::MissingInvestment)?,
            buy_fee_rate: self.buy_fee_rate,
            sell_fee_rate: self.sell_fee_rate,
            withdrawal_fee: self.withdrawal_fee,
            detected_at: self.detected_at.unwrap_or_else(Utc::now),
        })
    }
}

//! Legs executed through an [`ExchangeGateway`].
//!
//! Used for both the sandbox endpoint and live venues. Sizes, prices and
//! fees come from the gateway's responses; nothing is synthesized.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{Amount, ExecutionMode, Opportunity, Price, Quantity, VenueId};
use crate::error::GatewayError;
use crate::port::{ExchangeGateway, Fill, Funding, LegExecutor, OrderSide, Transfer};

pub struct GatewayExecutor {
    gateway: Arc<dyn ExchangeGateway>,
    mode: ExecutionMode,
    treasury: Option<VenueId>,
}

impl GatewayExecutor {
    /// Wrap `gateway`. With a treasury venue, funding withdraws quote from
    /// it; otherwise the buy venue must already hold the investment.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn ExchangeGateway>,
        mode: ExecutionMode,
        treasury: Option<VenueId>,
    ) -> Self {
        Self {
            gateway,
            mode,
            treasury,
        }
    }
}

#[async_trait]
impl LegExecutor for GatewayExecutor {
    fn mode(&self) -> ExecutionMode {
        self.mode
    }

    async fn fund(&self, opportunity: &Opportunity, amount: Amount) -> Result<Funding, GatewayError> {
        let buy_venue = opportunity.buy_venue();
        match &self.treasury {
            Some(treasury) if treasury != buy_venue => {
                let quote = opportunity.symbol().quote();
                let receipt = self
                    .gateway
                    .withdraw(treasury, quote, amount, buy_venue)
                    .await?;
                debug!(
                    gateway = self.gateway.name(),
                    from = %treasury,
                    to = %buy_venue,
                    fee = %receipt.fee,
                    "Funded buy venue"
                );
                Ok(Funding {
                    available: amount - receipt.fee,
                    fee: receipt.fee,
                })
            }
            _ => {
                let balance = self.gateway.get_balance(buy_venue).await?;
                if balance < amount {
                    return Err(GatewayError::InsufficientFunds {
                        required: amount,
                        available: balance,
                    });
                }
                Ok(Funding {
                    available: amount,
                    fee: Decimal::ZERO,
                })
            }
        }
    }

    async fn quote_entry(&self, opportunity: &Opportunity) -> Result<Price, GatewayError> {
        let quote = self
            .gateway
            .get_price(opportunity.buy_venue(), opportunity.symbol())
            .await?;
        Ok(quote.ask)
    }

    async fn buy(&self, opportunity: &Opportunity, quote_amount: Amount) -> Result<Fill, GatewayError> {
        let fill = self
            .gateway
            .place_market_order(
                opportunity.buy_venue(),
                opportunity.symbol(),
                OrderSide::Buy,
                quote_amount,
            )
            .await?;
        Ok(Fill {
            quantity: fill.filled_amount,
            avg_price: fill.avg_price,
            fee: fill.fee,
        })
    }

    async fn transfer(
        &self,
        opportunity: &Opportunity,
        quantity: Quantity,
    ) -> Result<Transfer, GatewayError> {
        let receipt = self
            .gateway
            .withdraw(
                opportunity.buy_venue(),
                opportunity.symbol().base(),
                quantity,
                opportunity.sell_venue(),
            )
            .await?;
        // asset withdrawals are charged in kind
        Ok(Transfer {
            received: quantity - receipt.fee,
            fee: Decimal::ZERO,
        })
    }

    async fn quote_exit(&self, opportunity: &Opportunity) -> Result<Price, GatewayError> {
        let quote = self
            .gateway
            .get_price(opportunity.sell_venue(), opportunity.symbol())
            .await?;
        Ok(quote.bid)
    }

    async fn sell(&self, opportunity: &Opportunity, quantity: Quantity) -> Result<Fill, GatewayError> {
        let fill = self
            .gateway
            .place_market_order(
                opportunity.sell_venue(),
                opportunity.symbol(),
                OrderSide::Sell,
                quantity,
            )
            .await?;
        Ok(Fill {
            quantity: fill.filled_amount,
            avg_price: fill.avg_price,
            fee: fill.fee,
        })
    }
}

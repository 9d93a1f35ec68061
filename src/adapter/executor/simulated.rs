//! In-process leg simulation.
//!
//! Prices come from the opportunity snapshot, moved against the trader by
//! a uniformly drawn slippage rate. Fees come from the run's commission
//! settings. Each leg waits the configured delay before it resolves.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::time::sleep;
use tracing::trace;

use crate::config::{CommissionConfig, RunConfig, SlippageConfig};
use crate::domain::{floor_quantity, Amount, ExecutionMode, Opportunity, Price, Quantity, Rate};
use crate::error::GatewayError;
use crate::port::{Fill, Funding, LegExecutor, Transfer};

/// Executes legs against synthetic prices and fills.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    commission: CommissionConfig,
    slippage: SlippageConfig,
    leg_delay: Duration,
}

impl SimulatedExecutor {
    #[must_use]
    pub fn new(commission: CommissionConfig, slippage: SlippageConfig, leg_delay: Duration) -> Self {
        Self {
            commission,
            slippage,
            leg_delay,
        }
    }

    #[must_use]
    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(
            config.commission.clone(),
            config.slippage.clone(),
            config.leg_delay(),
        )
    }

    /// Draw a slippage rate within the configured bounds.
    fn sample_slippage(&self) -> Decimal {
        let min = self.slippage.min_rate.to_f64().unwrap_or(0.0);
        let max = self.slippage.max_rate.to_f64().unwrap_or(min);
        if max <= min {
            return self.slippage.min_rate;
        }
        let drawn = rand::thread_rng().gen_range(min..=max);
        Decimal::try_from(drawn)
            .map(|d| d.round_dp(8))
            .unwrap_or(self.slippage.min_rate)
    }

    fn entry_price(&self, opportunity: &Opportunity) -> Price {
        opportunity.buy_price() * (Decimal::ONE + self.sample_slippage())
    }

    fn exit_price(&self, opportunity: &Opportunity) -> Price {
        opportunity.sell_price() * (Decimal::ONE - self.sample_slippage())
    }

    async fn pause(&self) {
        if !self.leg_delay.is_zero() {
            sleep(self.leg_delay).await;
        }
    }
}

#[async_trait]
impl LegExecutor for SimulatedExecutor {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Local
    }

    async fn fund(&self, _opportunity: &Opportunity, amount: Amount) -> Result<Funding, GatewayError> {
        self.pause().await;
        Ok(Funding {
            available: amount,
            fee: Decimal::ZERO,
        })
    }

    async fn quote_entry(&self, opportunity: &Opportunity) -> Result<Price, GatewayError> {
        Ok(opportunity.buy_price())
    }

    async fn buy(&self, opportunity: &Opportunity, quote_amount: Amount) -> Result<Fill, GatewayError> {
        self.pause().await;
        let price = self.entry_price(opportunity);
        let unit_cost = price * (Decimal::ONE + self.commission.buy_rate);
        let quantity = floor_quantity(quote_amount / unit_cost);
        let fee = quantity * price * self.commission.buy_rate;
        trace!(price = %price, quantity = %quantity, "Simulated buy");
        Ok(Fill {
            quantity,
            avg_price: price,
            fee,
        })
    }

    async fn transfer(
        &self,
        _opportunity: &Opportunity,
        quantity: Quantity,
    ) -> Result<Transfer, GatewayError> {
        self.pause().await;
        Ok(Transfer {
            received: quantity,
            fee: self.commission.withdrawal_fee,
        })
    }

    fn exit_fee_rate(&self, _opportunity: &Opportunity) -> Rate {
        self.commission.sell_rate
    }

    async fn quote_exit(&self, opportunity: &Opportunity) -> Result<Price, GatewayError> {
        Ok(self.exit_price(opportunity))
    }

    async fn sell(&self, opportunity: &Opportunity, quantity: Quantity) -> Result<Fill, GatewayError> {
        self.pause().await;
        let price = self.exit_price(opportunity);
        let fee = quantity * price * self.commission.sell_rate;
        trace!(price = %price, quantity = %quantity, "Simulated sell");
        Ok(Fill {
            quantity,
            avg_price: price,
            fee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn opportunity() -> Opportunity {
        Opportunity::builder()
            .symbol("BTC/USDT")
            .buy_venue("a")
            .sell_venue("b")
            .buy_price(dec!(100))
            .sell_price(dec!(105))
            .investment(dec!(100))
            .build()
            .unwrap()
    }

    fn executor(min: Decimal, max: Decimal) -> SimulatedExecutor {
        SimulatedExecutor::new(
            CommissionConfig {
                buy_rate: dec!(0.001),
                sell_rate: dec!(0.001),
                withdrawal_fee: dec!(1),
            },
            SlippageConfig {
                min_rate: min,
                max_rate: max,
            },
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn buy_reserves_the_fee() {
        let exec = executor(dec!(0), dec!(0));
        let fill = exec.buy(&opportunity(), dec!(100)).await.unwrap();
        assert_eq!(fill.avg_price, dec!(100));
        assert!(fill.notional() + fill.fee <= dec!(100));
        assert_eq!(fill.quantity, floor_quantity(dec!(100) / dec!(100.1)));
    }

    #[tokio::test]
    async fn slippage_stays_within_bounds() {
        let exec = executor(dec!(0.001), dec!(0.005));
        for _ in 0..50 {
            let fill = exec.buy(&opportunity(), dec!(100)).await.unwrap();
            assert!(fill.avg_price >= dec!(100.1), "{}", fill.avg_price);
            assert!(fill.avg_price <= dec!(100.5), "{}", fill.avg_price);
            let exit = exec.quote_exit(&opportunity()).await.unwrap();
            assert!(exit <= dec!(104.895) && exit >= dec!(104.475), "{exit}");
        }
    }

    #[tokio::test]
    async fn projected_exit_fee_matches_the_charged_fee() {
        let exec = executor(dec!(0), dec!(0));
        let opp = Opportunity::builder()
            .symbol("BTC/USDT")
            .buy_venue("a")
            .sell_venue("b")
            .buy_price(dec!(100))
            .sell_price(dec!(105))
            .investment(dec!(100))
            .fees(dec!(0.01), dec!(0.02), dec!(0))
            .build()
            .unwrap();
        let rate = exec.exit_fee_rate(&opp);
        assert_eq!(rate, dec!(0.001));

        let fill = exec.sell(&opp, dec!(1)).await.unwrap();
        assert_eq!(fill.fee, fill.notional() * rate);
    }

    #[tokio::test]
    async fn transfer_charges_withdrawal_fee() {
        let exec = executor(dec!(0), dec!(0));
        let transfer = exec.transfer(&opportunity(), dec!(0.5)).await.unwrap();
        assert_eq!(transfer.received, dec!(0.5));
        assert_eq!(transfer.fee, dec!(1));
    }

    #[tokio::test]
    async fn legs_wait_the_configured_delay() {
        let exec = SimulatedExecutor::new(
            CommissionConfig::default(),
            SlippageConfig::default(),
            Duration::from_millis(20),
        );
        let start = std::time::Instant::now();
        exec.fund(&opportunity(), dec!(100)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}

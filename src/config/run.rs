//! Per-run orchestration settings.
//!
//! A `RunConfig` is read once when a run starts and stays fixed until the
//! run stops. Percentages (`*_pct`) are whole percents (2 = 2%); rates are
//! fractional (0.001 = 0.1%).

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{Amount, Rate, VenueId};
use crate::error::ConfigError;

/// How the per-operation investment is sized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentMode {
    /// Invest a constant amount.
    #[default]
    Fixed,
    /// Invest a percentage of the current balance.
    Percentage,
}

/// Investment sizing.
#[derive(Debug, Clone, Deserialize)]
pub struct InvestmentConfig {
    #[serde(default)]
    pub mode: InvestmentMode,
    /// Quote amount for `fixed`, whole percent of balance for `percentage`.
    #[serde(default = "default_investment_amount")]
    pub amount: Decimal,
}

fn default_investment_amount() -> Decimal {
    Decimal::ONE_HUNDRED
}

impl Default for InvestmentConfig {
    fn default() -> Self {
        Self {
            mode: InvestmentMode::default(),
            amount: default_investment_amount(),
        }
    }
}

/// Fees charged by the local simulation.
#[derive(Debug, Clone, Deserialize)]
pub struct CommissionConfig {
    #[serde(default = "default_trade_rate")]
    pub buy_rate: Rate,
    #[serde(default = "default_trade_rate")]
    pub sell_rate: Rate,
    /// Fixed fee for moving the asset between venues, in quote.
    #[serde(default = "default_withdrawal_fee")]
    pub withdrawal_fee: Amount,
}

fn default_trade_rate() -> Rate {
    Decimal::new(1, 3) // 0.1%
}

fn default_withdrawal_fee() -> Amount {
    Decimal::ONE
}

impl Default for CommissionConfig {
    fn default() -> Self {
        Self {
            buy_rate: default_trade_rate(),
            sell_rate: default_trade_rate(),
            withdrawal_fee: default_withdrawal_fee(),
        }
    }
}

/// Uniform slippage bounds for the local simulation.
#[derive(Debug, Clone, Deserialize)]
pub struct SlippageConfig {
    #[serde(default)]
    pub min_rate: Rate,
    #[serde(default = "default_max_slippage")]
    pub max_rate: Rate,
}

fn default_max_slippage() -> Rate {
    Decimal::new(1, 3)
}

impl Default for SlippageConfig {
    fn default() -> Self {
        Self {
            min_rate: Decimal::ZERO,
            max_rate: default_max_slippage(),
        }
    }
}

/// Orchestration run configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Starting balance in quote currency.
    #[serde(default = "default_initial_balance")]
    pub initial_balance: Amount,
    /// Simulated time between legs in milliseconds.
    #[serde(default = "default_leg_delay_ms")]
    pub leg_delay_ms: u64,
    /// Stop admitting opportunities after this many seconds.
    #[serde(default)]
    pub run_duration_secs: Option<u64>,
    /// Stop admitting opportunities after this many accepted operations.
    #[serde(default)]
    pub max_operations: Option<u64>,
    #[serde(default = "default_max_concurrent_operations")]
    pub max_concurrent_operations: usize,
    /// Per-operation stop-loss, whole percent of the investment.
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: Decimal,
    /// Run-wide stop-loss, whole percent of the initial balance.
    #[serde(default = "default_global_stop_loss_pct")]
    pub global_stop_loss_pct: Decimal,
    /// Optional take-profit, whole percent of the investment.
    #[serde(default)]
    pub take_profit_pct: Option<Decimal>,
    #[serde(default)]
    pub investment: InvestmentConfig,
    #[serde(default = "default_min_investment")]
    pub min_investment: Amount,
    /// Profit below this floor is not worth executing.
    #[serde(default = "default_min_profit_floor")]
    pub min_profit_floor: Amount,
    #[serde(default)]
    pub commission: CommissionConfig,
    #[serde(default)]
    pub slippage: SlippageConfig,
    /// Grace period granted to in-flight operations on a graceful stop.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
    /// Venue holding idle quote funds. When unset, the buy venue is
    /// expected to be pre-funded.
    #[serde(default)]
    pub treasury_venue: Option<VenueId>,
}

fn default_initial_balance() -> Amount {
    Decimal::from(10_000)
}

const fn default_leg_delay_ms() -> u64 {
    500
}

const fn default_max_concurrent_operations() -> usize {
    5
}

fn default_stop_loss_pct() -> Decimal {
    Decimal::from(2)
}

fn default_global_stop_loss_pct() -> Decimal {
    Decimal::from(10)
}

fn default_min_investment() -> Amount {
    Decimal::TEN
}

fn default_min_profit_floor() -> Amount {
    Decimal::new(5, 2) // $0.05
}

const fn default_drain_timeout_ms() -> u64 {
    60_000
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            initial_balance: default_initial_balance(),
            leg_delay_ms: default_leg_delay_ms(),
            run_duration_secs: None,
            max_operations: None,
            max_concurrent_operations: default_max_concurrent_operations(),
            stop_loss_pct: default_stop_loss_pct(),
            global_stop_loss_pct: default_global_stop_loss_pct(),
            take_profit_pct: None,
            investment: InvestmentConfig::default(),
            min_investment: default_min_investment(),
            min_profit_floor: default_min_profit_floor(),
            commission: CommissionConfig::default(),
            slippage: SlippageConfig::default(),
            drain_timeout_ms: default_drain_timeout_ms(),
            treasury_venue: None,
        }
    }
}

impl RunConfig {
    #[must_use]
    pub fn leg_delay(&self) -> Duration {
        Duration::from_millis(self.leg_delay_ms)
    }

    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    #[must_use]
    pub fn run_duration(&self) -> Option<Duration> {
        self.run_duration_secs.map(Duration::from_secs)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let hundred = Decimal::ONE_HUNDRED;

        if self.initial_balance <= Decimal::ZERO {
            return Err(invalid("initial_balance", "must be greater than 0"));
        }
        if self.max_concurrent_operations == 0 {
            return Err(invalid("max_concurrent_operations", "must be greater than 0"));
        }
        if self.stop_loss_pct <= Decimal::ZERO || self.stop_loss_pct > hundred {
            return Err(invalid("stop_loss_pct", "must be in (0, 100]"));
        }
        if self.global_stop_loss_pct <= Decimal::ZERO || self.global_stop_loss_pct > hundred {
            return Err(invalid("global_stop_loss_pct", "must be in (0, 100]"));
        }
        if matches!(self.take_profit_pct, Some(tp) if tp <= Decimal::ZERO) {
            return Err(invalid("take_profit_pct", "must be greater than 0"));
        }
        if self.investment.amount <= Decimal::ZERO {
            return Err(invalid("investment.amount", "must be greater than 0"));
        }
        if self.investment.mode == InvestmentMode::Percentage && self.investment.amount > hundred {
            return Err(invalid("investment.amount", "percentage must be at most 100"));
        }
        if self.min_investment < Decimal::ZERO {
            return Err(invalid("min_investment", "must be 0 or greater"));
        }
        for (field, rate) in [
            ("commission.buy_rate", self.commission.buy_rate),
            ("commission.sell_rate", self.commission.sell_rate),
        ] {
            if rate < Decimal::ZERO || rate >= Decimal::ONE {
                return Err(invalid(field, "must be in [0, 1)"));
            }
        }
        if self.commission.withdrawal_fee < Decimal::ZERO {
            return Err(invalid("commission.withdrawal_fee", "must be 0 or greater"));
        }
        if self.slippage.min_rate < Decimal::ZERO || self.slippage.max_rate >= Decimal::ONE {
            return Err(invalid("slippage", "rates must be in [0, 1)"));
        }
        if self.slippage.min_rate > self.slippage.max_rate {
            return Err(invalid("slippage", "min_rate must be <= max_rate"));
        }
        if self.drain_timeout_ms == 0 {
            return Err(invalid("drain_timeout_ms", "must be greater than 0"));
        }
        if self.max_operations == Some(0) {
            return Err(invalid("max_operations", "must be greater than 0"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_are_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.drain_timeout(), Duration::from_secs(60));
        assert_eq!(config.min_profit_floor, dec!(0.05));
    }

    #[test]
    fn parses_nested_sections() {
        let config: RunConfig = toml::from_str(
            r#"
            initial_balance = "5000"
            max_concurrent_operations = 3
            take_profit_pct = "5"
            treasury_venue = "vault"

            [investment]
            mode = "percentage"
            amount = "10"

            [slippage]
            min_rate = "0"
            max_rate = "0.002"
            "#,
        )
        .unwrap();
        assert_eq!(config.initial_balance, dec!(5000));
        assert_eq!(config.investment.mode, InvestmentMode::Percentage);
        assert_eq!(config.take_profit_pct, Some(dec!(5)));
        assert_eq!(config.treasury_venue, Some(VenueId::from("vault")));
        assert_eq!(config.slippage.max_rate, dec!(0.002));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_concurrency() {
        let config = RunConfig {
            max_concurrent_operations: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "max_concurrent_operations",
                ..
            })
        ));
    }

    #[test]
    fn rejects_inverted_slippage() {
        let config = RunConfig {
            slippage: SlippageConfig {
                min_rate: dec!(0.01),
                max_rate: dec!(0.001),
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_percentage_over_hundred() {
        let config = RunConfig {
            investment: InvestmentConfig {
                mode: InvestmentMode::Percentage,
                amount: dec!(150),
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

//! Canonical test configurations.
//!
//! Zero leg delay and zero slippage unless a test asks otherwise.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::{
    CommissionConfig, InvestmentConfig, InvestmentMode, RunConfig, SlippageConfig,
};

/// Fast, deterministic run config.
pub fn run() -> RunConfig {
    RunConfig {
        initial_balance: dec!(10000),
        leg_delay_ms: 0,
        max_concurrent_operations: 5,
        investment: InvestmentConfig {
            mode: InvestmentMode::Fixed,
            amount: dec!(100),
        },
        commission: CommissionConfig {
            buy_rate: Decimal::ZERO,
            sell_rate: Decimal::ZERO,
            withdrawal_fee: Decimal::ZERO,
        },
        slippage: SlippageConfig {
            min_rate: Decimal::ZERO,
            max_rate: Decimal::ZERO,
        },
        drain_timeout_ms: 1000,
        ..RunConfig::default()
    }
}

/// [`run`] with a concurrency cap.
pub fn run_with_capacity(max_concurrent_operations: usize) -> RunConfig {
    RunConfig {
        max_concurrent_operations,
        ..run()
    }
}

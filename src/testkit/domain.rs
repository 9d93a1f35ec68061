//! Opportunity builders.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::{Amount, Opportunity, Price};

pub const BUY_VENUE: &str = "alpha";
pub const SELL_VENUE: &str = "beta";
pub const SYMBOL: &str = "BTC/USDT";

/// Fee-free opportunity between [`BUY_VENUE`] and [`SELL_VENUE`].
pub fn opportunity(buy_price: Price, sell_price: Price, investment: Amount) -> Opportunity {
    opportunity_with_fees(
        buy_price,
        sell_price,
        investment,
        Decimal::ZERO,
        Decimal::ZERO,
        Decimal::ZERO,
    )
}

/// Opportunity with explicit fee parameters.
pub fn opportunity_with_fees(
    buy_price: Price,
    sell_price: Price,
    investment: Amount,
    buy_fee_rate: Decimal,
    sell_fee_rate: Decimal,
    withdrawal_fee: Amount,
) -> Opportunity {
    Opportunity::builder()
        .symbol(SYMBOL)
        .buy_venue(BUY_VENUE)
        .sell_venue(SELL_VENUE)
        .buy_price(buy_price)
        .sell_price(sell_price)
        .investment(investment)
        .fees(buy_fee_rate, sell_fee_rate, withdrawal_fee)
        .build()
        .expect("test opportunity is valid")
}

/// 100 → 104 with no fees; clears every default threshold.
pub fn profitable() -> Opportunity {
    opportunity(dec!(100), dec!(104), dec!(100))
}

/// 100 → 100.02 at 0.1% per side plus a withdrawal fee of 1. Fees
/// outweigh the gap by roughly one unit of quote.
pub fn thin_spread() -> Opportunity {
    opportunity_with_fees(
        dec!(100),
        dec!(100.02),
        dec!(100),
        dec!(0.001),
        dec!(0.001),
        dec!(1),
    )
}

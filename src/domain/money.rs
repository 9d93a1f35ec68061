//! Monetary types and fee arithmetic.
//!
//! All money is denominated in the quote currency of the traded symbol.
//! Fee and slippage parameters are fractional rates (0.001 = 0.1%).

use rust_decimal::{Decimal, RoundingStrategy};

/// Price represented as a Decimal for precision.
pub type Price = Decimal;

/// Quote-currency amount.
pub type Amount = Decimal;

/// Base-asset quantity.
pub type Quantity = Decimal;

/// Fractional rate (0.001 = 0.1%).
pub type Rate = Decimal;

/// Decimal places kept on computed base quantities.
pub const QUANTITY_SCALE: u32 = 8;

/// `value × pct / 100`.
#[must_use]
pub fn percent_of(value: Decimal, pct: Decimal) -> Decimal {
    value * pct / Decimal::ONE_HUNDRED
}

/// Round a base quantity down so orders never exceed available funds.
#[must_use]
pub fn floor_quantity(quantity: Quantity) -> Quantity {
    quantity.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::ToZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn percent_of_scales_by_hundred() {
        assert_eq!(percent_of(dec!(200), dec!(5)), dec!(10));
        assert_eq!(percent_of(dec!(100), dec!(0.5)), dec!(0.5));
    }

    #[test]
    fn floor_quantity_truncates_toward_zero() {
        assert_eq!(floor_quantity(dec!(0.123456789)), dec!(0.12345678));
    }
}

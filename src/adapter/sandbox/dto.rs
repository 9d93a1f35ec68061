//! Wire types for the paper-trading endpoint.
//!
//! Optional fields default so that a terse sandbox response still parses.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::port::OrderSide;

#[derive(Debug, Clone, Deserialize)]
pub struct PriceResponse {
    pub bid: Decimal,
    pub ask: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    #[serde(alias = "free")]
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest<'a> {
    pub venue: &'a str,
    pub symbol: &'a str,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    /// Quote to spend for buys, base quantity for sells.
    pub amount: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    pub filled_amount: Decimal,
    pub avg_price: Decimal,
    #[serde(default)]
    pub fee: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalRequest<'a> {
    pub venue: &'a str,
    pub currency: &'a str,
    pub amount: Decimal,
    pub destination: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawalResponse {
    #[serde(default)]
    pub fee: Decimal,
}

/// Error body returned with a non-2xx status.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ErrorResponse {
    pub error: Option<String>,
    pub message: Option<String>,
    pub required: Option<Decimal>,
    pub available: Option<Decimal>,
}

impl ErrorResponse {
    /// Best human-readable text in the body.
    #[must_use]
    pub fn text(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "no detail".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_response_accepts_numbers_and_strings() {
        let fill: OrderResponse =
            serde_json::from_str(r#"{"filled_amount": 0.5, "avg_price": "101.25"}"#).unwrap();
        assert_eq!(fill.filled_amount, dec!(0.5));
        assert_eq!(fill.avg_price, dec!(101.25));
        assert_eq!(fill.fee, Decimal::ZERO);
    }

    #[test]
    fn balance_accepts_free_alias() {
        let balance: BalanceResponse = serde_json::from_str(r#"{"free": "250"}"#).unwrap();
        assert_eq!(balance.balance, dec!(250));
    }

    #[test]
    fn order_request_serializes_side_lowercase() {
        let request = OrderRequest {
            venue: "a",
            symbol: "BTC/USDT",
            side: OrderSide::Buy,
            order_type: "market",
            amount: dec!(100),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["side"], "buy");
        assert_eq!(json["type"], "market");
    }

    #[test]
    fn error_body_prefers_message() {
        let body: ErrorResponse =
            serde_json::from_str(r#"{"error": "insufficient_funds", "message": "need more"}"#)
                .unwrap();
        assert_eq!(body.text(), "need more");
        let empty: ErrorResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), "no detail");
    }
}

//! Predictor input and output.
//!
//! The predictor boundary is loosely typed on the wire. `FeatureSnapshot`
//! is what goes in, `DecisionPayload` is what comes back; a payload only
//! becomes a [`Decision`] after validation.

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::Amount;
use super::opportunity::Opportunity;
use crate::error::PredictorError;

/// One feature value: a number or a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
}

/// Ordered feature mapping handed to the predictor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSnapshot(BTreeMap<String, FeatureValue>);

impl FeatureSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the snapshot for an opportunity within the current run.
    #[must_use]
    pub fn from_opportunity(opportunity: &Opportunity, balance: Amount, active: usize) -> Self {
        let mut features = Self::new();
        features.insert_text("symbol", opportunity.symbol().as_str());
        features.insert_text("buy_venue", opportunity.buy_venue().as_str());
        features.insert_text("sell_venue", opportunity.sell_venue().as_str());
        features.insert_decimal("buy_price", opportunity.buy_price());
        features.insert_decimal("sell_price", opportunity.sell_price());
        features.insert_decimal("spread_pct", opportunity.spread_pct());
        features.insert_decimal("investment", opportunity.investment());
        features.insert_decimal("buy_fee_rate", opportunity.buy_fee_rate());
        features.insert_decimal("sell_fee_rate", opportunity.sell_fee_rate());
        features.insert_decimal("withdrawal_fee", opportunity.withdrawal_fee());
        features.insert_decimal("estimated_profit", opportunity.estimated_profit());
        features.insert_decimal("estimated_profit_pct", opportunity.estimated_profit_pct());
        features.insert_decimal("balance", balance);
        features.insert_number("active_operations", active as f64);
        features.insert_number(
            "hour_of_day",
            f64::from(chrono::Timelike::hour(&opportunity.detected_at())),
        );
        features
    }

    pub fn insert_number(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), FeatureValue::Number(value));
    }

    pub fn insert_decimal(&mut self, name: impl Into<String>, value: Decimal) {
        self.insert_number(name, value.to_f64().unwrap_or(0.0));
    }

    pub fn insert_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), FeatureValue::Text(value.into()));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.0.get(name)
    }

    /// Numeric feature as a Decimal, if present and numeric.
    #[must_use]
    pub fn decimal(&self, name: &str) -> Option<Decimal> {
        match self.0.get(name)? {
            FeatureValue::Number(n) => Decimal::try_from(*n).ok(),
            FeatureValue::Text(_) => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Validated predictor output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    should_execute: bool,
    confidence: f64,
    predicted_profit: Amount,
    success_probability: f64,
    risk_probability: f64,
    reason: String,
}

impl Decision {
    /// Build a decision, clamping probabilities into `[0, 1]`.
    pub fn new(
        should_execute: bool,
        confidence: f64,
        predicted_profit: Amount,
        success_probability: f64,
        risk_probability: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            should_execute,
            confidence: clamp_probability(confidence),
            predicted_profit,
            success_probability: clamp_probability(success_probability),
            risk_probability: clamp_probability(risk_probability),
            reason: reason.into(),
        }
    }

    /// Conservative "do not execute" response.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self::new(false, 0.0, Decimal::ZERO, 0.0, 1.0, reason)
    }

    pub fn should_execute(&self) -> bool {
        self.should_execute
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn predicted_profit(&self) -> Amount {
        self.predicted_profit
    }

    pub fn success_probability(&self) -> f64 {
        self.success_probability
    }

    pub fn risk_probability(&self) -> f64 {
        self.risk_probability
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Wire schema for a predictor response. Missing keys take conservative
/// defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DecisionPayload {
    pub should_execute: bool,
    pub confidence: Option<f64>,
    pub predicted_profit: Option<Decimal>,
    pub success_probability: Option<f64>,
    pub risk_probability: Option<f64>,
    pub reason: Option<String>,
}

impl TryFrom<DecisionPayload> for Decision {
    type Error = PredictorError;

    fn try_from(payload: DecisionPayload) -> Result<Self, Self::Error> {
        for (field, value) in [
            ("confidence", payload.confidence),
            ("success_probability", payload.success_probability),
            ("risk_probability", payload.risk_probability),
        ] {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    return Err(PredictorError::InvalidPayload(format!(
                        "{field} out of range: {v}"
                    )));
                }
            }
        }

        Ok(Decision::new(
            payload.should_execute,
            payload.confidence.unwrap_or(0.0),
            payload.predicted_profit.unwrap_or(Decimal::ZERO),
            payload.success_probability.unwrap_or(0.0),
            payload.risk_probability.unwrap_or(1.0),
            payload.reason.unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_payload_declines() {
        let payload: DecisionPayload = serde_json::from_str("{}").unwrap();
        let decision = Decision::try_from(payload).unwrap();
        assert!(!decision.should_execute());
        assert_eq!(decision.confidence(), 0.0);
        assert_eq!(decision.risk_probability(), 1.0);
    }

    #[test]
    fn payload_with_out_of_range_confidence_is_rejected() {
        let payload: DecisionPayload =
            serde_json::from_str(r#"{"should_execute": true, "confidence": 1.5}"#).unwrap();
        assert!(matches!(
            Decision::try_from(payload),
            Err(PredictorError::InvalidPayload(_))
        ));
    }

    #[test]
    fn full_payload_round_trips_values() {
        let payload: DecisionPayload = serde_json::from_str(
            r#"{"should_execute": true, "confidence": 0.8, "predicted_profit": "2.5",
                "success_probability": 0.7, "risk_probability": 0.1, "reason": "wide gap"}"#,
        )
        .unwrap();
        let decision = Decision::try_from(payload).unwrap();
        assert!(decision.should_execute());
        assert_eq!(decision.predicted_profit(), dec!(2.5));
        assert_eq!(decision.reason(), "wide gap");
    }

    #[test]
    fn new_clamps_probabilities() {
        let decision = Decision::new(true, 3.0, dec!(1), -1.0, f64::NAN, "x");
        assert_eq!(decision.confidence(), 1.0);
        assert_eq!(decision.success_probability(), 0.0);
        assert_eq!(decision.risk_probability(), 0.0);
    }

    #[test]
    fn snapshot_carries_opportunity_features() {
        let opp = Opportunity::builder()
            .symbol("BTC/USDT")
            .buy_venue("a")
            .sell_venue("b")
            .buy_price(dec!(100))
            .sell_price(dec!(105))
            .investment(dec!(100))
            .build()
            .unwrap();
        let features = FeatureSnapshot::from_opportunity(&opp, dec!(1000), 2);
        assert_eq!(features.decimal("estimated_profit"), Some(dec!(5)));
        assert_eq!(features.decimal("active_operations"), Some(dec!(2)));
        assert_eq!(
            features.get("symbol"),
            Some(&FeatureValue::Text("BTC/USDT".into()))
        );
    }
}

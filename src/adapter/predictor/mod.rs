//! Rule-based predictor.
//!
//! Scores an opportunity from its spread and passes the fee-adjusted
//! estimate through as the predicted profit. It never declines on profit:
//! the policy engine owns the stop-loss and minimum-profit gates. Missing
//! features yield a declining, degraded decision rather than an error.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::trace;

use crate::domain::{Decision, FeatureSnapshot};
use crate::error::PredictorError;
use crate::port::Predictor;

#[derive(Debug, Clone)]
pub struct SpreadPredictor {
    /// Spread (percent) at which confidence saturates.
    full_confidence_spread_pct: Decimal,
}

impl Default for SpreadPredictor {
    fn default() -> Self {
        Self::new(dec!(2))
    }
}

impl SpreadPredictor {
    #[must_use]
    pub fn new(full_confidence_spread_pct: Decimal) -> Self {
        Self {
            full_confidence_spread_pct: full_confidence_spread_pct.max(dec!(0.0001)),
        }
    }

    fn confidence(&self, spread_pct: Decimal) -> f64 {
        (spread_pct / self.full_confidence_spread_pct)
            .to_f64()
            .unwrap_or(0.0)
            .clamp(0.0, 1.0)
    }
}

#[async_trait]
impl Predictor for SpreadPredictor {
    async fn predict(&self, features: &FeatureSnapshot) -> Result<Decision, PredictorError> {
        let (Some(spread_pct), Some(estimated_profit)) = (
            features.decimal("spread_pct"),
            features.decimal("estimated_profit"),
        ) else {
            return Ok(Decision::degraded("missing spread features"));
        };

        let confidence = self.confidence(spread_pct);
        let decision = Decision::new(
            true,
            confidence,
            estimated_profit,
            confidence,
            1.0 - confidence,
            format!("spread {spread_pct}%, estimated {estimated_profit}"),
        );
        trace!(
            confidence,
            predicted_profit = %estimated_profit,
            "Spread prediction"
        );
        Ok(decision)
    }

    fn name(&self) -> &'static str {
        "spread"
    }
}

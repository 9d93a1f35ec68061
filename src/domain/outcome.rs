//! Terminal outcome codes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome recorded on every terminal transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeCode {
    /// All legs ran and the realized profit cleared the floor.
    Executed,
    /// All legs ran but fills/fees pushed realized profit below the floor.
    ExecutedMarginal,
    RejectedByPredictor,
    /// Predicted profit breached the per-operation stop-loss.
    RejectedSl,
    /// Predicted profit met take-profit; re-pricing was skipped.
    AcceptedTpShortcircuit,
    RejectedBelowMinProfit,
    /// Re-quoted exit breached the stop-loss; the sale was skipped.
    AbortedRepriceSl,
    /// Re-quoted exit fell below the floor; the sale was skipped.
    AbortedRepriceUnprofitable,
    FailedGateway,
    FailedDrainTimeout,
}

impl OutcomeCode {
    pub const ALL: [OutcomeCode; 10] = [
        Self::Executed,
        Self::ExecutedMarginal,
        Self::RejectedByPredictor,
        Self::RejectedSl,
        Self::AcceptedTpShortcircuit,
        Self::RejectedBelowMinProfit,
        Self::AbortedRepriceSl,
        Self::AbortedRepriceUnprofitable,
        Self::FailedGateway,
        Self::FailedDrainTimeout,
    ];

    /// Stable wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Executed => "EXECUTED",
            Self::ExecutedMarginal => "EXECUTED_MARGINAL",
            Self::RejectedByPredictor => "REJECTED_BY_PREDICTOR",
            Self::RejectedSl => "REJECTED_SL",
            Self::AcceptedTpShortcircuit => "ACCEPTED_TP_SHORTCIRCUIT",
            Self::RejectedBelowMinProfit => "REJECTED_BELOW_MIN_PROFIT",
            Self::AbortedRepriceSl => "ABORTED_REPRICE_SL",
            Self::AbortedRepriceUnprofitable => "ABORTED_REPRICE_UNPROFITABLE",
            Self::FailedGateway => "FAILED_GATEWAY",
            Self::FailedDrainTimeout => "FAILED_DRAIN_TIMEOUT",
        }
    }

    /// Parse a wire name back into a code.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_str() == s)
    }

    /// True for codes that end in a completed sale.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(
            self,
            Self::Executed | Self::ExecutedMarginal | Self::AcceptedTpShortcircuit
        )
    }

    /// True for pre-execution policy rejections (no leg ran).
    #[must_use]
    pub const fn is_rejection(self) -> bool {
        matches!(
            self,
            Self::RejectedByPredictor | Self::RejectedSl | Self::RejectedBelowMinProfit
        )
    }
}

impl fmt::Display for OutcomeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

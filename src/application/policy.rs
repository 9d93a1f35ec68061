//! Investment sizing and profit/loss gates.
//!
//! Every mode goes through the same gates in the same order, so a given
//! decision is accepted or rejected identically in simulation and live.

use std::sync::atomic::{AtomicBool, Ordering};

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::config::{InvestmentMode, RunConfig};
use crate::domain::{percent_of, Amount, Decision, Opportunity, OutcomeCode};
use crate::error::ProcessError;

/// Share of the balance a single operation may commit.
const MAX_BALANCE_SHARE: Decimal = Decimal::from_parts(9, 0, 0, false, 1); // 0.9

/// Limits the policy engine enforces for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyLimits {
    pub investment_mode: InvestmentMode,
    pub investment_amount: Decimal,
    pub min_investment: Amount,
    pub stop_loss_pct: Decimal,
    pub global_stop_loss_pct: Decimal,
    pub take_profit_pct: Option<Decimal>,
    pub min_profit_floor: Amount,
}

impl From<&RunConfig> for PolicyLimits {
    fn from(config: &RunConfig) -> Self {
        Self {
            investment_mode: config.investment.mode,
            investment_amount: config.investment.amount,
            min_investment: config.min_investment,
            stop_loss_pct: config.stop_loss_pct,
            global_stop_loss_pct: config.global_stop_loss_pct,
            take_profit_pct: config.take_profit_pct,
            min_profit_floor: config.min_profit_floor,
        }
    }
}

/// Verdict of the pre-execution gates.
#[derive(Debug, Clone, PartialEq)]
pub enum PreCheck {
    /// Run the legs. With `take_profit_shortcut` the sale skips re-pricing.
    Execute { take_profit_shortcut: bool },
    /// Stop before any leg runs.
    Reject { outcome: OutcomeCode, reason: String },
}

/// Verdict of the gate applied to the re-quoted exit price.
#[derive(Debug, Clone, PartialEq)]
pub enum PostCheck {
    Proceed,
    /// Skip the sale. Any held asset stays where it is.
    Abort { outcome: OutcomeCode, reason: String },
}

/// Sticky run-wide stop-loss flag.
///
/// Once tripped it stays tripped until [`GlobalStopLoss::reset`], across
/// runs of the same engine.
#[derive(Debug, Default)]
pub struct GlobalStopLoss {
    tripped: AtomicBool,
}

impl GlobalStopLoss {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch the flag. Returns true only for the call that tripped it.
    pub fn trip(&self) -> bool {
        !self.tripped.swap(true, Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        if self.tripped.swap(false, Ordering::SeqCst) {
            info!("Global stop-loss reset");
        }
    }
}

/// Applies sizing and profit/loss gates for one run.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    limits: PolicyLimits,
}

impl PolicyEngine {
    #[must_use]
    pub const fn new(limits: PolicyLimits) -> Self {
        Self { limits }
    }

    #[must_use]
    pub fn limits(&self) -> &PolicyLimits {
        &self.limits
    }

    /// Investment for the next operation given the current balance.
    ///
    /// Never more than 90% of the balance.
    ///
    /// # Errors
    ///
    /// Returns `InvestmentTooSmall` when the sized amount is below the
    /// configured minimum or not positive.
    pub fn size_investment(&self, balance: Amount) -> Result<Amount, ProcessError> {
        self.ensure_minimum(self.sized(balance))
    }

    /// Investment actually committed to `opportunity`: the sized amount,
    /// capped by what the opportunity itself asks for.
    ///
    /// # Errors
    ///
    /// Returns `InvestmentTooSmall` when the committed amount is below the
    /// configured minimum or not positive.
    pub fn size_for(&self, opportunity: &Opportunity, balance: Amount) -> Result<Amount, ProcessError> {
        self.ensure_minimum(opportunity.investment().min(self.sized(balance)))
    }

    fn sized(&self, balance: Amount) -> Amount {
        let raw = match self.limits.investment_mode {
            InvestmentMode::Fixed => self.limits.investment_amount,
            InvestmentMode::Percentage => percent_of(balance, self.limits.investment_amount),
        };
        raw.min(balance * MAX_BALANCE_SHARE)
    }

    fn ensure_minimum(&self, amount: Amount) -> Result<Amount, ProcessError> {
        if amount <= Decimal::ZERO || amount < self.limits.min_investment {
            return Err(ProcessError::InvestmentTooSmall {
                sized: amount,
                minimum: self.limits.min_investment,
            });
        }
        Ok(amount)
    }

    /// True when `profit_loss` breaches the stop-loss for `investment`.
    #[must_use]
    pub fn check_stop_loss(profit_loss: Amount, investment: Amount, stop_loss_pct: Decimal) -> bool {
        profit_loss < -percent_of(investment, stop_loss_pct)
    }

    /// True when take-profit is configured and `profit_loss` reaches it.
    #[must_use]
    pub fn check_take_profit(
        profit_loss: Amount,
        investment: Amount,
        take_profit_pct: Option<Decimal>,
    ) -> bool {
        take_profit_pct.is_some_and(|tp| profit_loss >= percent_of(investment, tp))
    }

    /// True when `balance` fell below the run-wide stop-loss threshold.
    #[must_use]
    pub fn check_global_stop_loss(balance: Amount, initial: Amount, pct: Decimal) -> bool {
        balance < Self::global_stop_loss_threshold(initial, pct)
    }

    #[must_use]
    pub fn global_stop_loss_threshold(initial: Amount, pct: Decimal) -> Amount {
        initial * (Decimal::ONE - pct / Decimal::ONE_HUNDRED)
    }

    #[must_use]
    pub fn is_viable(profit_loss: Amount, floor: Amount) -> bool {
        profit_loss >= floor
    }

    /// Gates applied to the predictor's decision before any leg runs.
    ///
    /// Order: predictor veto, stop-loss, take-profit shortcut, profit floor.
    #[must_use]
    pub fn pre_check(&self, decision: &Decision, investment: Amount) -> PreCheck {
        if !decision.should_execute() {
            return PreCheck::Reject {
                outcome: OutcomeCode::RejectedByPredictor,
                reason: format!("predictor declined: {}", decision.reason()),
            };
        }

        let predicted = decision.predicted_profit();
        if Self::check_stop_loss(predicted, investment, self.limits.stop_loss_pct) {
            return PreCheck::Reject {
                outcome: OutcomeCode::RejectedSl,
                reason: format!(
                    "predicted profit {predicted} breaches stop-loss of {}%",
                    self.limits.stop_loss_pct
                ),
            };
        }
        if Self::check_take_profit(predicted, investment, self.limits.take_profit_pct) {
            return PreCheck::Execute {
                take_profit_shortcut: true,
            };
        }
        if !Self::is_viable(predicted, self.limits.min_profit_floor) {
            return PreCheck::Reject {
                outcome: OutcomeCode::RejectedBelowMinProfit,
                reason: format!(
                    "predicted profit {predicted} below floor {}",
                    self.limits.min_profit_floor
                ),
            };
        }
        PreCheck::Execute {
            take_profit_shortcut: false,
        }
    }

    /// Gates applied to the projected profit at the re-quoted exit price.
    ///
    /// Order: take-profit (proceed), stop-loss, profit floor.
    #[must_use]
    pub fn post_check(&self, projected: Amount, investment: Amount) -> PostCheck {
        if Self::check_take_profit(projected, investment, self.limits.take_profit_pct) {
            return PostCheck::Proceed;
        }
        if Self::check_stop_loss(projected, investment, self.limits.stop_loss_pct) {
            warn!(projected = %projected, "Re-quoted exit breaches stop-loss");
            return PostCheck::Abort {
                outcome: OutcomeCode::AbortedRepriceSl,
                reason: format!(
                    "projected profit {projected} breaches stop-loss of {}%",
                    self.limits.stop_loss_pct
                ),
            };
        }
        if !Self::is_viable(projected, self.limits.min_profit_floor) {
            return PostCheck::Abort {
                outcome: OutcomeCode::AbortedRepriceUnprofitable,
                reason: format!(
                    "projected profit {projected} below floor {}",
                    self.limits.min_profit_floor
                ),
            };
        }
        PostCheck::Proceed
    }

    /// Outcome for a completed sale with realized `profit_loss`.
    #[must_use]
    pub fn completion_outcome(&self, profit_loss: Amount, take_profit_shortcut: bool) -> OutcomeCode {
        if take_profit_shortcut {
            OutcomeCode::AcceptedTpShortcircuit
        } else if Self::is_viable(profit_loss, self.limits.min_profit_floor) {
            OutcomeCode::Executed
        } else {
            OutcomeCode::ExecutedMarginal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn engine() -> PolicyEngine {
        PolicyEngine::new(PolicyLimits::from(&RunConfig::default()))
    }

    fn approve(profit: Decimal) -> Decision {
        Decision::new(true, 0.9, profit, 0.9, 0.1, "test")
    }

    #[test]
    fn fixed_sizing_is_capped_by_balance() {
        let policy = engine();
        assert_eq!(policy.size_investment(dec!(10000)).unwrap(), dec!(100));
        assert_eq!(policy.size_investment(dec!(50)).unwrap(), dec!(45));
    }

    #[test]
    fn percentage_sizing_uses_balance() {
        let mut config = RunConfig::default();
        config.investment.mode = InvestmentMode::Percentage;
        config.investment.amount = dec!(5);
        let policy = PolicyEngine::new(PolicyLimits::from(&config));
        assert_eq!(policy.size_investment(dec!(1000)).unwrap(), dec!(50));
    }

    #[test]
    fn sizing_below_minimum_is_rejected() {
        let policy = engine();
        assert!(matches!(
            policy.size_investment(dec!(5)),
            Err(ProcessError::InvestmentTooSmall { .. })
        ));
        assert!(policy.size_investment(Decimal::ZERO).is_err());
    }

    #[test]
    fn committed_amount_is_checked_against_minimum() {
        let policy = engine();
        let small = crate::testkit::domain::opportunity(dec!(100), dec!(104), dec!(1));
        assert_eq!(
            policy.size_for(&small, dec!(10000)),
            Err(ProcessError::InvestmentTooSmall {
                sized: dec!(1),
                minimum: policy.limits().min_investment,
            })
        );

        let large = crate::testkit::domain::opportunity(dec!(100), dec!(104), dec!(500));
        assert_eq!(policy.size_for(&large, dec!(10000)).unwrap(), dec!(100));
        let modest = crate::testkit::domain::opportunity(dec!(100), dec!(104), dec!(60));
        assert_eq!(policy.size_for(&modest, dec!(10000)).unwrap(), dec!(60));
    }

    #[test]
    fn stop_loss_boundary_is_strict() {
        assert!(!PolicyEngine::check_stop_loss(dec!(-2), dec!(100), dec!(2)));
        assert!(PolicyEngine::check_stop_loss(dec!(-2.01), dec!(100), dec!(2)));
    }

    #[test]
    fn take_profit_needs_configuration() {
        assert!(!PolicyEngine::check_take_profit(dec!(50), dec!(100), None));
        assert!(PolicyEngine::check_take_profit(dec!(5), dec!(100), Some(dec!(5))));
        assert!(!PolicyEngine::check_take_profit(dec!(4.99), dec!(100), Some(dec!(5))));
    }

    #[test]
    fn global_stop_loss_threshold() {
        assert!(!PolicyEngine::check_global_stop_loss(dec!(900), dec!(1000), dec!(10)));
        assert!(PolicyEngine::check_global_stop_loss(dec!(899.99), dec!(1000), dec!(10)));
    }

    #[test]
    fn pre_check_order() {
        let mut config = RunConfig::default();
        config.take_profit_pct = Some(dec!(3));
        let policy = PolicyEngine::new(PolicyLimits::from(&config));

        let declined = Decision::degraded("untrained");
        assert!(matches!(
            policy.pre_check(&declined, dec!(100)),
            PreCheck::Reject { outcome: OutcomeCode::RejectedByPredictor, .. }
        ));
        assert!(matches!(
            policy.pre_check(&approve(dec!(-3)), dec!(100)),
            PreCheck::Reject { outcome: OutcomeCode::RejectedSl, .. }
        ));
        assert_eq!(
            policy.pre_check(&approve(dec!(3)), dec!(100)),
            PreCheck::Execute { take_profit_shortcut: true }
        );
        assert!(matches!(
            policy.pre_check(&approve(dec!(0.01)), dec!(100)),
            PreCheck::Reject { outcome: OutcomeCode::RejectedBelowMinProfit, .. }
        ));
        assert_eq!(
            policy.pre_check(&approve(dec!(1)), dec!(100)),
            PreCheck::Execute { take_profit_shortcut: false }
        );
    }

    #[test]
    fn post_check_order() {
        let policy = engine();
        assert_eq!(policy.post_check(dec!(4), dec!(100)), PostCheck::Proceed);
        assert!(matches!(
            policy.post_check(dec!(-5), dec!(100)),
            PostCheck::Abort { outcome: OutcomeCode::AbortedRepriceSl, .. }
        ));
        assert!(matches!(
            policy.post_check(dec!(-1), dec!(100)),
            PostCheck::Abort { outcome: OutcomeCode::AbortedRepriceUnprofitable, .. }
        ));
    }

    #[test]
    fn completion_outcomes() {
        let policy = engine();
        assert_eq!(policy.completion_outcome(dec!(1), false), OutcomeCode::Executed);
        assert_eq!(policy.completion_outcome(dec!(0.01), false), OutcomeCode::ExecutedMarginal);
        assert_eq!(
            policy.completion_outcome(dec!(0.01), true),
            OutcomeCode::AcceptedTpShortcircuit
        );
    }

    #[test]
    fn latch_is_sticky_until_reset() {
        let latch = GlobalStopLoss::new();
        assert!(latch.trip());
        assert!(!latch.trip());
        assert!(latch.is_tripped());
        latch.reset();
        assert!(!latch.is_tripped());
    }
}

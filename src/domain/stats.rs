//! Aggregate run statistics.

use std::collections::BTreeMap;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::Amount;
use super::outcome::OutcomeCode;
use super::transaction::{Transaction, TransactionState};

/// Counters folded from terminal transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationStats {
    pub total_operations: u64,
    pub successful_operations: u64,
    pub failed_operations: u64,
    /// Subset of `failed_operations` stopped by a pre-execution gate.
    pub rejected_operations: u64,
    /// Sum of positive profit/loss values.
    pub total_profit: Amount,
    /// Sum of the magnitudes of negative profit/loss values.
    pub total_loss: Amount,
    pub initial_balance: Amount,
    pub current_balance: Amount,
    #[serde(default)]
    pub outcomes: BTreeMap<OutcomeCode, u64>,
}

impl OrchestrationStats {
    #[must_use]
    pub fn new(initial_balance: Amount) -> Self {
        Self {
            total_operations: 0,
            successful_operations: 0,
            failed_operations: 0,
            rejected_operations: 0,
            total_profit: Decimal::ZERO,
            total_loss: Decimal::ZERO,
            initial_balance,
            current_balance: initial_balance,
            outcomes: BTreeMap::new(),
        }
    }

    /// Fold one terminal transaction into the counters.
    ///
    /// Returns false (and changes nothing) for a non-terminal transaction.
    pub fn record(&mut self, tx: &Transaction) -> bool {
        if !tx.is_terminal() {
            return false;
        }

        self.total_operations += 1;
        if tx.state() == TransactionState::Completed {
            self.successful_operations += 1;
        } else {
            self.failed_operations += 1;
        }

        if let Some(outcome) = tx.outcome() {
            if outcome.is_rejection() {
                self.rejected_operations += 1;
            }
            *self.outcomes.entry(outcome).or_insert(0) += 1;
        }

        let pl = tx.profit_loss();
        if pl > Decimal::ZERO {
            self.total_profit += pl;
        } else {
            self.total_loss -= pl;
        }
        self.current_balance += pl;
        true
    }

    /// Net profit/loss across all recorded transactions.
    #[must_use]
    pub fn net_profit(&self) -> Amount {
        self.total_profit - self.total_loss
    }

    /// Operations that actually ran legs.
    #[must_use]
    pub fn executed_operations(&self) -> u64 {
        self.total_operations - self.rejected_operations
    }

    /// Derived summary for a run that has lasted `runtime`.
    #[must_use]
    pub fn summary(&self, runtime: Duration) -> RunSummary {
        let total = Decimal::from(self.total_operations);
        let net = self.net_profit();

        let roi_pct = if self.initial_balance > Decimal::ZERO {
            net / self.initial_balance * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };
        let success_rate_pct = if self.total_operations > 0 {
            Decimal::from(self.successful_operations) / total * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };
        let avg_profit_per_operation = if self.total_operations > 0 {
            net / total
        } else {
            Decimal::ZERO
        };
        let avg_profit_per_success = if self.successful_operations > 0 {
            self.total_profit / Decimal::from(self.successful_operations)
        } else {
            Decimal::ZERO
        };
        let avg_loss_per_failure = if self.failed_operations > 0 {
            self.total_loss / Decimal::from(self.failed_operations)
        } else {
            Decimal::ZERO
        };

        RunSummary {
            runtime_secs: runtime.as_secs(),
            total_operations: self.total_operations,
            successful_operations: self.successful_operations,
            failed_operations: self.failed_operations,
            rejected_operations: self.rejected_operations,
            net_profit: net,
            initial_balance: self.initial_balance,
            current_balance: self.current_balance,
            roi_pct: roi_pct.round_dp(4),
            success_rate_pct: success_rate_pct.round_dp(4),
            avg_profit_per_operation: avg_profit_per_operation.round_dp(8),
            avg_profit_per_success: avg_profit_per_success.round_dp(8),
            avg_loss_per_failure: avg_loss_per_failure.round_dp(8),
            outcomes: self.outcomes.clone(),
        }
    }
}

/// Figures derived from [`OrchestrationStats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub runtime_secs: u64,
    pub total_operations: u64,
    pub successful_operations: u64,
    pub failed_operations: u64,
    pub rejected_operations: u64,
    pub net_profit: Amount,
    pub initial_balance: Amount,
    pub current_balance: Amount,
    pub roi_pct: Decimal,
    pub success_rate_pct: Decimal,
    pub avg_profit_per_operation: Amount,
    pub avg_profit_per_success: Amount,
    pub avg_loss_per_failure: Amount,
    pub outcomes: BTreeMap<OutcomeCode, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Opportunity, TransactionState};
    use rust_decimal_macros::dec;

    fn completed(pl: Decimal) -> Transaction {
        let opp = Opportunity::builder()
            .symbol("BTC/USDT")
            .buy_venue("a")
            .sell_venue("b")
            .buy_price(dec!(100))
            .sell_price(dec!(105))
            .investment(dec!(100))
            .build()
            .unwrap();
        let mut tx = Transaction::new(opp);
        for state in [
            TransactionState::Withdrawing,
            TransactionState::Buying,
            TransactionState::Transferring,
            TransactionState::Selling,
        ] {
            tx.enter(state).unwrap();
        }
        tx.complete(OutcomeCode::Executed, pl).unwrap();
        tx
    }

    fn rejected() -> Transaction {
        let mut tx = completed(dec!(0));
        // fresh pending transaction for a rejection
        tx = Transaction::new(tx.opportunity().clone());
        tx.fail(OutcomeCode::RejectedByPredictor, "declined").unwrap();
        tx
    }

    #[test]
    fn record_counts_and_balances() {
        let mut stats = OrchestrationStats::new(dec!(1000));
        assert!(stats.record(&completed(dec!(4))));
        assert!(stats.record(&completed(dec!(-1.5))));
        assert!(stats.record(&rejected()));

        assert_eq!(stats.total_operations, 3);
        assert_eq!(stats.successful_operations, 2);
        assert_eq!(stats.failed_operations, 1);
        assert_eq!(stats.rejected_operations, 1);
        assert_eq!(
            stats.total_operations,
            stats.successful_operations + stats.failed_operations
        );
        assert_eq!(stats.total_profit, dec!(4));
        assert_eq!(stats.total_loss, dec!(1.5));
        assert_eq!(stats.net_profit(), dec!(2.5));
        assert_eq!(stats.current_balance, dec!(1002.5));
        assert_eq!(stats.outcomes[&OutcomeCode::Executed], 2);
    }

    #[test]
    fn record_ignores_non_terminal() {
        let mut stats = OrchestrationStats::new(dec!(1000));
        let tx = Transaction::new(completed(dec!(1)).opportunity().clone());
        assert!(!stats.record(&tx));
        assert_eq!(stats.total_operations, 0);
    }

    #[test]
    fn summary_derives_rates() {
        let mut stats = OrchestrationStats::new(dec!(1000));
        stats.record(&completed(dec!(10)));
        stats.record(&rejected());

        let summary = stats.summary(Duration::from_secs(90));
        assert_eq!(summary.runtime_secs, 90);
        assert_eq!(summary.roi_pct, dec!(1));
        assert_eq!(summary.success_rate_pct, dec!(50));
        assert_eq!(summary.avg_profit_per_operation, dec!(5));
        assert_eq!(summary.avg_profit_per_success, dec!(10));
        assert_eq!(summary.avg_loss_per_failure, dec!(0));
    }

    #[test]
    fn summary_of_empty_run_is_zeroed() {
        let stats = OrchestrationStats::new(dec!(0));
        let summary = stats.summary(Duration::ZERO);
        assert_eq!(summary.roi_pct, Decimal::ZERO);
        assert_eq!(summary.success_rate_pct, Decimal::ZERO);
    }

    #[test]
    fn serde_round_trip_preserves_counters() {
        let mut stats = OrchestrationStats::new(dec!(500));
        stats.record(&completed(dec!(2.25)));
        let json = serde_json::to_string(&stats).unwrap();
        let back: OrchestrationStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}

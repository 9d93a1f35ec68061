//! Transaction record and its leg states.
//!
//! A transaction is created when the engine accepts an opportunity and is
//! owned by exactly one worker until it reaches a terminal state. Its
//! state only moves forward along the leg sequence, or jumps to `Failed`.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::decision::Decision;
use super::error::DomainError;
use super::id::{TransactionId, VenueId};
use super::money::{Amount, Price, Quantity, Rate};
use super::opportunity::Opportunity;
use super::outcome::OutcomeCode;

/// Leg states. A non-terminal state names the leg in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    Pending,
    Withdrawing,
    Buying,
    Transferring,
    Selling,
    Completed,
    Failed,
}

impl TransactionState {
    /// Next state in the forward sequence. `None` for terminal states.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Withdrawing),
            Self::Withdrawing => Some(Self::Buying),
            Self::Buying => Some(Self::Transferring),
            Self::Transferring => Some(Self::Selling),
            Self::Selling => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Withdrawing => "WITHDRAWING",
            Self::Buying => "BUYING",
            Self::Transferring => "TRANSFERRING",
            Self::Selling => "SELLING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a transaction's step log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub description: String,
    pub at: DateTime<Utc>,
}

/// Running quote/base balances of one transaction.
///
/// Every figure here comes from executed legs, never from the snapshot,
/// so a partial fill flows through to later legs and to the final P&L.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegLedger {
    /// Quote available at the buy venue after funding.
    pub funded: Amount,
    /// Fee charged while funding the buy venue.
    pub funding_fee: Amount,
    /// Base quantity currently held.
    pub quantity: Quantity,
    /// Venue currently holding `quantity`.
    pub asset_venue: Option<VenueId>,
    /// Average buy fill price.
    pub buy_price: Price,
    /// Quote spent on the buy, fee included.
    pub buy_cost: Amount,
    /// Trading fees paid on buy and sell, in quote.
    pub trading_fees: Amount,
    /// Transfer fee charged in quote.
    pub transfer_fee: Amount,
    /// Re-quoted exit price seen before selling.
    pub exit_quote: Option<Price>,
    /// Quote received from the sale, net of its fee.
    pub proceeds: Amount,
}

impl LegLedger {
    /// Quote left over at the buy venue after the purchase.
    #[must_use]
    pub fn unspent(&self) -> Amount {
        self.funded - self.buy_cost
    }

    /// Quote held once the sale has settled.
    #[must_use]
    pub fn final_quote(&self) -> Amount {
        self.unspent() + self.proceeds - self.transfer_fee
    }

    /// Quote the transaction would hold if the current quantity were sold
    /// at `exit_price` with `sell_fee_rate`.
    #[must_use]
    pub fn projected_final_quote(&self, exit_price: Price, sell_fee_rate: Rate) -> Amount {
        self.unspent() + self.quantity * exit_price * (Decimal::ONE - sell_fee_rate)
            - self.transfer_fee
    }

    /// Quote drawn from the run balance: what reached the buy venue plus
    /// the fee paid to get it there.
    #[must_use]
    pub fn committed(&self) -> Amount {
        self.funded + self.funding_fee
    }

    /// Held quantity valued at the average buy price.
    #[must_use]
    pub fn held_at_cost(&self) -> Amount {
        self.quantity * self.buy_price
    }

    /// Profit/loss of the transaction as it stands. Any quantity still held
    /// counts at cost, whichever way the transaction ends.
    #[must_use]
    pub fn profit_loss(&self) -> Amount {
        self.final_quote() + self.held_at_cost() - self.committed()
    }

    /// Profit/loss if the held quantity were sold at `exit_price`.
    #[must_use]
    pub fn projected_profit_loss(&self, exit_price: Price, sell_fee_rate: Rate) -> Amount {
        self.projected_final_quote(exit_price, sell_fee_rate) - self.committed()
    }
}

/// Asset left at a venue by a transaction that did not finish its sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualPosition {
    pub venue: VenueId,
    pub asset: String,
    pub quantity: Quantity,
    /// Quote paid for the quantity at the average buy price.
    pub cost_basis: Amount,
}

/// One multi-leg arbitrage operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    opportunity: Opportunity,
    decision: Option<Decision>,
    state: TransactionState,
    steps: Vec<StepRecord>,
    ledger: LegLedger,
    profit_loss: Amount,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
    outcome: Option<OutcomeCode>,
    residual: Option<ResidualPosition>,
    take_profit_shortcut: bool,
}

impl Transaction {
    /// Create a pending transaction for an accepted opportunity.
    #[must_use]
    pub fn new(opportunity: Opportunity) -> Self {
        Self {
            id: TransactionId::generate(),
            opportunity,
            decision: None,
            state: TransactionState::Pending,
            steps: Vec::new(),
            ledger: LegLedger::default(),
            profit_loss: Decimal::ZERO,
            started_at: Utc::now(),
            ended_at: None,
            failure_reason: None,
            outcome: None,
            residual: None,
            take_profit_shortcut: false,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn opportunity(&self) -> &Opportunity {
        &self.opportunity
    }

    pub fn decision(&self) -> Option<&Decision> {
        self.decision.as_ref()
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn ledger(&self) -> &LegLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut LegLedger {
        &mut self.ledger
    }

    pub fn profit_loss(&self) -> Amount {
        self.profit_loss
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn outcome(&self) -> Option<OutcomeCode> {
        self.outcome
    }

    pub fn residual(&self) -> Option<&ResidualPosition> {
        self.residual.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Whether re-pricing is skipped because take-profit was met up front.
    pub fn take_profit_shortcut(&self) -> bool {
        self.take_profit_shortcut
    }

    /// Attach the predictor decision. Only the first decision is kept.
    pub fn set_decision(&mut self, decision: Decision) {
        if self.decision.is_none() {
            self.decision = Some(decision);
        }
    }

    pub fn mark_take_profit_shortcut(&mut self) {
        self.take_profit_shortcut = true;
    }

    /// Move to the next leg state.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless `to` is the immediate successor of
    /// the current state and is not terminal.
    pub fn enter(&mut self, to: TransactionState) -> Result<(), DomainError> {
        if to.is_terminal() || self.state.next() != Some(to) {
            return Err(DomainError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    pub fn record_step(&mut self, name: impl Into<String>, description: impl Into<String>) {
        self.steps.push(StepRecord {
            name: name.into(),
            description: description.into(),
            at: Utc::now(),
        });
    }

    /// Finish the sale leg with `profit_loss` from [`LegLedger::profit_loss`].
    /// Quantity the sale did not fill stays behind as a residual position.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the transaction is selling.
    pub fn complete(&mut self, outcome: OutcomeCode, profit_loss: Amount) -> Result<(), DomainError> {
        if self.state != TransactionState::Selling {
            return Err(DomainError::InvalidTransition {
                from: self.state,
                to: TransactionState::Completed,
            });
        }
        self.state = TransactionState::Completed;
        self.outcome = Some(outcome);
        self.profit_loss = profit_loss;
        self.ended_at = Some(Utc::now());
        self.residual = self.held_position();
        self.record_step(
            TransactionState::Completed.as_str(),
            format!("{outcome}: profit/loss {profit_loss}"),
        );
        Ok(())
    }

    /// Jump to `Failed` from any non-terminal state.
    ///
    /// Profit/loss follows [`LegLedger::profit_loss`], so an asset still
    /// held counts at cost, as it does on completion. It is recorded as a
    /// residual position and left for manual reconciliation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the transaction is already terminal.
    pub fn fail(&mut self, outcome: OutcomeCode, reason: impl Into<String>) -> Result<(), DomainError> {
        if self.state.is_terminal() {
            return Err(DomainError::InvalidTransition {
                from: self.state,
                to: TransactionState::Failed,
            });
        }
        let reason = reason.into();
        self.record_step(TransactionState::Failed.as_str(), format!("{outcome}: {reason}"));
        self.state = TransactionState::Failed;
        self.outcome = Some(outcome);
        self.profit_loss = self.ledger.profit_loss();
        self.failure_reason = Some(reason);
        self.ended_at = Some(Utc::now());
        self.residual = self.held_position();
        Ok(())
    }

    fn held_position(&self) -> Option<ResidualPosition> {
        if self.ledger.quantity <= Decimal::ZERO {
            return None;
        }
        let venue = self.ledger.asset_venue.clone()?;
        Some(ResidualPosition {
            venue,
            asset: self.opportunity.symbol().base().to_string(),
            quantity: self.ledger.quantity,
            cost_basis: self.ledger.quantity * self.ledger.buy_price,
        })
    }

    /// Flat summary for status output and notifications.
    #[must_use]
    pub fn view(&self) -> TransactionView {
        TransactionView {
            id: self.id.to_string(),
            symbol: self.opportunity.symbol().to_string(),
            buy_venue: self.opportunity.buy_venue().to_string(),
            sell_venue: self.opportunity.sell_venue().to_string(),
            state: self.state,
            investment: self.opportunity.investment(),
            quantity: self.ledger.quantity,
            profit_loss: self.profit_loss,
            outcome: self.outcome,
            started_at: self.started_at,
            last_step: self.steps.last().map(|s| s.name.clone()),
        }
    }
}

/// Flat, serializable view of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionView {
    pub id: String,
    pub symbol: String,
    pub buy_venue: String,
    pub sell_venue: String,
    pub state: TransactionState,
    pub investment: Amount,
    pub quantity: Quantity,
    pub profit_loss: Amount,
    pub outcome: Option<OutcomeCode>,
    pub started_at: DateTime<Utc>,
    pub last_step: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn transaction() -> Transaction {
        let opp = Opportunity::builder()
            .symbol("BTC/USDT")
            .buy_venue("a")
            .sell_venue("b")
            .buy_price(dec!(100))
            .sell_price(dec!(105))
            .investment(dec!(100))
            .build()
            .unwrap();
        Transaction::new(opp)
    }

    #[test]
    fn states_advance_in_order() {
        let mut tx = transaction();
        for state in [
            TransactionState::Withdrawing,
            TransactionState::Buying,
            TransactionState::Transferring,
            TransactionState::Selling,
        ] {
            tx.enter(state).unwrap();
            assert_eq!(tx.state(), state);
        }
        tx.complete(OutcomeCode::Executed, dec!(4)).unwrap();
        assert_eq!(tx.state(), TransactionState::Completed);
        assert_eq!(tx.profit_loss(), dec!(4));
        assert!(tx.ended_at().is_some());
    }

    #[test]
    fn skipping_a_leg_is_rejected() {
        let mut tx = transaction();
        let err = tx.enter(TransactionState::Buying).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(tx.state(), TransactionState::Pending);
    }

    #[test]
    fn complete_requires_selling() {
        let mut tx = transaction();
        assert!(tx.complete(OutcomeCode::Executed, dec!(1)).is_err());
    }

    #[test]
    fn terminal_states_are_absorbing() {
        let mut tx = transaction();
        tx.fail(OutcomeCode::RejectedByPredictor, "declined").unwrap();
        assert!(tx.fail(OutcomeCode::FailedGateway, "again").is_err());
        assert!(tx.enter(TransactionState::Withdrawing).is_err());
        assert_eq!(tx.outcome(), Some(OutcomeCode::RejectedByPredictor));
        assert_eq!(tx.failure_reason(), Some("declined"));
    }

    #[test]
    fn failure_after_buy_records_residual_and_fee_loss() {
        let mut tx = transaction();
        tx.enter(TransactionState::Withdrawing).unwrap();
        tx.enter(TransactionState::Buying).unwrap();
        {
            let ledger = tx.ledger_mut();
            ledger.funded = dec!(100);
            ledger.quantity = dec!(0.999);
            ledger.buy_price = dec!(100);
            ledger.buy_cost = dec!(100);
            ledger.trading_fees = dec!(0.1);
            ledger.asset_venue = Some(VenueId::from("a"));
        }
        tx.enter(TransactionState::Transferring).unwrap();
        tx.fail(OutcomeCode::FailedGateway, "network error").unwrap();

        assert_eq!(tx.profit_loss(), dec!(-0.1));
        let residual = tx.residual().unwrap();
        assert_eq!(residual.venue, VenueId::from("a"));
        assert_eq!(residual.asset, "BTC");
        assert_eq!(residual.quantity, dec!(0.999));
        assert_eq!(residual.cost_basis, dec!(99.9));
    }

    #[test]
    fn ledger_final_quote_accounts_for_leftovers() {
        let ledger = LegLedger {
            funded: dec!(100),
            buy_cost: dec!(60),
            proceeds: dec!(63),
            transfer_fee: dec!(1),
            ..Default::default()
        };
        assert_eq!(ledger.unspent(), dec!(40));
        assert_eq!(ledger.final_quote(), dec!(102));
        assert_eq!(ledger.profit_loss(), dec!(2));
    }

    #[test]
    fn unsold_quantity_counts_at_cost_on_both_endings() {
        let ledger = LegLedger {
            funded: dec!(100),
            quantity: dec!(0.25),
            asset_venue: Some(VenueId::from("b")),
            buy_price: dec!(100),
            buy_cost: dec!(50),
            proceeds: dec!(26),
            ..Default::default()
        };
        assert_eq!(ledger.held_at_cost(), dec!(25));
        assert_eq!(ledger.profit_loss(), dec!(1));

        let mut completed = transaction();
        let mut failed = transaction();
        for tx in [&mut completed, &mut failed] {
            for state in [
                TransactionState::Withdrawing,
                TransactionState::Buying,
                TransactionState::Transferring,
                TransactionState::Selling,
            ] {
                tx.enter(state).unwrap();
            }
            *tx.ledger_mut() = ledger.clone();
        }
        completed
            .complete(OutcomeCode::ExecutedMarginal, ledger.profit_loss())
            .unwrap();
        failed.fail(OutcomeCode::FailedGateway, "sell rejected").unwrap();

        assert_eq!(completed.profit_loss(), failed.profit_loss());
        assert_eq!(completed.residual(), failed.residual());
        assert_eq!(completed.residual().unwrap().cost_basis, dec!(25));
    }

    #[test]
    fn rejection_before_funding_costs_nothing() {
        let mut tx = transaction();
        tx.fail(OutcomeCode::RejectedBelowMinProfit, "thin").unwrap();
        assert_eq!(tx.profit_loss(), Decimal::ZERO);
        assert!(tx.residual().is_none());
    }

    #[test]
    fn step_log_keeps_order() {
        let mut tx = transaction();
        tx.record_step("a", "first");
        tx.record_step("b", "second");
        let names: Vec<_> = tx.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(tx.steps()[0].at <= tx.steps()[1].at);
    }
}

//! Leg sequencing for one transaction.
//!
//! `PENDING → WITHDRAWING → BUYING → TRANSFERRING → SELLING → COMPLETED`,
//! with `FAILED` reachable from any non-terminal state. Entering a state
//! is published before that leg's call is awaited, so an observer always
//! sees the leg currently in flight.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::application::policy::{PolicyEngine, PostCheck};
use crate::domain::{OutcomeCode, Transaction, TransactionState};
use crate::error::GatewayError;
use crate::port::LegExecutor;

/// Drives transactions through their legs with one run's executor.
#[derive(Clone)]
pub struct TransactionStateMachine {
    executor: Arc<dyn LegExecutor>,
    policy: PolicyEngine,
}

impl TransactionStateMachine {
    #[must_use]
    pub fn new(executor: Arc<dyn LegExecutor>, policy: PolicyEngine) -> Self {
        Self { executor, policy }
    }

    #[must_use]
    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    #[must_use]
    pub fn executor(&self) -> &Arc<dyn LegExecutor> {
        &self.executor
    }

    /// Advance until terminal, calling `observer` after every step.
    pub async fn drive<F>(&self, tx: &mut Transaction, mut observer: F)
    where
        F: FnMut(&Transaction) + Send,
    {
        while !tx.is_terminal() {
            self.advance(tx, &mut observer).await;
            observer(tx);
        }
    }

    /// Perform exactly one leg.
    ///
    /// Leg errors never escape: they move the transaction to `FAILED`
    /// with the typed error in the reason.
    pub async fn advance<F>(&self, tx: &mut Transaction, observer: &mut F)
    where
        F: FnMut(&Transaction) + Send,
    {
        let result = match tx.state() {
            TransactionState::Pending => self.withdraw(tx, observer).await,
            TransactionState::Withdrawing => self.buy(tx, observer).await,
            TransactionState::Buying => self.transfer(tx, observer).await,
            TransactionState::Transferring => self.sell(tx, observer).await,
            TransactionState::Selling => {
                self.finalize(tx);
                Ok(())
            }
            TransactionState::Completed | TransactionState::Failed => Ok(()),
        };

        if let Err(failure) = result {
            warn!(
                tx_id = %tx.id(),
                state = %tx.state(),
                outcome = %failure.outcome,
                reason = %failure.reason,
                "Leg failed"
            );
            fail(tx, failure.outcome, failure.reason);
        }
    }

    /// Settle a transaction whose sale has run.
    ///
    /// Every leg's fees and slippage are already in the ledger; quantity
    /// the sale left unfilled counts at cost.
    pub fn finalize(&self, tx: &mut Transaction) {
        let profit_loss = tx.ledger().profit_loss();
        let outcome = self
            .policy
            .completion_outcome(profit_loss, tx.take_profit_shortcut());
        if let Err(e) = tx.complete(outcome, profit_loss) {
            fail(tx, OutcomeCode::FailedGateway, e.to_string());
            return;
        }
        debug!(tx_id = %tx.id(), outcome = %outcome, profit_loss = %profit_loss, "Transaction settled");
    }

    async fn withdraw<F>(&self, tx: &mut Transaction, observer: &mut F) -> Result<(), LegFailure>
    where
        F: FnMut(&Transaction) + Send,
    {
        let amount = tx.opportunity().investment();
        let description = format!("funding {amount} at {}", tx.opportunity().buy_venue());
        enter(tx, TransactionState::Withdrawing, description, observer)?;

        let funding = self
            .executor
            .fund(tx.opportunity(), amount)
            .await
            .map_err(|e| LegFailure::gateway("withdraw", &e))?;
        if funding.available <= Decimal::ZERO {
            return Err(LegFailure::gateway_reason("withdraw", "no funds made available"));
        }

        let ledger = tx.ledger_mut();
        ledger.funded = funding.available;
        ledger.funding_fee += funding.fee;
        tx.record_step(
            "funded",
            format!("available {} (fee {})", funding.available, funding.fee),
        );
        Ok(())
    }

    async fn buy<F>(&self, tx: &mut Transaction, observer: &mut F) -> Result<(), LegFailure>
    where
        F: FnMut(&Transaction) + Send,
    {
        let description = format!("buying at {}", tx.opportunity().buy_venue());
        enter(tx, TransactionState::Buying, description, observer)?;

        let ask = self
            .executor
            .quote_entry(tx.opportunity())
            .await
            .map_err(|e| LegFailure::gateway("buy", &e))?;
        if ask <= Decimal::ZERO {
            return Err(LegFailure::invalid_price());
        }

        let budget = tx.ledger().funded;
        let fill = self
            .executor
            .buy(tx.opportunity(), budget)
            .await
            .map_err(|e| LegFailure::gateway("buy", &e))?;
        if fill.quantity <= Decimal::ZERO {
            return Err(LegFailure::gateway_reason("buy", "order was not filled"));
        }

        let buy_venue = tx.opportunity().buy_venue().clone();
        let ledger = tx.ledger_mut();
        ledger.quantity = fill.quantity;
        ledger.asset_venue = Some(buy_venue);
        ledger.buy_price = fill.avg_price;
        ledger.buy_cost = fill.notional() + fill.fee;
        ledger.trading_fees += fill.fee;
        tx.record_step(
            "bought",
            format!(
                "{} @ {} (ask {ask}, fee {})",
                fill.quantity, fill.avg_price, fill.fee
            ),
        );
        Ok(())
    }

    async fn transfer<F>(&self, tx: &mut Transaction, observer: &mut F) -> Result<(), LegFailure>
    where
        F: FnMut(&Transaction) + Send,
    {
        let quantity = tx.ledger().quantity;
        let description = format!(
            "moving {quantity} {} to {}",
            tx.opportunity().symbol().base(),
            tx.opportunity().sell_venue()
        );
        enter(tx, TransactionState::Transferring, description, observer)?;

        let transfer = self
            .executor
            .transfer(tx.opportunity(), quantity)
            .await
            .map_err(|e| LegFailure::gateway("transfer", &e))?;

        let sell_venue = tx.opportunity().sell_venue().clone();
        let ledger = tx.ledger_mut();
        ledger.quantity = transfer.received.max(Decimal::ZERO);
        ledger.asset_venue = Some(sell_venue);
        ledger.transfer_fee += transfer.fee;
        tx.record_step(
            "transferred",
            format!("received {} (fee {})", transfer.received, transfer.fee),
        );

        if transfer.received <= Decimal::ZERO {
            return Err(LegFailure::gateway_reason("transfer", "nothing arrived"));
        }
        Ok(())
    }

    async fn sell<F>(&self, tx: &mut Transaction, observer: &mut F) -> Result<(), LegFailure>
    where
        F: FnMut(&Transaction) + Send,
    {
        let description = format!("selling at {}", tx.opportunity().sell_venue());
        enter(tx, TransactionState::Selling, description, observer)?;

        if !tx.take_profit_shortcut() {
            let exit = self
                .executor
                .quote_exit(tx.opportunity())
                .await
                .map_err(|e| LegFailure::gateway("sell", &e))?;
            if exit <= Decimal::ZERO {
                return Err(LegFailure::invalid_price());
            }

            let investment = tx.opportunity().investment();
            let sell_fee_rate = self.executor.exit_fee_rate(tx.opportunity());
            tx.ledger_mut().exit_quote = Some(exit);
            let projected = tx.ledger().projected_profit_loss(exit, sell_fee_rate);
            tx.record_step("repriced", format!("exit {exit}, projected {projected}"));

            if let PostCheck::Abort { outcome, reason } =
                self.policy.post_check(projected, investment)
            {
                return Err(LegFailure { outcome, reason });
            }
        }

        let quantity = tx.ledger().quantity;
        let fill = self
            .executor
            .sell(tx.opportunity(), quantity)
            .await
            .map_err(|e| LegFailure::gateway("sell", &e))?;

        let ledger = tx.ledger_mut();
        ledger.proceeds += fill.notional() - fill.fee;
        ledger.trading_fees += fill.fee;
        ledger.quantity = (ledger.quantity - fill.quantity).max(Decimal::ZERO);
        tx.record_step(
            "sold",
            format!("{} @ {} (fee {})", fill.quantity, fill.avg_price, fill.fee),
        );
        Ok(())
    }
}

/// Why a leg ended the transaction.
struct LegFailure {
    outcome: OutcomeCode,
    reason: String,
}

impl LegFailure {
    fn gateway(leg: &str, error: &GatewayError) -> Self {
        Self {
            outcome: OutcomeCode::FailedGateway,
            reason: format!("{leg} failed ({}): {error}", error.kind()),
        }
    }

    fn invalid_price() -> Self {
        Self {
            outcome: OutcomeCode::FailedGateway,
            reason: "invalid price".to_string(),
        }
    }

    fn gateway_reason(leg: &str, reason: &str) -> Self {
        Self {
            outcome: OutcomeCode::FailedGateway,
            reason: format!("{leg} failed: {reason}"),
        }
    }
}

fn enter<F>(
    tx: &mut Transaction,
    to: TransactionState,
    description: String,
    observer: &mut F,
) -> Result<(), LegFailure>
where
    F: FnMut(&Transaction) + Send,
{
    tx.enter(to).map_err(|e| LegFailure {
        outcome: OutcomeCode::FailedGateway,
        reason: e.to_string(),
    })?;
    tx.record_step(to.as_str(), description);
    debug!(tx_id = %tx.id(), state = %to, "Leg started");
    observer(tx);
    Ok(())
}

fn fail(tx: &mut Transaction, outcome: OutcomeCode, reason: String) {
    // already terminal means someone else settled it; nothing to do
    let _ = tx.fail(outcome, reason);
}

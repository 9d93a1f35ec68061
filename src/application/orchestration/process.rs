//! Admission, the per-transaction worker and settlement.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{OrchestrationEngine, RunContext};
use crate::application::limiter::ClaimedEntry;
use crate::application::policy::{PolicyEngine, PreCheck};
use crate::domain::{Decision, FeatureSnapshot, Opportunity, OutcomeCode, Transaction, TransactionId};
use crate::error::ProcessError;
use crate::port::notifier::{
    Event, FinishedEvent, GlobalStopLossEvent, ResidualEvent, StatsEvent, StepEvent,
};
use crate::port::{OperationRecord, StateSnapshot};

/// An admitted opportunity whose transaction is already running.
///
/// The transaction runs to a terminal state whether or not this handle is
/// awaited; [`Submitted::wait`] yields that state.
#[must_use = "wait() yields the terminal transaction"]
pub struct Submitted {
    engine: OrchestrationEngine,
    run: Arc<RunContext>,
    id: TransactionId,
    worker: JoinHandle<()>,
    completion: oneshot::Receiver<Transaction>,
}

impl Submitted {
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Wait for the terminal transaction.
    ///
    /// # Errors
    ///
    /// Returns `NotRunning` if the run was torn down without settling it.
    pub async fn wait(self) -> Result<Transaction, ProcessError> {
        if let Err(e) = self.worker.await {
            if e.is_panic() {
                error!(tx_id = %self.id, "Transaction worker panicked");
                self.engine
                    .settle_claimed(&self.run, self.id, OutcomeCode::FailedGateway, "worker panicked")
                    .await;
            }
        }
        self.completion.await.map_err(|_| ProcessError::NotRunning)
    }
}

impl OrchestrationEngine {
    /// Run one opportunity to a terminal transaction.
    ///
    /// Policy rejections come back as FAILED transactions with their
    /// outcome code, not as errors.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessError`] when the opportunity is refused before a
    /// transaction exists: no active run, invalid snapshot, global
    /// stop-loss, run bounds, undersized investment, or no free slot.
    pub async fn process(&self, opportunity: Opportunity) -> Result<Transaction, ProcessError> {
        self.submit(opportunity)?.wait().await
    }

    /// Admit an opportunity and start its transaction without waiting.
    ///
    /// Admission is decided before this returns, so a `stop` issued
    /// afterwards drains the transaction instead of refusing it. Must be
    /// called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Same refusals as [`OrchestrationEngine::process`].
    pub fn submit(&self, opportunity: Opportunity) -> Result<Submitted, ProcessError> {
        let run = self.inner.current_run().ok_or(ProcessError::NotRunning)?;
        opportunity.validate()?;

        if self.inner.global_stop_loss.is_tripped() {
            return Err(ProcessError::GlobalStopLoss);
        }

        let balance = self.inner.stats.lock().current_balance;
        let investment = run.machine.policy().size_for(&opportunity, balance)?;
        let opportunity = opportunity.with_investment(investment);

        run.reserve_operation()?;
        let admission = match run.limiter.submit(opportunity) {
            Ok(admission) => admission,
            Err(e) => {
                run.release_operation();
                debug!(error = %e, "Opportunity not admitted");
                return Err(e);
            }
        };

        let id = admission.transaction.id();
        info!(
            tx_id = %id,
            symbol = %admission.transaction.opportunity().symbol(),
            investment = %investment,
            "Transaction admitted"
        );

        let worker = tokio::spawn(self.clone().run_worker(Arc::clone(&run), admission.transaction));
        run.limiter.attach(id, worker.abort_handle());

        Ok(Submitted {
            engine: self.clone(),
            run,
            id,
            worker,
            completion: admission.completion,
        })
    }

    async fn run_worker(self, run: Arc<RunContext>, mut tx: Transaction) {
        let balance = self.inner.stats.lock().current_balance;
        let features =
            FeatureSnapshot::from_opportunity(tx.opportunity(), balance, run.limiter.active_count());

        let decision = match self.inner.predictor.predict(&features).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(
                    tx_id = %tx.id(),
                    predictor = self.inner.predictor.name(),
                    error = %e,
                    "Predictor failed; declining"
                );
                Decision::degraded(format!("predictor error: {e}"))
            }
        };
        tx.record_step(
            "predicted",
            format!(
                "execute={} predicted_profit={} confidence={:.2}",
                decision.should_execute(),
                decision.predicted_profit(),
                decision.confidence()
            ),
        );
        tx.set_decision(decision.clone());

        let investment = tx.opportunity().investment();
        match run.machine.policy().pre_check(&decision, investment) {
            PreCheck::Reject { outcome, reason } => {
                debug!(tx_id = %tx.id(), outcome = %outcome, reason = %reason, "Rejected before execution");
                let _ = tx.fail(outcome, reason);
            }
            PreCheck::Execute {
                take_profit_shortcut,
            } => {
                if take_profit_shortcut {
                    tx.mark_take_profit_shortcut();
                    tx.record_step("take_profit", "predicted profit meets take-profit");
                }
                run.limiter.publish(&tx);
                let limiter = &run.limiter;
                let inner = &self.inner;
                run.machine
                    .drive(&mut tx, |snapshot| {
                        limiter.publish(snapshot);
                        if let Some(step) = StepEvent::latest(snapshot) {
                            inner.notify(Event::StepChanged(step));
                        }
                    })
                    .await;
            }
        }

        if let Some(claimed) = run.limiter.claim(tx.id()) {
            self.finish(&run, claimed, tx).await;
        }
    }

    /// Fail and settle a transaction whose worker can no longer do it.
    pub(super) async fn settle_claimed(
        &self,
        run: &RunContext,
        id: TransactionId,
        outcome: OutcomeCode,
        reason: &str,
    ) {
        let Some(claimed) = run.limiter.claim(id) else {
            return;
        };
        claimed.abort_worker();
        let mut tx = claimed.snapshot.clone();
        let _ = tx.fail(outcome, reason);
        self.finish(run, claimed, tx).await;
    }

    /// Fold, persist and announce a terminal transaction.
    ///
    /// Only the holder of the claimed entry calls this, so each
    /// transaction is counted once.
    pub(super) async fn finish(&self, run: &RunContext, claimed: ClaimedEntry, tx: Transaction) {
        let (stats, breached) = {
            let mut stats = self.inner.stats.lock();
            stats.record(&tx);
            let breached = PolicyEngine::check_global_stop_loss(
                stats.current_balance,
                stats.initial_balance,
                run.config.global_stop_loss_pct,
            );
            (stats.clone(), breached)
        };

        info!(
            tx_id = %tx.id(),
            state = %tx.state(),
            outcome = ?tx.outcome(),
            profit_loss = %tx.profit_loss(),
            "Transaction finished"
        );

        if breached && self.inner.global_stop_loss.trip() {
            let threshold = PolicyEngine::global_stop_loss_threshold(
                stats.initial_balance,
                run.config.global_stop_loss_pct,
            );
            warn!(balance = %stats.current_balance, threshold = %threshold, "Global stop-loss tripped");
            self.inner
                .notify(Event::GlobalStopLossTripped(GlobalStopLossEvent {
                    balance: stats.current_balance,
                    threshold,
                }));
        }

        let record = OperationRecord::from_transaction(&tx, run.mode);
        if let Err(e) = self.inner.store.save_operation(&record).await {
            warn!(tx_id = %tx.id(), error = %e, "Failed to persist operation");
        }
        let snapshot = StateSnapshot::new(stats.clone(), self.inner.global_stop_loss.is_tripped());
        if let Err(e) = self.inner.store.save_state(&snapshot).await {
            warn!(error = %e, "Failed to persist run state");
        }

        self.inner
            .notify(Event::TransactionFinished(FinishedEvent::from(&tx)));
        if let Some(residual) = ResidualEvent::from_transaction(&tx) {
            warn!(
                tx_id = %tx.id(),
                venue = %residual.venue,
                asset = %residual.asset,
                quantity = %residual.quantity,
                "Residual position left for reconciliation"
            );
            self.inner.notify(Event::ResidualPosition(residual));
        }
        self.inner.notify(Event::StatsUpdated(StatsEvent::from(&stats)));

        claimed.complete(tx);
    }
}

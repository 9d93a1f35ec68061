//! Notifier port for orchestration events.
//!
//! Notifications are best-effort. A notifier that fails must swallow the
//! failure; nothing it does can affect an operation's outcome.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{
    ExecutionMode, OrchestrationStats, OutcomeCode, RunSummary, Transaction, TransactionState,
};

/// Events emitted by the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A transaction entered a new leg or recorded a step.
    StepChanged(StepEvent),
    /// A transaction reached a terminal state.
    TransactionFinished(FinishedEvent),
    /// Aggregate counters changed.
    StatsUpdated(StatsEvent),
    RunStarted(RunStartedEvent),
    /// Admission closed; in-flight work is draining.
    RunStopping(RunStoppingEvent),
    RunStopped(RunSummary),
    /// Balance fell below the run-wide stop-loss. Sticky until reset.
    GlobalStopLossTripped(GlobalStopLossEvent),
    /// A transaction ended holding an asset it did not sell.
    ResidualPosition(ResidualEvent),
}

impl Event {
    /// Short label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StepChanged(_) => "step_changed",
            Self::TransactionFinished(_) => "transaction_finished",
            Self::StatsUpdated(_) => "stats_updated",
            Self::RunStarted(_) => "run_started",
            Self::RunStopping(_) => "run_stopping",
            Self::RunStopped(_) => "run_stopped",
            Self::GlobalStopLossTripped(_) => "global_stop_loss_tripped",
            Self::ResidualPosition(_) => "residual_position",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepEvent {
    pub tx_id: String,
    pub symbol: String,
    pub state: TransactionState,
    pub step: String,
    pub description: String,
    pub at: DateTime<Utc>,
}

impl StepEvent {
    /// Event for the most recent step of `tx`, if it has one.
    #[must_use]
    pub fn latest(tx: &Transaction) -> Option<Self> {
        let step = tx.steps().last()?;
        Some(Self {
            tx_id: tx.id().to_string(),
            symbol: tx.opportunity().symbol().to_string(),
            state: tx.state(),
            step: step.name.clone(),
            description: step.description.clone(),
            at: step.at,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FinishedEvent {
    pub tx_id: String,
    pub symbol: String,
    pub buy_venue: String,
    pub sell_venue: String,
    pub state: TransactionState,
    pub outcome: Option<OutcomeCode>,
    pub investment: Decimal,
    pub profit_loss: Decimal,
    pub reason: Option<String>,
}

impl From<&Transaction> for FinishedEvent {
    fn from(tx: &Transaction) -> Self {
        let opp = tx.opportunity();
        Self {
            tx_id: tx.id().to_string(),
            symbol: opp.symbol().to_string(),
            buy_venue: opp.buy_venue().to_string(),
            sell_venue: opp.sell_venue().to_string(),
            state: tx.state(),
            outcome: tx.outcome(),
            investment: opp.investment(),
            profit_loss: tx.profit_loss(),
            reason: tx.failure_reason().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsEvent {
    pub total_operations: u64,
    pub successful_operations: u64,
    pub failed_operations: u64,
    pub rejected_operations: u64,
    pub net_profit: Decimal,
    pub current_balance: Decimal,
}

impl From<&OrchestrationStats> for StatsEvent {
    fn from(stats: &OrchestrationStats) -> Self {
        Self {
            total_operations: stats.total_operations,
            successful_operations: stats.successful_operations,
            failed_operations: stats.failed_operations,
            rejected_operations: stats.rejected_operations,
            net_profit: stats.net_profit(),
            current_balance: stats.current_balance,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStartedEvent {
    pub mode: ExecutionMode,
    pub balance: Decimal,
    pub max_concurrent_operations: usize,
    /// True when counters were restored from persisted state.
    pub resumed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStoppingEvent {
    pub force: bool,
    pub active_operations: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GlobalStopLossEvent {
    pub balance: Decimal,
    pub threshold: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResidualEvent {
    pub tx_id: String,
    pub venue: String,
    pub asset: String,
    pub quantity: Decimal,
    pub cost_basis: Decimal,
}

impl ResidualEvent {
    #[must_use]
    pub fn from_transaction(tx: &Transaction) -> Option<Self> {
        let residual = tx.residual()?;
        Some(Self {
            tx_id: tx.id().to_string(),
            venue: residual.venue.to_string(),
            asset: residual.asset.clone(),
            quantity: residual.quantity,
            cost_basis: residual.cost_basis,
        })
    }
}

/// Receives engine events.
///
/// `notify` must return quickly; implementations doing slow I/O should
/// spawn a task.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: Event);
}

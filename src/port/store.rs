//! Persistence port for finished operations and run state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{ExecutionMode, OrchestrationStats, OutcomeCode, Transaction};
use crate::error::Result;

/// One row per terminal transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: String,
    pub symbol: String,
    pub buy_venue: String,
    pub sell_venue: String,
    pub mode: ExecutionMode,
    pub state: String,
    pub outcome: Option<OutcomeCode>,
    pub investment: Decimal,
    pub profit_loss: Decimal,
    pub failure_reason: Option<String>,
    /// Step log and ledger, serialized.
    pub detail: serde_json::Value,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl OperationRecord {
    /// Flatten a terminal transaction for storage.
    #[must_use]
    pub fn from_transaction(tx: &Transaction, mode: ExecutionMode) -> Self {
        let opp = tx.opportunity();
        let detail = serde_json::json!({
            "steps": tx.steps(),
            "ledger": tx.ledger(),
            "decision": tx.decision(),
            "residual": tx.residual(),
        });
        Self {
            id: tx.id().to_string(),
            symbol: opp.symbol().to_string(),
            buy_venue: opp.buy_venue().to_string(),
            sell_venue: opp.sell_venue().to_string(),
            mode,
            state: tx.state().to_string(),
            outcome: tx.outcome(),
            investment: opp.investment(),
            profit_loss: tx.profit_loss(),
            failure_reason: tx.failure_reason().map(str::to_string),
            detail,
            started_at: tx.started_at(),
            ended_at: tx.ended_at(),
        }
    }
}

/// Resumable run state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub stats: OrchestrationStats,
    #[serde(default)]
    pub global_stop_loss_tripped: bool,
    pub saved_at: DateTime<Utc>,
}

impl StateSnapshot {
    #[must_use]
    pub fn new(stats: OrchestrationStats, global_stop_loss_tripped: bool) -> Self {
        Self {
            stats,
            global_stop_loss_tripped,
            saved_at: Utc::now(),
        }
    }
}

/// Storage for operations and run state.
///
/// The engine logs and ignores store failures.
#[async_trait]
pub trait Store: Send + Sync {
    /// Append a finished operation, replacing a record with the same id.
    async fn save_operation(&self, record: &OperationRecord) -> Result<()>;

    /// Latest saved run state, if any.
    async fn load_state(&self) -> Result<Option<StateSnapshot>>;

    /// Replace the saved run state.
    async fn save_state(&self, snapshot: &StateSnapshot) -> Result<()>;
}

use std::sync::atomic::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::OrchestrationEngine;
use crate::domain::{ExecutionMode, OrchestrationStats, TransactionView};

/// Point-in-time view of the engine.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub running: bool,
    pub mode: Option<ExecutionMode>,
    pub started_at: Option<DateTime<Utc>>,
    pub stats: OrchestrationStats,
    pub active: Vec<TransactionView>,
    pub global_stop_loss_tripped: bool,
}

impl OrchestrationEngine {
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        let run = self.inner.current_run();
        EngineStatus {
            running: run
                .as_ref()
                .is_some_and(|r| !r.stopping.load(Ordering::SeqCst)),
            mode: run.as_ref().map(|r| r.mode),
            started_at: run.as_ref().map(|r| r.started_at),
            stats: self.inner.stats.lock().clone(),
            active: run.as_ref().map(|r| r.limiter.views()).unwrap_or_default(),
            global_stop_loss_tripped: self.inner.global_stop_loss.is_tripped(),
        }
    }
}

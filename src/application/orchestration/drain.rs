//! Graceful and forced shutdown.

use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use super::OrchestrationEngine;
use crate::domain::{OutcomeCode, RunSummary, TransactionId};
use crate::port::notifier::{Event, RunStoppingEvent};
use crate::port::StateSnapshot;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// What a stop did.
#[derive(Debug, Clone)]
pub struct StopReport {
    /// Transactions in flight when admission closed.
    pub in_flight_at_stop: usize,
    /// Transactions failed because the grace period ran out (or the stop
    /// was forced).
    pub terminated: Vec<TransactionId>,
    pub summary: RunSummary,
}

impl OrchestrationEngine {
    /// Stop the current run.
    ///
    /// Admission closes at once. Without `force`, in-flight transactions
    /// get the configured drain timeout to finish; whatever is left is
    /// failed with `FAILED_DRAIN_TIMEOUT`. With `force`, every in-flight
    /// transaction is failed immediately. Terminated workers make no
    /// further calls and any asset they hold is left where it is.
    ///
    /// Returns `None` when no run is active or a stop is already underway.
    pub async fn stop(&self, force: bool) -> Option<StopReport> {
        let run = self.inner.current_run()?;
        if run.stopping.swap(true, Ordering::SeqCst) {
            return None;
        }

        run.limiter.close();
        let in_flight_at_stop = run.limiter.active_count();
        info!(force, in_flight = in_flight_at_stop, "Stopping orchestration run");
        self.inner.notify(Event::RunStopping(RunStoppingEvent {
            force,
            active_operations: in_flight_at_stop,
        }));

        let reason = if force {
            "forced stop"
        } else {
            let deadline = Instant::now() + run.config.drain_timeout();
            while run.limiter.active_count() > 0 && Instant::now() < deadline {
                sleep(DRAIN_POLL_INTERVAL).await;
            }
            "drain timeout"
        };

        let mut terminated = Vec::new();
        for claimed in run.limiter.cancel_all() {
            claimed.abort_worker();
            let mut tx = claimed.snapshot.clone();
            let _ = tx.fail(OutcomeCode::FailedDrainTimeout, reason);
            warn!(tx_id = %tx.id(), state = %claimed.snapshot.state(), reason, "Transaction terminated");
            terminated.push(tx.id());
            self.finish(&run, claimed, tx).await;
        }

        let runtime = run.started.elapsed();
        *self.inner.last_runtime.lock() = runtime;

        let (stats, summary) = {
            let stats = self.inner.stats.lock();
            (stats.clone(), stats.summary(runtime))
        };
        let snapshot = StateSnapshot::new(stats, self.inner.global_stop_loss.is_tripped());
        if let Err(e) = self.inner.store.save_state(&snapshot).await {
            warn!(error = %e, "Failed to persist run state on stop");
        }

        *self.inner.run.write() = None;

        info!(
            terminated = terminated.len(),
            total = summary.total_operations,
            net_profit = %summary.net_profit,
            "Orchestration run stopped"
        );
        self.inner.notify(Event::RunStopped(summary.clone()));

        Some(StopReport {
            in_flight_at_stop,
            terminated,
            summary,
        })
    }
}

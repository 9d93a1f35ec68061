//! Notification adapters.
//!
//! Implements the `port::Notifier` trait for the built-in backends.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, info, warn};

use crate::port::{Event, Notifier};

/// Fans each event out to every registered notifier.
///
/// A notifier that panics is logged and skipped; the others still run.
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    /// Register a notifier.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.register(notifier);
        self
    }

    /// Notify all registered notifiers.
    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            let event = event.clone();
            let kind = event.kind();
            if catch_unwind(AssertUnwindSafe(|| notifier.notify(event))).is_err() {
                warn!(event = kind, "Notifier panicked; event dropped");
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A no-op notifier for when notifications are disabled.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

/// Logs events via tracing.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        match event {
            Event::StepChanged(e) => {
                debug!(
                    tx_id = %e.tx_id,
                    state = %e.state,
                    step = %e.step,
                    description = %e.description,
                    "Step changed"
                );
            }
            Event::TransactionFinished(e) => {
                info!(
                    tx_id = %e.tx_id,
                    symbol = %e.symbol,
                    state = %e.state,
                    outcome = ?e.outcome,
                    profit_loss = %e.profit_loss,
                    reason = ?e.reason,
                    "Transaction finished"
                );
            }
            Event::StatsUpdated(e) => {
                debug!(
                    total = e.total_operations,
                    successful = e.successful_operations,
                    failed = e.failed_operations,
                    net_profit = %e.net_profit,
                    balance = %e.current_balance,
                    "Stats updated"
                );
            }
            Event::RunStarted(e) => {
                info!(
                    mode = %e.mode,
                    balance = %e.balance,
                    max_concurrent = e.max_concurrent_operations,
                    resumed = e.resumed,
                    "Run started"
                );
            }
            Event::RunStopping(e) => {
                info!(force = e.force, active = e.active_operations, "Run stopping");
            }
            Event::RunStopped(summary) => {
                info!(
                    runtime_secs = summary.runtime_secs,
                    total = summary.total_operations,
                    net_profit = %summary.net_profit,
                    roi_pct = %summary.roi_pct,
                    "Run stopped"
                );
            }
            Event::GlobalStopLossTripped(e) => {
                warn!(balance = %e.balance, threshold = %e.threshold, "Global stop-loss tripped");
            }
            Event::ResidualPosition(e) => {
                warn!(
                    tx_id = %e.tx_id,
                    venue = %e.venue,
                    asset = %e.asset,
                    quantity = %e.quantity,
                    "Residual position"
                );
            }
        }
    }
}

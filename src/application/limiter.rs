//! Admission control and the active-transaction registry.
//!
//! A slot is reserved with one compare-and-swap before a transaction is
//! created, and released only when its registry entry is claimed. Claiming
//! removes the entry, so exactly one caller ever finalizes a transaction.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::domain::{Opportunity, Transaction, TransactionId, TransactionView};
use crate::error::ProcessError;

/// Registry slot for one in-flight transaction.
#[derive(Debug)]
pub struct ActiveEntry {
    /// Latest published snapshot.
    pub snapshot: Transaction,
    abort: Option<AbortHandle>,
    completion: Option<oneshot::Sender<Transaction>>,
}

/// Entry removed from the registry. The holder is the only party allowed
/// to finish the transaction.
#[derive(Debug)]
pub struct ClaimedEntry {
    pub snapshot: Transaction,
    pub abort: Option<AbortHandle>,
    pub completion: Option<oneshot::Sender<Transaction>>,
}

impl ClaimedEntry {
    /// Stop the worker, if one is attached. It makes no further calls.
    pub fn abort_worker(&self) {
        if let Some(handle) = &self.abort {
            handle.abort();
        }
    }

    /// Hand the final transaction to whoever is waiting on it.
    pub fn complete(mut self, tx: Transaction) {
        if let Some(sender) = self.completion.take() {
            let _ = sender.send(tx);
        }
    }
}

/// Result of a submission that found a free slot.
#[derive(Debug)]
pub struct Admission {
    pub transaction: Transaction,
    pub completion: oneshot::Receiver<Transaction>,
}

/// Bounds the number of non-terminal transactions.
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    max: usize,
    in_flight: AtomicUsize,
    accepting: AtomicBool,
    active: DashMap<TransactionId, ActiveEntry>,
    /// Entries cancelled before their worker handle was attached.
    orphaned: DashMap<TransactionId, ()>,
}

impl ConcurrencyLimiter {
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self {
            max,
            in_flight: AtomicUsize::new(0),
            accepting: AtomicBool::new(true),
            active: DashMap::new(),
            orphaned: DashMap::new(),
        }
    }

    #[must_use]
    pub fn max(&self) -> usize {
        self.max
    }

    /// Reserve a slot and register a pending transaction.
    ///
    /// Never blocks. Admission is first come, first served.
    ///
    /// # Errors
    ///
    /// `NotRunning` after [`close`](Self::close), `Capacity` when every
    /// slot is taken.
    pub fn submit(&self, opportunity: Opportunity) -> Result<Admission, ProcessError> {
        if !self.is_accepting() {
            return Err(ProcessError::NotRunning);
        }
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max).then_some(n + 1)
            })
            .map_err(|_| ProcessError::Capacity { max: self.max })?;

        // close() may have raced the reservation
        if !self.is_accepting() {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            return Err(ProcessError::NotRunning);
        }

        let transaction = Transaction::new(opportunity);
        let (sender, receiver) = oneshot::channel();
        self.active.insert(
            transaction.id(),
            ActiveEntry {
                snapshot: transaction.clone(),
                abort: None,
                completion: Some(sender),
            },
        );
        Ok(Admission {
            transaction,
            completion: receiver,
        })
    }

    /// Attach the worker's abort handle to a registered transaction.
    ///
    /// If the entry was cancelled before this call the worker is aborted
    /// at once. An entry the worker already settled itself is left alone.
    pub fn attach(&self, id: TransactionId, handle: AbortHandle) {
        if let Some(mut entry) = self.active.get_mut(&id) {
            entry.abort = Some(handle);
            return;
        }
        if self.orphaned.remove(&id).is_some() {
            handle.abort();
        }
    }

    /// Replace the published snapshot. Ignored once the entry is claimed.
    pub fn publish(&self, tx: &Transaction) {
        if let Some(mut entry) = self.active.get_mut(&tx.id()) {
            entry.snapshot = tx.clone();
        }
    }

    /// Remove an entry and free its slot.
    pub fn claim(&self, id: TransactionId) -> Option<ClaimedEntry> {
        let (_, entry) = self.active.remove(&id)?;
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        Some(ClaimedEntry {
            snapshot: entry.snapshot,
            abort: entry.abort,
            completion: entry.completion,
        })
    }

    /// Claim every remaining entry for cancellation.
    ///
    /// Workers whose handle is not attached yet are aborted on attach.
    pub fn cancel_all(&self) -> Vec<ClaimedEntry> {
        let ids: Vec<TransactionId> = self.active.iter().map(|e| *e.key()).collect();
        let mut cancelled = Vec::with_capacity(ids.len());
        for id in ids {
            // marked before the claim so a concurrent attach cannot miss it
            self.orphaned.insert(id, ());
            match self.claim(id) {
                Some(claimed) => {
                    if claimed.abort.is_some() {
                        self.orphaned.remove(&id);
                    }
                    cancelled.push(claimed);
                }
                None => {
                    self.orphaned.remove(&id);
                }
            }
        }
        cancelled
    }

    /// Stop admitting new transactions.
    pub fn close(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Number of reserved slots.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Snapshot views of the registered transactions.
    #[must_use]
    pub fn views(&self) -> Vec<TransactionView> {
        let mut views: Vec<_> = self.active.iter().map(|e| e.snapshot.view()).collect();
        views.sort_by_key(|v| v.started_at);
        views
    }
}

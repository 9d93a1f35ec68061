//! Process-local store.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::port::{OperationRecord, StateSnapshot, Store};

/// Keeps operations and state in memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    operations: RwLock<Vec<OperationRecord>>,
    state: RwLock<Option<StateSnapshot>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a previously saved state.
    #[must_use]
    pub fn with_state(snapshot: StateSnapshot) -> Self {
        Self {
            operations: RwLock::new(Vec::new()),
            state: RwLock::new(Some(snapshot)),
        }
    }

    /// Stored operations in insertion order.
    #[must_use]
    pub fn operations(&self) -> Vec<OperationRecord> {
        self.operations.read().clone()
    }

    #[must_use]
    pub fn state(&self) -> Option<StateSnapshot> {
        self.state.read().clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save_operation(&self, record: &OperationRecord) -> Result<()> {
        let mut operations = self.operations.write();
        match operations.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => operations.push(record.clone()),
        }
        Ok(())
    }

    async fn load_state(&self) -> Result<Option<StateSnapshot>> {
        Ok(self.state.read().clone())
    }

    async fn save_state(&self, snapshot: &StateSnapshot) -> Result<()> {
        *self.state.write() = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::domain::OrchestrationStats;

    #[tokio::test]
    async fn state_round_trips() {
        let store = MemoryStore::new();
        assert!(store.load_state().await.unwrap().is_none());
        let snapshot = StateSnapshot::new(OrchestrationStats::new(dec!(500)), true);
        store.save_state(&snapshot).await.unwrap();
        assert_eq!(store.load_state().await.unwrap(), Some(snapshot));
    }
}

//! [`Store`](crate::port::Store) implementations.

mod memory;
pub mod sqlite;

use std::sync::Arc;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::port::Store;

/// SQLite when a path is configured, memory otherwise.
///
/// # Errors
/// Returns an error if the SQLite database cannot be opened.
pub fn from_config(config: &StoreConfig) -> Result<Arc<dyn Store>> {
    match &config.path {
        Some(path) => Ok(Arc::new(SqliteStore::open(path)?)),
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

//! SQLite store backed by Diesel.
//!
//! Operations are upserted by id; run state is a single JSON row.

mod connection;
mod model;
mod schema;

use std::path::Path;

use async_trait::async_trait;
use diesel::prelude::*;
use tracing::debug;

pub use connection::{create_pool, run_migrations, DbPool};

use self::model::{OperationRow, RunStateRow, RUN_STATE_ID};
use self::schema::{operations, run_state};
use crate::error::{Error, Result};
use crate::port::{OperationRecord, StateSnapshot, Store};

pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply migrations.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let url = path.as_ref().to_string_lossy().into_owned();
        let pool = create_pool(&url)?;
        run_migrations(&pool)?;
        debug!(path = %url, "SQLite store ready");
        Ok(Self { pool })
    }

    /// In-memory database, mostly for tests.
    ///
    /// # Errors
    /// Returns an error if migrations fail.
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(
        &self,
    ) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>>
    {
        self.pool.get().map_err(|e| Error::Connection(e.to_string()))
    }

    /// Most recent operations first.
    ///
    /// # Errors
    /// Returns an error if the query or row decoding fails.
    pub fn recent_operations(&self, limit: i64) -> Result<Vec<OperationRecord>> {
        let mut conn = self.conn()?;
        let rows: Vec<OperationRow> = operations::table
            .order(operations::started_at.desc())
            .limit(limit)
            .select(OperationRow::as_select())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        rows.into_iter().map(OperationRow::into_record).collect()
    }

    /// Number of stored operations.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn operation_count(&self) -> Result<i64> {
        let mut conn = self.conn()?;
        operations::table
            .count()
            .get_result(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn save_operation(&self, record: &OperationRecord) -> Result<()> {
        let row = OperationRow::from_record(record)?;
        let mut conn = self.conn()?;
        diesel::replace_into(operations::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn load_state(&self) -> Result<Option<StateSnapshot>> {
        let mut conn = self.conn()?;
        let row: Option<RunStateRow> = run_state::table
            .find(RUN_STATE_ID)
            .select(RunStateRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        row.map(RunStateRow::into_snapshot).transpose()
    }

    async fn save_state(&self, snapshot: &StateSnapshot) -> Result<()> {
        let row = RunStateRow::from_snapshot(snapshot)?;
        let mut conn = self.conn()?;
        diesel::replace_into(run_state::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }
}

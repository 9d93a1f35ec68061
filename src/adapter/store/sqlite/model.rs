//! Row types and conversions.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::schema::{operations, run_state};
use crate::domain::{ExecutionMode, OutcomeCode};
use crate::error::{Error, Result};
use crate::port::{OperationRecord, StateSnapshot};

/// Primary key of the only `run_state` row.
pub const RUN_STATE_ID: i32 = 1;

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = operations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OperationRow {
    pub id: String,
    pub symbol: String,
    pub buy_venue: String,
    pub sell_venue: String,
    pub mode: String,
    pub state: String,
    pub outcome: Option<String>,
    pub investment: String,
    pub profit_loss: String,
    pub failure_reason: Option<String>,
    pub detail: String,
    pub started_at: String,
    pub ended_at: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = run_state)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RunStateRow {
    pub id: i32,
    pub snapshot: String,
    pub saved_at: String,
}

fn parse_err(e: impl std::fmt::Display) -> Error {
    Error::Parse(e.to_string())
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(parse_err)?
        .with_timezone(&Utc))
}

impl OperationRow {
    /// Decimals are stored as text to keep full precision.
    pub fn from_record(record: &OperationRecord) -> Result<Self> {
        Ok(Self {
            id: record.id.clone(),
            symbol: record.symbol.clone(),
            buy_venue: record.buy_venue.clone(),
            sell_venue: record.sell_venue.clone(),
            mode: record.mode.as_str().to_string(),
            state: record.state.clone(),
            outcome: record.outcome.map(|o| o.as_str().to_string()),
            investment: record.investment.to_string(),
            profit_loss: record.profit_loss.to_string(),
            failure_reason: record.failure_reason.clone(),
            detail: serde_json::to_string(&record.detail)?,
            started_at: record.started_at.to_rfc3339(),
            ended_at: record.ended_at.map(|t| t.to_rfc3339()),
        })
    }

    pub fn into_record(self) -> Result<OperationRecord> {
        let outcome = match self.outcome {
            Some(code) => Some(
                OutcomeCode::parse(&code)
                    .ok_or_else(|| Error::Parse(format!("unknown outcome code: {code}")))?,
            ),
            None => None,
        };
        Ok(OperationRecord {
            id: self.id,
            symbol: self.symbol,
            buy_venue: self.buy_venue,
            sell_venue: self.sell_venue,
            mode: ExecutionMode::from_str(&self.mode).map_err(Error::Parse)?,
            state: self.state,
            outcome,
            investment: Decimal::from_str(&self.investment).map_err(parse_err)?,
            profit_loss: Decimal::from_str(&self.profit_loss).map_err(parse_err)?,
            failure_reason: self.failure_reason,
            detail: serde_json::from_str(&self.detail)?,
            started_at: parse_time(&self.started_at)?,
            ended_at: self.ended_at.as_deref().map(parse_time).transpose()?,
        })
    }
}

impl RunStateRow {
    pub fn from_snapshot(snapshot: &StateSnapshot) -> Result<Self> {
        Ok(Self {
            id: RUN_STATE_ID,
            snapshot: serde_json::to_string(snapshot)?,
            saved_at: snapshot.saved_at.to_rfc3339(),
        })
    }

    pub fn into_snapshot(self) -> Result<StateSnapshot> {
        Ok(serde_json::from_str(&self.snapshot)?)
    }
}

//! Durable state store kept in a DuckDB table

use crate::error::{StateError, StateResult};
use crate::traits::{AppliedRecord, StateStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use regex::Regex;
use std::sync::{Mutex, MutexGuard, OnceLock};
use tm_core::MigrationId;

static TABLE_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn table_name_regex() -> &'static Regex {
    TABLE_NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"))
}

/// Check that `table` can be interpolated into SQL as a bare identifier
pub fn validate_table_name(table: &str) -> StateResult<()> {
    if table_name_regex().is_match(table) {
        Ok(())
    } else {
        Err(StateError::InvalidTable(table.to_string()))
    }
}

/// State store backed by one table: one row per applied migration.
///
/// Rows carry the apply time in microseconds since the epoch and a sequence
/// number that breaks ties between equal times.
pub struct DuckDbStore {
    conn: Mutex<Connection>,
    table: String,
}

impl DuckDbStore {
    /// Wrap `conn`, creating the state table and its sequence if missing
    pub fn open(conn: Connection, table: &str) -> StateResult<Self> {
        validate_table_name(table)?;
        conn.execute_batch(&format!(
            "CREATE SEQUENCE IF NOT EXISTS {table}_seq START 1;
             CREATE TABLE IF NOT EXISTS {table} (
                 identity      VARCHAR PRIMARY KEY,
                 applied_at_us BIGINT NOT NULL,
                 seq           BIGINT NOT NULL
             );"
        ))
        .map_err(|e| StateError::Unavailable(format!("failed to create table {table}: {e}")))?;
        log::debug!("State table {table} ready");
        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }

    /// Open a store on a fresh in-memory database
    pub fn open_memory(table: &str) -> StateResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::open(conn, table)
    }

    /// Name of the state table
    pub fn table(&self) -> &str {
        &self.table
    }

    fn lock(&self) -> StateResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StateError::Unavailable(format!("state mutex poisoned: {e}")))
    }

    fn count_sync(conn: &Connection, table: &str, id: &MigrationId) -> StateResult<i64> {
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE identity = ?"),
            params![id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn decode_record(identity: String, applied_at_us: i64) -> StateResult<AppliedRecord> {
    let applied_at =
        DateTime::<Utc>::from_timestamp_micros(applied_at_us).ok_or_else(|| {
            StateError::CorruptRecord {
                identity: identity.clone(),
                reason: format!("applied_at_us {applied_at_us} is out of range"),
            }
        })?;
    let id = MigrationId::parse(&identity).map_err(|e| StateError::CorruptRecord {
        identity: identity.clone(),
        reason: e.to_string(),
    })?;
    Ok(AppliedRecord { id, applied_at })
}

#[async_trait]
impl StateStore for DuckDbStore {
    async fn is_applied(&self, id: &MigrationId) -> StateResult<bool> {
        let conn = self.lock()?;
        Ok(Self::count_sync(&conn, &self.table, id)? > 0)
    }

    async fn mark_applied(&self, id: &MigrationId, at: DateTime<Utc>) -> StateResult<()> {
        let conn = self.lock()?;
        if Self::count_sync(&conn, &self.table, id)? > 0 {
            return Err(StateError::AlreadyApplied(id.to_string()));
        }
        let table = &self.table;
        conn.execute(
            &format!(
                "INSERT INTO {table} (identity, applied_at_us, seq) VALUES (?, ?, nextval('{table}_seq'))"
            ),
            params![id.as_str(), at.timestamp_micros()],
        )?;
        Ok(())
    }

    async fn unmark_applied(&self, id: &MigrationId) -> StateResult<()> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE identity = ?", self.table),
            params![id.as_str()],
        )?;
        if deleted == 0 {
            return Err(StateError::NotApplied(id.to_string()));
        }
        Ok(())
    }

    async fn list_applied(&self) -> StateResult<Vec<AppliedRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT identity, applied_at_us FROM {} ORDER BY applied_at_us, seq",
            self.table
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (identity, applied_at_us) = row?;
            records.push(decode_record(identity, applied_at_us)?);
        }
        Ok(records)
    }

    fn engine_name(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;

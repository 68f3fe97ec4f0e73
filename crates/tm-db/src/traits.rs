//! Database trait definition

use crate::error::DbResult;
use async_trait::async_trait;

/// The database migration scripts run against.
///
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute a single statement, returns affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute a script of one or more statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Check if a table or view exists (`schema.name` or `name` in `main`)
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Count the rows a query returns
    async fn query_count(&self, sql: &str) -> DbResult<usize>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

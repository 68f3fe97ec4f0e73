//! The storage contract used by the execution engine

use crate::error::StateResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tm_core::MigrationId;

/// One applied migration, as recorded by a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedRecord {
    pub id: MigrationId,
    pub applied_at: DateTime<Utc>,
}

/// Persistent record of which migrations have been applied.
///
/// A store must read its own writes within one process: after
/// `mark_applied(x)` returns, `is_applied(x)` is true until
/// `unmark_applied(x)` returns.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Whether a record exists for `id`
    async fn is_applied(&self, id: &MigrationId) -> StateResult<bool>;

    /// Record `id` as applied at `at`. Fails with `AlreadyApplied` if a
    /// record exists.
    async fn mark_applied(&self, id: &MigrationId, at: DateTime<Utc>) -> StateResult<()>;

    /// Remove the record for `id`. Fails with `NotApplied` if none exists.
    async fn unmark_applied(&self, id: &MigrationId) -> StateResult<()>;

    /// All records, oldest `applied_at` first, ties in insertion order
    async fn list_applied(&self) -> StateResult<Vec<AppliedRecord>>;

    /// Backend identifier for logging
    fn engine_name(&self) -> &'static str;
}

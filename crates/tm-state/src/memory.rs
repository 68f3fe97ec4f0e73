//! Process-local state store

use crate::error::{StateError, StateResult};
use crate::traits::{AppliedRecord, StateStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tm_core::MigrationId;

#[derive(Default)]
struct Records {
    by_id: HashMap<MigrationId, (DateTime<Utc>, u64)>,
    next_seq: u64,
}

/// State store backed by a map. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Records>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StateResult<MutexGuard<'_, Records>> {
        self.records
            .lock()
            .map_err(|e| StateError::Unavailable(format!("memory store mutex poisoned: {e}")))
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn is_applied(&self, id: &MigrationId) -> StateResult<bool> {
        Ok(self.lock()?.by_id.contains_key(id))
    }

    async fn mark_applied(&self, id: &MigrationId, at: DateTime<Utc>) -> StateResult<()> {
        let mut records = self.lock()?;
        if records.by_id.contains_key(id) {
            return Err(StateError::AlreadyApplied(id.to_string()));
        }
        let seq = records.next_seq;
        records.next_seq += 1;
        records.by_id.insert(id.clone(), (at, seq));
        Ok(())
    }

    async fn unmark_applied(&self, id: &MigrationId) -> StateResult<()> {
        match self.lock()?.by_id.remove(id) {
            Some(_) => Ok(()),
            None => Err(StateError::NotApplied(id.to_string())),
        }
    }

    async fn list_applied(&self) -> StateResult<Vec<AppliedRecord>> {
        let records = self.lock()?;
        let mut entries: Vec<_> = records.by_id.iter().collect();
        entries.sort_by_key(|(_, (at, seq))| (*at, *seq));
        Ok(entries
            .into_iter()
            .map(|(id, (at, _))| AppliedRecord {
                id: id.clone(),
                applied_at: *at,
            })
            .collect())
    }

    fn engine_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;

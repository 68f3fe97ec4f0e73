//! Creating new, empty unit files.

use crate::engine::Engine;
use crate::error::EngineResult;
use chrono::{NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use tm_core::{next_migration_id, write_unit_file, CoreError, MigrationId};

/// Label used when `make` is given none
pub const DEFAULT_LABEL: &str = "migration";

/// A unit file written by [`make_unit`]
#[derive(Debug, Clone)]
pub struct MadeUnit {
    pub id: MigrationId,
    pub path: PathBuf,
    pub dependencies: Vec<MigrationId>,
}

/// Write a new unit into `dir`.
///
/// The identity sorts after every identity in `existing`, and the new unit
/// depends on the latest of them so units form a chain. Existing files are
/// never overwritten.
pub fn make_unit(
    dir: &Path,
    label: &str,
    existing: &[MigrationId],
    now: NaiveDateTime,
) -> EngineResult<MadeUnit> {
    let id = next_migration_id(now, label, existing)?;
    let dependencies: Vec<MigrationId> = existing.iter().max().cloned().into_iter().collect();
    let path = write_unit_file(dir, &id, &dependencies)?;
    log::info!("Created migration {id} at {}", path.display());
    Ok(MadeUnit {
        id,
        path,
        dependencies,
    })
}

impl Engine {
    /// Write a new unit into the first migration root, chained onto the
    /// latest unit already known.
    pub fn make(&self, label: &str) -> EngineResult<MadeUnit> {
        let dir = self.roots().first().ok_or_else(|| CoreError::ConfigInvalid {
            message: "no migration directory configured".to_string(),
        })?;
        std::fs::create_dir_all(dir).map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;
        let existing: Vec<MigrationId> = self.load_units()?.ids().cloned().collect();
        make_unit(dir, label, &existing, Utc::now().naive_utc())
    }
}

#[cfg(test)]
#[path = "make_test.rs"]
mod tests;

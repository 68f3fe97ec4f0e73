//! Migration units: what a unit can do and where it came from.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tm_core::{CoreError, CoreResult, Discovered, MigrationDag, MigrationId, UnitFile};
use tm_db::Database;

/// Error returned by a unit's action
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// Result of running a unit's forward or backward action
pub type ActionResult = Result<(), ActionError>;

/// The forward and backward actions of one migration unit.
#[async_trait]
pub trait Migration: Send + Sync {
    /// Identities that must be applied before this unit
    fn dependencies(&self) -> &[MigrationId];

    /// Human-readable description
    fn description(&self) -> Option<&str> {
        None
    }

    /// Apply the unit
    async fn up(&self, db: &dyn Database) -> ActionResult;

    /// Revert the unit
    async fn down(&self, db: &dyn Database) -> ActionResult;
}

/// A unit loaded from a YAML file; its actions are SQL scripts.
#[derive(Debug, Clone)]
pub struct SqlMigration {
    unit: UnitFile,
}

impl SqlMigration {
    pub fn new(unit: UnitFile) -> Self {
        Self { unit }
    }

    pub fn unit(&self) -> &UnitFile {
        &self.unit
    }
}

async fn run_script(db: &dyn Database, script: &str) -> ActionResult {
    if script.trim().is_empty() {
        return Ok(());
    }
    db.execute_batch(script).await?;
    Ok(())
}

#[async_trait]
impl Migration for SqlMigration {
    fn dependencies(&self) -> &[MigrationId] {
        &self.unit.dependencies
    }

    fn description(&self) -> Option<&str> {
        self.unit.description.as_deref()
    }

    async fn up(&self, db: &dyn Database) -> ActionResult {
        run_script(db, &self.unit.up).await
    }

    async fn down(&self, db: &dyn Database) -> ActionResult {
        run_script(db, &self.unit.down).await
    }
}

/// Where a unit was defined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Loaded from a unit file
    File(PathBuf),
    /// Compiled into the binary and added through a [`Registry`]
    Registered,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::File(path) => write!(f, "{}", path.display()),
            Origin::Registered => write!(f, "<registered>"),
        }
    }
}

/// One migration unit ready to plan and run
#[derive(Clone)]
pub struct MigrationUnit {
    pub id: MigrationId,
    pub origin: Origin,
    pub migration: Arc<dyn Migration>,
}

impl MigrationUnit {
    pub fn dependencies(&self) -> &[MigrationId] {
        self.migration.dependencies()
    }

    pub fn description(&self) -> Option<&str> {
        self.migration.description()
    }
}

impl fmt::Debug for MigrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationUnit")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("dependencies", &self.dependencies())
            .finish()
    }
}

/// Units compiled into the program, listed at build time.
#[derive(Default, Clone)]
pub struct Registry {
    units: Vec<(MigrationId, Arc<dyn Migration>)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit under `id`. An identity can only be registered once.
    pub fn register<M>(&mut self, id: MigrationId, migration: M) -> CoreResult<()>
    where
        M: Migration + 'static,
    {
        if self.units.iter().any(|(existing, _)| *existing == id) {
            return Err(CoreError::DuplicateIdentity {
                id: id.to_string(),
                first: Origin::Registered.to_string(),
                second: Origin::Registered.to_string(),
            });
        }
        self.units.push((id, Arc::new(migration)));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Every unit known to a run: discovered files plus registered units.
#[derive(Debug, Default)]
pub struct UnitSet {
    units: Vec<MigrationUnit>,
    index: HashMap<MigrationId, usize>,
}

impl UnitSet {
    /// Merge discovered files with registered units.
    ///
    /// Nothing is executed. Identities must be unique across both sources.
    pub fn assemble(discovered: Discovered, registry: &Registry) -> CoreResult<Self> {
        let mut units: Vec<MigrationUnit> = discovered
            .units
            .into_iter()
            .map(|unit| MigrationUnit {
                id: unit.id.clone(),
                origin: Origin::File(unit.path.clone()),
                migration: Arc::new(SqlMigration::new(unit)),
            })
            .collect();

        for (id, migration) in &registry.units {
            if let Some(existing) = units.iter().find(|u| u.id == *id) {
                return Err(CoreError::DuplicateIdentity {
                    id: id.to_string(),
                    first: existing.origin.to_string(),
                    second: Origin::Registered.to_string(),
                });
            }
            units.push(MigrationUnit {
                id: id.clone(),
                origin: Origin::Registered,
                migration: Arc::clone(migration),
            });
        }

        units.sort_by(|a, b| a.id.cmp(&b.id));
        let index = units
            .iter()
            .enumerate()
            .map(|(i, u)| (u.id.clone(), i))
            .collect();
        Ok(Self { units, index })
    }

    pub fn get(&self, id: &str) -> Option<&MigrationUnit> {
        self.index.get(id).map(|&i| &self.units[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Units in identity order
    pub fn iter(&self) -> impl Iterator<Item = &MigrationUnit> {
        self.units.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &MigrationId> {
        self.units.iter().map(|u| &u.id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Build the dependency graph over this set
    pub fn dag(&self) -> CoreResult<MigrationDag> {
        MigrationDag::build(self.units.iter().map(|u| (&u.id, u.dependencies())))
    }
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;

//! Planning and executing runs.
//!
//! A run goes Planning -> Executing -> Completed | Failed | Cancelled. Every
//! run re-discovers units and re-reads the store, so nothing is cached
//! between runs.

use crate::error::{EngineError, EngineResult};
use crate::migration::{MigrationUnit, Registry, UnitSet};
use chrono::Utc;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tm_core::{discover, CoreError, MigrationId, UnitFile};
use tm_db::Database;
use tm_state::StateStore;
use uuid::Uuid;

/// What a run should do
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Command {
    /// Apply pending units, or one unit (plus dependencies) from `file`
    Up { file: Option<PathBuf> },
    /// Revert the last `count` applied units; 0 reverts all
    Down { count: usize },
    /// Revert the last `count` applied units; `count` must be at least 1
    Rollback { count: usize },
}

impl Command {
    pub fn direction(&self) -> Direction {
        match self {
            Command::Up { .. } => Direction::Up,
            Command::Down { .. } | Command::Rollback { .. } => Direction::Down,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Up { file: None } => write!(f, "up"),
            Command::Up { file: Some(path) } => write!(f, "up --file {}", path.display()),
            Command::Down { count } => write!(f, "down {count}"),
            Command::Rollback { count } => write!(f, "rollback {count}"),
        }
    }
}

/// Which action of a unit runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Shared flag checked before each unit starts
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the run before its next unit
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-run switches
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Plan only; run no action and leave the store untouched
    pub dry_run: bool,

    /// With `up --file`, also apply the target's unapplied dependencies
    pub migrate_dependencies: bool,

    pub cancel: CancellationToken,
}

/// Final state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Dry run: the plan was computed and nothing ran
    Planned,
    /// Every planned unit ran and was recorded
    Completed,
    /// A unit failed; units after it did not run
    Failed,
    /// Stopped between units on request
    Cancelled,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Planned => write!(f, "planned"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// The unit that stopped a run, and why
#[derive(Debug, Serialize)]
pub struct RunFailure {
    pub id: MigrationId,
    #[serde(serialize_with = "serialize_error")]
    pub error: EngineError,
}

fn serialize_error<S: Serializer>(error: &EngineError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

/// Outcome of one run
#[derive(Debug, Serialize)]
pub struct PlanResult {
    pub run_id: String,
    #[serde(flatten)]
    pub command: Command,
    pub direction: Direction,
    pub dry_run: bool,
    pub status: RunStatus,
    /// Units in the order their actions run (or would run)
    pub planned: Vec<MigrationId>,
    /// Units whose action ran and whose state was recorded
    pub executed: Vec<MigrationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<RunFailure>,
}

impl PlanResult {
    /// True unless a unit failed or the run was cancelled
    pub fn is_success(&self) -> bool {
        matches!(self.status, RunStatus::Planned | RunStatus::Completed)
    }
}

/// Runs migration commands against one database and one state store.
pub struct Engine {
    roots: Vec<PathBuf>,
    registry: Registry,
    db: Arc<dyn Database>,
    store: Arc<dyn StateStore>,
}

impl Engine {
    pub fn new(roots: Vec<PathBuf>, db: Arc<dyn Database>, store: Arc<dyn StateStore>) -> Self {
        Self {
            roots,
            registry: Registry::new(),
            db,
            store,
        }
    }

    /// Add compiled units to every run
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Discover unit files under the roots and merge in registered units
    pub fn load_units(&self) -> EngineResult<UnitSet> {
        let discovered = discover(&self.roots)?;
        Ok(UnitSet::assemble(discovered, &self.registry)?)
    }

    pub(crate) async fn applied_ids(&self) -> EngineResult<HashSet<MigrationId>> {
        let records = self
            .store
            .list_applied()
            .await
            .map_err(EngineError::StoreUnavailable)?;
        Ok(records.into_iter().map(|r| r.id).collect())
    }

    /// Plan and, unless `dry_run`, execute `command`.
    ///
    /// Discovery and resolution problems are returned as `Err` before any
    /// action runs. A failing unit is reported through
    /// `PlanResult::failure` with status `Failed`.
    pub async fn run(&self, command: &Command, options: &RunOptions) -> EngineResult<PlanResult> {
        let run_id = Uuid::new_v4().to_string()[..8].to_string();
        log::info!(
            "[{run_id}] Starting {command}{} (store: {}, database: {})",
            if options.dry_run { " (dry run)" } else { "" },
            self.store.engine_name(),
            self.db.db_type()
        );

        let (units, planned) = self.plan(command, options).await?;
        log::info!("[{run_id}] Planned {} migration(s)", planned.len());

        let mut result = PlanResult {
            run_id,
            command: command.clone(),
            direction: command.direction(),
            dry_run: options.dry_run,
            status: RunStatus::Completed,
            planned,
            executed: Vec::new(),
            failure: None,
        };

        if options.dry_run {
            for id in &result.planned {
                log::info!("[{}] Would run {} {}", result.run_id, result.direction, id);
            }
            result.status = RunStatus::Planned;
            return Ok(result);
        }

        self.execute(&units, &mut result, &options.cancel).await;
        log::info!(
            "[{}] Run {}: {} of {} migration(s) {}",
            result.run_id,
            result.status,
            result.executed.len(),
            result.planned.len(),
            match result.direction {
                Direction::Up => "applied",
                Direction::Down => "reverted",
            }
        );
        Ok(result)
    }

    /// Compute the ordered list of units a command would run.
    pub async fn plan(
        &self,
        command: &Command,
        options: &RunOptions,
    ) -> EngineResult<(UnitSet, Vec<MigrationId>)> {
        match command {
            Command::Up { file } => self.plan_up(file.as_deref(), options).await,
            Command::Down { count } => self.plan_down(*count).await,
            Command::Rollback { count } => {
                if *count == 0 {
                    return Err(EngineError::InvalidCount { count: 0 });
                }
                self.plan_down(*count).await
            }
        }
    }

    async fn plan_up(
        &self,
        file: Option<&Path>,
        options: &RunOptions,
    ) -> EngineResult<(UnitSet, Vec<MigrationId>)> {
        let mut discovered = discover(&self.roots)?;
        let target = match file {
            Some(path) => {
                if !path.is_file() {
                    return Err(EngineError::TargetNotFound {
                        path: path.display().to_string(),
                    });
                }
                let unit = UnitFile::load(path)?;
                let id = unit.id.clone();
                discovered.insert(unit)?;
                Some(id)
            }
            None => None,
        };
        let units = UnitSet::assemble(discovered, &self.registry)?;
        let dag = units.dag()?;
        let applied = self.applied_ids().await?;

        let planned: Vec<MigrationId> = match &target {
            None => dag
                .up_order()
                .iter()
                .filter(|id| !applied.contains(*id))
                .cloned()
                .collect(),
            Some(target) if applied.contains(target) => {
                log::info!("Migration {target} is already applied");
                Vec::new()
            }
            Some(target) => {
                let mut planned = Vec::new();
                if options.migrate_dependencies {
                    planned.extend(
                        dag.ancestors(target)
                            .into_iter()
                            .filter(|id| !applied.contains(id)),
                    );
                }
                planned.push(target.clone());
                planned
            }
        };

        check_dependencies(&units, &planned, &applied)?;
        Ok((units, planned))
    }

    async fn plan_down(&self, count: usize) -> EngineResult<(UnitSet, Vec<MigrationId>)> {
        let units = self.load_units()?;
        let dag = units.dag()?;
        let applied = self.applied_ids().await?;

        let mut revertible: Vec<MigrationId> = dag
            .down_order()
            .into_iter()
            .filter(|id| applied.contains(id))
            .collect();

        // Records with no unit (external dependencies, deleted files) stay
        // applied. They only block a count that reaches past the known units.
        let mut orphans: Vec<&MigrationId> =
            applied.iter().filter(|id| !units.contains(id)).collect();
        orphans.sort();
        if let Some(orphan) = orphans.first() {
            if count == 0 || count > revertible.len() {
                return Err(EngineError::UnknownAppliedMigration {
                    id: orphan.to_string(),
                });
            }
            log::warn!(
                "Skipping {} applied record(s) with no unit: {}",
                orphans.len(),
                orphans
                    .iter()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        if count != 0 {
            revertible.truncate(count);
        }
        Ok((units, revertible))
    }

    async fn execute(&self, units: &UnitSet, result: &mut PlanResult, cancel: &CancellationToken) {
        let planned = result.planned.clone();
        let total = planned.len();
        for (i, id) in planned.iter().enumerate() {
            if cancel.is_cancelled() {
                log::warn!(
                    "[{}] Cancelled before {id}; {} migration(s) not run",
                    result.run_id,
                    total - i
                );
                result.status = RunStatus::Cancelled;
                return;
            }

            let Some(unit) = units.get(id) else {
                // Planning only yields identities from `units`.
                continue;
            };
            log::info!(
                "[{}] ({}/{}) {} {}",
                result.run_id,
                i + 1,
                total,
                result.direction,
                id
            );

            if let Err(error) = self.run_unit(unit, result.direction).await {
                if matches!(error, EngineError::RecordNotPersisted { .. }) {
                    log::error!("[{}] {error}", result.run_id);
                } else {
                    log::warn!("[{}] {error}", result.run_id);
                }
                result.status = RunStatus::Failed;
                result.failure = Some(RunFailure {
                    id: id.clone(),
                    error,
                });
                return;
            }
            result.executed.push(id.clone());
        }
        result.status = RunStatus::Completed;
    }

    /// Run one unit's action, then record the change in the store.
    async fn run_unit(&self, unit: &MigrationUnit, direction: Direction) -> EngineResult<()> {
        let db = self.db.as_ref();
        let action = match direction {
            Direction::Up => unit.migration.up(db).await,
            Direction::Down => unit.migration.down(db).await,
        };
        action.map_err(|source| EngineError::ActionFailure {
            id: unit.id.to_string(),
            direction,
            source,
        })?;

        let recorded = match direction {
            Direction::Up => self.store.mark_applied(&unit.id, Utc::now()).await,
            Direction::Down => self.store.unmark_applied(&unit.id).await,
        };
        recorded.map_err(|source| EngineError::RecordNotPersisted {
            id: unit.id.to_string(),
            direction,
            source,
        })
    }
}

/// Every dependency of a planned unit must be applied already or planned
/// before it.
fn check_dependencies(
    units: &UnitSet,
    planned: &[MigrationId],
    applied: &HashSet<MigrationId>,
) -> EngineResult<()> {
    let mut satisfied: HashSet<&MigrationId> = applied.iter().collect();
    for id in planned {
        let deps = units.get(id).map(|u| u.dependencies()).unwrap_or_default();
        if let Some(missing) = deps.iter().find(|dep| !satisfied.contains(dep)) {
            return Err(CoreError::UnresolvedDependency {
                migration: id.to_string(),
                dependency: missing.to_string(),
            }
            .into());
        }
        satisfied.insert(id);
    }
    Ok(())
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;

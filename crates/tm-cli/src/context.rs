//! Runtime context for CLI commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tm_core::{Config, StateEngine};
use tm_db::DuckDbBackend;
use tm_engine::{CancellationToken, Engine, RunOptions};
use tm_state::{DuckDbStore, MemoryStore, StateStore};

use crate::cli::GlobalArgs;

/// Effective settings after merging flags, environment and config file.
///
/// Flags and `TIDEMARK_*` variables (both read by clap) win over the
/// config file, which wins over defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub roots: Vec<PathBuf>,
    /// Roots came from `--directory` or the config file, not the default
    pub roots_explicit: bool,
    pub database: String,
    pub engine: StateEngine,
    pub table: String,
    pub migrate_dependencies: bool,
    pub dry_run: bool,
}

impl Settings {
    pub(crate) fn resolve(config: &Config, args: &GlobalArgs, project_dir: &Path) -> Self {
        let roots = if args.directories.is_empty() {
            config.directories_absolute(project_dir)
        } else {
            args.directories
                .iter()
                .map(|d| {
                    let p = Path::new(d);
                    if p.is_absolute() {
                        p.to_path_buf()
                    } else {
                        project_dir.join(p)
                    }
                })
                .collect()
        };

        let database = match &args.database {
            Some(path) if path == ":memory:" || Path::new(path).is_absolute() => path.clone(),
            Some(path) => project_dir.join(path).display().to_string(),
            None => config.database_path_absolute(project_dir),
        };

        let roots_explicit =
            !args.directories.is_empty() || config.directories != Config::default().directories;

        Self {
            roots,
            roots_explicit,
            database,
            engine: args.engine.map(StateEngine::from).unwrap_or(config.state.engine),
            table: args
                .table
                .clone()
                .unwrap_or_else(|| config.state.table.clone()),
            migrate_dependencies: args.migrate_dependencies || config.migrate_dependencies,
            dry_run: args.dry_run,
        }
    }
}

impl Settings {
    /// Roots for `up --file`: a unit outside the default root (when that
    /// root is missing) is discovered next to its own file.
    pub(crate) fn roots_for_target(&self, file: &Path) -> Vec<PathBuf> {
        if self.roots_explicit || self.roots.iter().any(|root| root.is_dir()) {
            return self.roots.clone();
        }
        let parent = match file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        log::debug!(
            "Default migration directory missing; using {} for the target",
            parent.display()
        );
        vec![parent]
    }
}

/// Runtime context containing the merged settings
pub(crate) struct RuntimeContext {
    pub settings: Settings,
}

impl RuntimeContext {
    /// Create a new runtime context from global arguments
    pub(crate) fn new(args: &GlobalArgs) -> Result<Self> {
        let project_dir = Path::new(&args.project_dir);

        let config = if let Some(config_path) = &args.config {
            Config::load(Path::new(config_path)).context("Failed to load configuration file")?
        } else {
            Config::load_from_dir(project_dir).context("Failed to load project configuration")?
        };

        let settings = Settings::resolve(&config, args, project_dir);
        log::debug!("Effective settings: {settings:?}");
        Ok(Self { settings })
    }

    /// Connect to the target database and open the state store
    pub(crate) fn engine(&self) -> Result<Engine> {
        let db = Arc::new(
            DuckDbBackend::new(&self.settings.database)
                .with_context(|| format!("Failed to connect to database {}", self.settings.database))?,
        );

        let store: Arc<dyn StateStore> = match self.settings.engine {
            StateEngine::Duckdb => {
                let conn = db
                    .connection_handle()
                    .context("Failed to open state store connection")?;
                Arc::new(
                    DuckDbStore::open(conn, &self.settings.table)
                        .context("Failed to open state store")?,
                )
            }
            StateEngine::Memory => {
                log::warn!("Using the memory state store; applied records are lost on exit");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Engine::new(self.settings.roots.clone(), db, store))
    }

    /// An engine for commands that never touch the database
    pub(crate) fn offline_engine(&self) -> Result<Engine> {
        let db = Arc::new(DuckDbBackend::in_memory().context("Failed to open scratch database")?);
        Ok(Engine::new(
            self.settings.roots.clone(),
            db,
            Arc::new(MemoryStore::new()),
        ))
    }

    pub(crate) fn run_options(&self, cancel: CancellationToken) -> RunOptions {
        RunOptions {
            dry_run: self.settings.dry_run,
            migrate_dependencies: self.settings.migrate_dependencies,
            cancel,
        }
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;

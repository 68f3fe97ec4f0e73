//! Configuration types and parsing for tidemark.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file names probed in a project directory, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["tidemark.yml", "tidemark.yaml"];

const DEFAULT_DIRECTORY: &str = "migrations";
const DEFAULT_DB_PATH: &str = "tidemark.duckdb";
const DEFAULT_TABLE: &str = "tidemark_migrations";

/// Project configuration from tidemark.yml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root directories searched recursively for unit files
    #[serde(default = "default_directories")]
    pub directories: Vec<String>,

    /// Target database the migration scripts run against
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Where applied-migration records are kept
    #[serde(default)]
    pub state: StateConfig,

    /// Apply unapplied dependencies of a targeted unit automatically
    #[serde(default)]
    pub migrate_dependencies: bool,
}

/// Target database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// DuckDB file path, or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// State store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateConfig {
    /// Backend used to record applied migrations
    #[serde(default)]
    pub engine: StateEngine,

    /// Table holding one record per applied migration
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            engine: StateEngine::default(),
            table: default_table(),
        }
    }
}

/// State store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StateEngine {
    /// Durable table inside the DuckDB database
    #[default]
    Duckdb,
    /// Process-local map; nothing survives the process
    Memory,
}

impl std::fmt::Display for StateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateEngine::Duckdb => write!(f, "duckdb"),
            StateEngine::Memory => write!(f, "memory"),
        }
    }
}

fn default_directories() -> Vec<String> {
    vec![DEFAULT_DIRECTORY.to_string()]
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directories: default_directories(),
            database: DatabaseConfig::default(),
            state: StateConfig::default(),
            migrate_dependencies: false,
        }
    }
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory.
    ///
    /// The config file is optional; without one the defaults apply.
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        match CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists())
        {
            Some(path) => Self::load(&path),
            None => {
                log::debug!("No config file in {}, using defaults", dir.display());
                Ok(Self::default())
            }
        }
    }

    /// Validate configuration values that serde cannot check
    pub fn validate(&self) -> CoreResult<()> {
        if self.directories.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "'directories' must list at least one directory".to_string(),
            });
        }
        if let Some(empty) = self.directories.iter().find(|d| d.trim().is_empty()) {
            return Err(CoreError::ConfigInvalid {
                message: format!("'directories' contains an empty entry: {empty:?}"),
            });
        }
        if self.database.path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "'database.path' must not be empty".to_string(),
            });
        }
        if self.state.table.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "'state.table' must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Migration directories resolved against the project root
    pub fn directories_absolute(&self, root: &Path) -> Vec<PathBuf> {
        self.directories
            .iter()
            .map(|d| resolve_against(root, d))
            .collect()
    }

    /// Database path resolved against the project root (`:memory:` is kept)
    pub fn database_path_absolute(&self, root: &Path) -> String {
        if self.database.path == ":memory:" {
            self.database.path.clone()
        } else {
            resolve_against(root, &self.database.path)
                .display()
                .to_string()
        }
    }
}

fn resolve_against(root: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

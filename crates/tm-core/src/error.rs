//! Error types for tm-core

use std::fmt;
use thiserror::Error;

/// Phase of a run in which an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Config,
    Discovery,
    Resolution,
    /// Reading the state store
    Store,
    Execution,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Config => write!(f, "config"),
            Phase::Discovery => write!(f, "discovery"),
            Phase::Resolution => write!(f, "resolution"),
            Phase::Store => write!(f, "state store access"),
            Phase::Execution => write!(f, "execution"),
        }
    }
}

/// Core error type for Tidemark
#[derive(Error, Debug)]
pub enum CoreError {
    /// T001: Two unit files (or registered units) share an identity
    #[error("[T001] Duplicate migration identity '{id}': {first} and {second}")]
    DuplicateIdentity {
        id: String,
        first: String,
        second: String,
    },

    /// T002: A unit file could not be turned into a migration unit
    #[error("[T002] Malformed migration unit {path}: {reason}")]
    MalformedUnit { path: String, reason: String },

    /// T003: A migration root directory does not exist
    #[error("[T003] Migration directory not found: {path}")]
    DirectoryNotFound { path: String },

    /// T004: The dependency graph contains a cycle
    #[error("[T004] Circular dependency detected: {}", format_cycle(.cycle))]
    CyclicDependency { cycle: Vec<String> },

    /// T005: A dependency is neither applied nor available to apply
    #[error("[T005] Migration '{migration}' depends on '{dependency}', which has not been applied")]
    UnresolvedDependency {
        migration: String,
        dependency: String,
    },

    /// T006: A string is not a valid `YYYYMMDDHHMMSS_<label>` identity
    #[error("[T006] Invalid migration identity '{value}': {reason}")]
    InvalidMigrationId { value: String, reason: String },

    /// T007: Failed to parse configuration file
    #[error("[T007] Failed to parse config {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// T008: Invalid configuration value
    #[error("[T008] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// T009: IO error with file path context
    #[error("[T009] Failed to access '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// T010: Explicit configuration file not found
    #[error("[T010] Config file not found: {path}")]
    ConfigNotFound { path: String },
}

impl CoreError {
    /// The phase this error belongs to.
    pub fn phase(&self) -> Phase {
        match self {
            CoreError::DuplicateIdentity { .. }
            | CoreError::MalformedUnit { .. }
            | CoreError::DirectoryNotFound { .. }
            | CoreError::InvalidMigrationId { .. }
            | CoreError::IoWithPath { .. } => Phase::Discovery,
            CoreError::CyclicDependency { .. } | CoreError::UnresolvedDependency { .. } => {
                Phase::Resolution
            }
            CoreError::ConfigParse { .. }
            | CoreError::ConfigInvalid { .. }
            | CoreError::ConfigNotFound { .. } => Phase::Config,
        }
    }
}

fn format_cycle(cycle: &[String]) -> String {
    cycle.join(" -> ")
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

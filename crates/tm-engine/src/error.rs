//! Error types for tm-engine

use crate::engine::Direction;
use crate::migration::ActionError;
use thiserror::Error;
use tm_core::{CoreError, Phase};
use tm_state::StateError;

/// Errors raised while planning or executing a run
#[derive(Error, Debug)]
pub enum EngineError {
    /// X001: A unit's forward or backward action failed
    #[error("[X001] Migration '{id}' failed during {direction}: {source}")]
    ActionFailure {
        id: String,
        direction: Direction,
        #[source]
        source: ActionError,
    },

    /// X002: The action succeeded but the store did not record it
    #[error(
        "[X002] Migration '{id}' ran {direction} but its state was not recorded: {source}. \
         The database and the state store disagree for this migration; reconcile manually"
    )]
    RecordNotPersisted {
        id: String,
        direction: Direction,
        #[source]
        source: StateError,
    },

    /// X003: The store could not be read while planning
    #[error("[X003] State store unavailable: {0}")]
    StoreUnavailable(#[source] StateError),

    /// X004: The store holds a record for a unit that was not discovered
    #[error("[X004] Migration '{id}' is recorded as applied but no unit defines it")]
    UnknownAppliedMigration { id: String },

    /// X005: A rollback count must be at least one
    #[error("[X005] Invalid count {count}: rollback needs at least 1")]
    InvalidCount { count: usize },

    /// X006: The unit named by `--file` does not exist
    #[error("[X006] Migration file not found: {path}")]
    TargetNotFound { path: String },

    /// Discovery, resolution or config error from tm-core
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl EngineError {
    /// The phase this error belongs to
    pub fn phase(&self) -> Phase {
        match self {
            EngineError::ActionFailure { .. } | EngineError::RecordNotPersisted { .. } => {
                Phase::Execution
            }
            EngineError::StoreUnavailable(_) => Phase::Store,
            EngineError::UnknownAppliedMigration { .. }
            | EngineError::InvalidCount { .. } => Phase::Resolution,
            EngineError::TargetNotFound { .. } => Phase::Discovery,
            EngineError::Core(e) => e.phase(),
        }
    }

    /// Identity of the unit the error is about, when there is one
    pub fn migration_id(&self) -> Option<&str> {
        match self {
            EngineError::ActionFailure { id, .. }
            | EngineError::RecordNotPersisted { id, .. }
            | EngineError::UnknownAppliedMigration { id } => Some(id),
            EngineError::Core(CoreError::UnresolvedDependency { migration, .. }) => {
                Some(migration)
            }
            EngineError::Core(CoreError::DuplicateIdentity { id, .. }) => Some(id),
            _ => None,
        }
    }
}

/// Result type alias for EngineError
pub type EngineResult<T> = Result<T, EngineError>;

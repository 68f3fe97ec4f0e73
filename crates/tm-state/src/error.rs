//! Error types for tm-state

use thiserror::Error;

/// State store errors
#[derive(Error, Debug)]
pub enum StateError {
    /// S001: A record for this identity already exists
    #[error("[S001] Migration '{0}' is already recorded as applied")]
    AlreadyApplied(String),

    /// S002: No record exists for this identity
    #[error("[S002] Migration '{0}' is not recorded as applied")]
    NotApplied(String),

    /// S003: The backend could not be reached or failed
    #[error("[S003] State store unavailable: {0}")]
    Unavailable(String),

    /// S004: The configured table name is not a plain identifier
    #[error("[S004] Invalid state table name '{0}': expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidTable(String),

    /// S005: A stored record could not be decoded
    #[error("[S005] Corrupt state record '{identity}': {reason}")]
    CorruptRecord { identity: String, reason: String },
}

/// Result type alias for StateError
pub type StateResult<T> = Result<T, StateError>;

impl From<duckdb::Error> for StateError {
    fn from(err: duckdb::Error) -> Self {
        StateError::Unavailable(err.to_string())
    }
}

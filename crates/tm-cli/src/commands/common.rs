//! Shared utilities for CLI commands

use std::fmt;
use tm_core::Phase;
use tm_engine::EngineError;

/// Error type representing a non-zero process exit code.
///
/// Return `Err(ExitCode(N).into())` instead of calling
/// `std::process::exit(N)` so destructors run before the process ends.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the failure was already reported.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// A run left one or more units failed
pub(crate) const EXIT_FAILED: i32 = 1;
/// Discovery or resolution stopped the run before anything executed
pub(crate) const EXIT_INVALID: i32 = 2;
/// The run was interrupted between units
pub(crate) const EXIT_CANCELLED: i32 = 130;

/// Print an engine error with its phase and the unit it concerns, and
/// return the exit code for it.
pub(crate) fn report_engine_error(err: &EngineError) -> ExitCode {
    eprintln!("Error during {}: {err}", err.phase());
    if let Some(id) = err.migration_id() {
        eprintln!("  migration: {id}");
    }
    ExitCode(exit_code_for(err))
}

pub(crate) fn exit_code_for(err: &EngineError) -> i32 {
    match err {
        EngineError::InvalidCount { .. } => EXIT_FAILED,
        _ => match err.phase() {
            Phase::Discovery | Phase::Resolution => EXIT_INVALID,
            Phase::Config | Phase::Store | Phase::Execution => EXIT_FAILED,
        },
    }
}

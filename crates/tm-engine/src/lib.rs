//! tm-engine - Migration planning and execution for Tidemark
//!
//! The [`Engine`] discovers migration units, resolves their order, and
//! applies or reverts them against a target [`tm_db::Database`], recording
//! progress in a [`tm_state::StateStore`].

pub mod engine;
pub mod error;
pub mod make;
pub mod migration;
pub mod status;

pub use engine::{
    CancellationToken, Command, Direction, Engine, PlanResult, RunFailure, RunOptions, RunStatus,
};
pub use error::{EngineError, EngineResult};
pub use make::{make_unit, MadeUnit};
pub use migration::{
    ActionError, ActionResult, Migration, MigrationUnit, Origin, Registry, SqlMigration, UnitSet,
};
pub use status::{StatusReport, UnitStatus};

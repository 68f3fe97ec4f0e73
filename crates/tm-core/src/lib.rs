//! tm-core - Core library for Tidemark
//!
//! This crate provides migration identities, unit file parsing, discovery of
//! units across nested directories, project configuration, and the
//! dependency graph that orders units for applying and reverting.

pub mod config;
pub mod dag;
pub mod discovery;
pub mod error;
pub mod migration_id;
pub mod template;
pub mod unit;

pub use config::{Config, DatabaseConfig, StateConfig, StateEngine};
pub use dag::MigrationDag;
pub use discovery::{discover, Discovered};
pub use error::{CoreError, CoreResult, Phase};
pub use migration_id::{next_migration_id, MigrationId};
pub use template::write_unit_file;
pub use unit::UnitFile;

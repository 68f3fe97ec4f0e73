//! tm-state - Applied-migration state for Tidemark
//!
//! The engine only talks to the [`StateStore`] trait. Two backends are
//! provided: [`MemoryStore`] keeps records for the life of the process and
//! [`DuckDbStore`] persists them in a table of the target database.

pub mod duckdb;
pub mod error;
pub mod memory;
pub mod traits;

pub use duckdb::DuckDbStore;
pub use error::{StateError, StateResult};
pub use memory::MemoryStore;
pub use traits::{AppliedRecord, StateStore};

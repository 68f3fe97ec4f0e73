//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use tm_core::StateEngine;

/// Tidemark - discover, order, apply and revert database migrations
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Migration root directory (repeatable; replaces the configured list)
    #[arg(short = 'd', long = "directory", global = true)]
    pub directories: Vec<String>,

    /// Target DuckDB database path, or `:memory:`
    #[arg(long, global = true, env = "TIDEMARK_DATABASE")]
    pub database: Option<String>,

    /// Where applied migrations are recorded
    #[arg(long, global = true, value_enum, env = "TIDEMARK_ENGINE")]
    pub engine: Option<EngineArg>,

    /// Table holding applied-migration records
    #[arg(long, global = true, env = "TIDEMARK_TABLE")]
    pub table: Option<String>,

    /// Show the plan without running anything or touching the store
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// With `up --file`, also apply the target's unapplied dependencies
    #[arg(long, global = true)]
    pub migrate_dependencies: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// State store backends selectable on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineArg {
    /// Table in the target DuckDB database
    Duckdb,
    /// Process memory; records are lost on exit
    Memory,
}

impl From<EngineArg> for StateEngine {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Duckdb => StateEngine::Duckdb,
            EngineArg::Memory => StateEngine::Memory,
        }
    }
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON document on stdout
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations
    Up(UpArgs),

    /// Revert applied migrations, newest first
    Down(DownArgs),

    /// Revert the most recent migrations (default: one)
    Rollback(RollbackArgs),

    /// Show applied and pending migrations
    Status,

    /// Create a new, empty migration unit
    Make(MakeArgs),
}

/// Arguments for the up command
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Apply only this unit file
    #[arg(short, long)]
    pub file: Option<String>,
}

/// Arguments for the down command
#[derive(Args, Debug)]
pub struct DownArgs {
    /// Number of migrations to revert (0 reverts all)
    #[arg(default_value_t = 0)]
    pub count: usize,
}

/// Arguments for the rollback command
#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Number of migrations to revert (at least 1)
    #[arg(default_value_t = 1)]
    pub count: usize,
}

/// Arguments for the make command
#[derive(Args, Debug)]
pub struct MakeArgs {
    /// Label appended to the generated identity
    #[arg(default_value = tm_engine::make::DEFAULT_LABEL)]
    pub label: String,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

//! up, down and rollback commands

use anyhow::{Context, Result};
use std::path::PathBuf;
use tm_engine::{CancellationToken, Command, Direction, PlanResult, RunStatus};

use crate::cli::{DownArgs, GlobalArgs, OutputFormat, RollbackArgs, UpArgs};
use crate::commands::common::{report_engine_error, ExitCode, EXIT_CANCELLED, EXIT_FAILED};
use crate::context::RuntimeContext;

/// Execute the up command
pub(crate) async fn execute_up(args: &UpArgs, global: &GlobalArgs) -> Result<()> {
    let file = args.file.as_ref().map(PathBuf::from);
    run_command(Command::Up { file }, global).await
}

/// Execute the down command
pub(crate) async fn execute_down(args: &DownArgs, global: &GlobalArgs) -> Result<()> {
    run_command(Command::Down { count: args.count }, global).await
}

/// Execute the rollback command
pub(crate) async fn execute_rollback(args: &RollbackArgs, global: &GlobalArgs) -> Result<()> {
    run_command(Command::Rollback { count: args.count }, global).await
}

async fn run_command(command: Command, global: &GlobalArgs) -> Result<()> {
    let mut ctx = RuntimeContext::new(global)?;
    if let Command::Up { file: Some(file) } = &command {
        ctx.settings.roots = ctx.settings.roots_for_target(file);
    }
    let engine = ctx.engine()?;

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received; stopping after the current migration");
            watcher.cancel();
        }
    });

    let outcome = engine.run(&command, &ctx.run_options(cancel)).await;
    signal_task.abort();

    let result = match outcome {
        Ok(result) => result,
        Err(err) => return Err(report_engine_error(&err).into()),
    };

    match global.output {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize run result")?
        ),
        OutputFormat::Text => print_text(&result),
    }

    match result.status {
        RunStatus::Planned | RunStatus::Completed => Ok(()),
        RunStatus::Failed => Err(ExitCode(EXIT_FAILED).into()),
        RunStatus::Cancelled => Err(ExitCode(EXIT_CANCELLED).into()),
    }
}

fn print_text(result: &PlanResult) {
    let (verb, past) = match result.direction {
        Direction::Up => ("apply", "Applied"),
        Direction::Down => ("revert", "Reverted"),
    };

    if result.dry_run {
        if result.planned.is_empty() {
            println!("Nothing to {verb}.");
        } else {
            println!("Would {verb} {} migration(s):", result.planned.len());
            for id in &result.planned {
                println!("  {id}");
            }
        }
        return;
    }

    for id in &result.executed {
        println!("  {:<8} {id}", result.direction.to_string());
    }
    if let Some(failure) = &result.failure {
        eprintln!("Error during execution: {}", failure.error);
        eprintln!("  migration: {}", failure.id);
    }

    match result.status {
        RunStatus::Completed if result.planned.is_empty() => println!("Nothing to {verb}."),
        RunStatus::Cancelled => println!(
            "Cancelled after {} of {} migration(s) [run {}]",
            result.executed.len(),
            result.planned.len(),
            result.run_id
        ),
        _ => println!(
            "{past} {} of {} migration(s) [run {}]",
            result.executed.len(),
            result.planned.len(),
            result.run_id
        ),
    }
}

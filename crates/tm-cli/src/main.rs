//! Tidemark CLI - discover, order, apply and revert database migrations

use anyhow::Result;
use clap::Parser;
use std::io::Write;

mod cli;
mod commands;
mod context;

use cli::Cli;
use commands::common::ExitCode;
use commands::{make, migrate, status};

/// Logs go to stderr. `warn` by default, `info` with `--verbose`;
/// `RUST_LOG` overrides both.
fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .filter_level(level)
        .parse_default_env()
        .init();
}

async fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        cli::Commands::Up(args) => migrate::execute_up(args, &cli.global).await,
        cli::Commands::Down(args) => migrate::execute_down(args, &cli.global).await,
        cli::Commands::Rollback(args) => migrate::execute_rollback(args, &cli.global).await,
        cli::Commands::Status => status::execute(&cli.global).await,
        cli::Commands::Make(args) => make::execute(args, &cli.global).await,
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logger(cli.global.verbose);

    match dispatch(&cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<ExitCode>() {
            Some(code) => std::process::ExitCode::from(u8::try_from(code.0).unwrap_or(1)),
            None => {
                eprintln!("Error: {err:#}");
                std::process::ExitCode::FAILURE
            }
        },
    }
}

//! status command

use anyhow::{Context, Result};
use tm_engine::StatusReport;

use crate::cli::{GlobalArgs, OutputFormat};
use crate::commands::common::report_engine_error;
use crate::context::RuntimeContext;

/// Execute the status command
pub(crate) async fn execute(global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let engine = ctx.engine()?;

    let report = match engine.status().await {
        Ok(report) => report,
        Err(err) => return Err(report_engine_error(&err).into()),
    };

    match global.output {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize status")?
        ),
        OutputFormat::Text => print_text(&report),
    }
    Ok(())
}

fn print_text(report: &StatusReport) {
    if report.units.is_empty() && report.orphaned.is_empty() {
        println!("No migrations found.");
        return;
    }

    let width = report
        .units
        .iter()
        .map(|u| u.id.len())
        .chain(report.orphaned.iter().map(|r| r.id.len()))
        .max()
        .unwrap_or(0);

    println!("{:<8}  {:<width$}  APPLIED AT", "STATUS", "MIGRATION");
    for unit in &report.units {
        let status = if unit.applied { "applied" } else { "pending" };
        let applied_at = unit
            .applied_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!("{status:<8}  {:<width$}  {applied_at}", unit.id.as_str());
    }
    for record in &report.orphaned {
        println!(
            "{:<8}  {:<width$}  {}",
            "orphaned",
            record.id.as_str(),
            record.applied_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    println!(
        "\n{} migration(s): {} applied, {} pending",
        report.units.len(),
        report.applied_count(),
        report.pending_count()
    );
    if !report.orphaned.is_empty() {
        println!(
            "{} applied record(s) have no migration unit",
            report.orphaned.len()
        );
    }
}

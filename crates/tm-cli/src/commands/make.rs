//! make command

use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::{GlobalArgs, MakeArgs, OutputFormat};
use crate::commands::common::report_engine_error;
use crate::context::RuntimeContext;

/// Execute the make command
pub(crate) async fn execute(args: &MakeArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let engine = ctx.offline_engine()?;

    let made = match engine.make(&args.label) {
        Ok(made) => made,
        Err(err) => return Err(report_engine_error(&err).into()),
    };

    match global.output {
        OutputFormat::Json => {
            let doc = json!({
                "id": made.id,
                "path": made.path,
                "dependencies": made.dependencies,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&doc).context("Failed to serialize result")?
            );
        }
        OutputFormat::Text => {
            println!("Created {} at {}", made.id, made.path.display());
            if let Some(dep) = made.dependencies.first() {
                println!("  depends on {dep}");
            }
        }
    }
    Ok(())
}

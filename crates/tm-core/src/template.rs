//! Skeleton unit files written by `tidemark make`.

use crate::error::{CoreError, CoreResult};
use crate::migration_id::MigrationId;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Render an empty unit that depends on `dependencies`.
pub fn render_unit_template(dependencies: &[MigrationId]) -> String {
    let mut out = String::new();
    out.push_str("description: \"\"\n\n");
    if dependencies.is_empty() {
        out.push_str("dependencies: []\n");
    } else {
        out.push_str("dependencies:\n");
        for dep in dependencies {
            out.push_str(&format!("  - {dep}\n"));
        }
    }
    out.push_str("\n# Forward script, run by `tidemark up`\n");
    out.push_str("up: |\n  SELECT 1;\n");
    out.push_str("\n# Backward script, run by `tidemark down` / `tidemark rollback`\n");
    out.push_str("down: |\n  SELECT 1;\n");
    out
}

/// Write `<dir>/<id>.yml`. Fails instead of overwriting an existing file.
pub fn write_unit_file(
    dir: &Path,
    id: &MigrationId,
    dependencies: &[MigrationId],
) -> CoreResult<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })?;

    let path = dir.join(format!("{id}.yml"));
    let io_err = |e: std::io::Error| CoreError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    };
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(io_err)?;
    file.write_all(render_unit_template(dependencies).as_bytes())
        .map_err(io_err)?;
    Ok(path)
}

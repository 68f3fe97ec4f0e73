//! On-disk migration unit files.
//!
//! A unit file is named `<identity>.yml` and declares its dependencies plus
//! a forward (`up`) and backward (`down`) script. Loading a unit only parses
//! the file; nothing in it is executed.

use crate::error::{CoreError, CoreResult};
use crate::migration_id::MigrationId;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// A parsed migration unit file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFile {
    /// Identity derived from the file stem
    pub id: MigrationId,

    /// Path the unit was loaded from
    pub path: PathBuf,

    /// Optional human-readable description
    pub description: Option<String>,

    /// Identities that must be applied before this unit
    pub dependencies: Vec<MigrationId>,

    /// Forward script
    pub up: String,

    /// Backward script
    pub down: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawUnitFile {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    dependencies: Option<Vec<String>>,
    up: String,
    down: String,
}

/// Whether `path` looks like a unit file: a `.yml`/`.yaml` file whose stem
/// starts with a digit.
pub fn is_unit_candidate(path: &Path) -> bool {
    let has_yaml_ext = path
        .extension()
        .is_some_and(|e| e == "yml" || e == "yaml");
    let starts_with_digit = path
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.chars().next())
        .is_some_and(|c| c.is_ascii_digit());
    has_yaml_ext && starts_with_digit
}

impl UnitFile {
    /// Load and validate a single unit file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(path, &content)
    }

    /// Parse unit content that was read from `path`.
    pub fn parse(path: &Path, content: &str) -> CoreResult<Self> {
        let malformed = |reason: String| CoreError::MalformedUnit {
            path: path.display().to_string(),
            reason,
        };

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| malformed("file name is not valid UTF-8".to_string()))?;
        let id = MigrationId::parse(stem).map_err(|e| malformed(e.to_string()))?;

        let raw: RawUnitFile =
            serde_yaml::from_str(content).map_err(|e| malformed(e.to_string()))?;

        let mut dependencies: Vec<MigrationId> = Vec::new();
        for reference in raw.dependencies.unwrap_or_default() {
            let dep = MigrationId::from_reference(&reference).map_err(|e| {
                malformed(format!("invalid dependency '{}': {}", reference, e))
            })?;
            if !dependencies.contains(&dep) {
                dependencies.push(dep);
            }
        }

        Ok(Self {
            id,
            path: path.to_path_buf(),
            description: raw.description.filter(|d| !d.trim().is_empty()),
            dependencies,
            up: raw.up,
            down: raw.down,
        })
    }
}

#[cfg(test)]
#[path = "unit_test.rs"]
mod tests;

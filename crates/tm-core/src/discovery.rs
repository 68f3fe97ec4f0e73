//! Migration unit discovery across one or more root directories.

use crate::error::{CoreError, CoreResult};
use crate::migration_id::MigrationId;
use crate::unit::{is_unit_candidate, UnitFile};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// The full set of unit files found under the migration roots.
#[derive(Debug, Default)]
pub struct Discovered {
    /// Units sorted by identity
    pub units: Vec<UnitFile>,

    /// Map from identity to position in `units`
    index: HashMap<MigrationId, usize>,
}

impl Discovered {
    /// Look up a unit by identity.
    pub fn get(&self, id: &str) -> Option<&UnitFile> {
        self.index.get(id).map(|&i| &self.units[i])
    }

    /// Check whether an identity was discovered.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Discovered identities in order.
    pub fn ids(&self) -> impl Iterator<Item = &MigrationId> {
        self.units.iter().map(|u| &u.id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Add a unit loaded outside the roots (e.g. a single `--file`).
    ///
    /// The same file is accepted twice; a different file with the same
    /// identity is a duplicate.
    pub fn insert(&mut self, unit: UnitFile) -> CoreResult<()> {
        if let Some(existing) = self.get(&unit.id) {
            if same_file(&existing.path, &unit.path) {
                return Ok(());
            }
            return Err(CoreError::DuplicateIdentity {
                id: unit.id.to_string(),
                first: existing.path.display().to_string(),
                second: unit.path.display().to_string(),
            });
        }
        self.units.push(unit);
        self.units.sort_by(|a, b| a.id.cmp(&b.id));
        self.reindex();
        Ok(())
    }

    fn from_units(mut units: Vec<UnitFile>) -> CoreResult<Self> {
        units.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.path.cmp(&b.path)));
        for pair in units.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(CoreError::DuplicateIdentity {
                    id: pair[0].id.to_string(),
                    first: pair[0].path.display().to_string(),
                    second: pair[1].path.display().to_string(),
                });
            }
        }
        let mut discovered = Self {
            units,
            index: HashMap::new(),
        };
        discovered.reindex();
        Ok(discovered)
    }

    fn reindex(&mut self) {
        self.index = self
            .units
            .iter()
            .enumerate()
            .map(|(i, u)| (u.id.clone(), i))
            .collect();
    }
}

/// Recursively discover unit files under every root.
///
/// Nesting depth and intermediate directory names do not matter. Hidden
/// directories are skipped. A root that is listed twice, or that sits inside
/// another root, contributes each file only once.
pub fn discover(roots: &[PathBuf]) -> CoreResult<Discovered> {
    let mut files: Vec<PathBuf> = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for root in roots {
        if !root.is_dir() {
            return Err(CoreError::DirectoryNotFound {
                path: root.display().to_string(),
            });
        }
        collect_candidates(root, &mut files, &mut seen)?;
    }

    let mut units = Vec::with_capacity(files.len());
    for path in files {
        log::debug!("Loading migration unit {}", path.display());
        units.push(UnitFile::load(&path)?);
    }

    let discovered = Discovered::from_units(units)?;
    log::debug!(
        "Discovered {} migration unit(s) under {} root(s)",
        discovered.len(),
        roots.len()
    );
    Ok(discovered)
}

fn collect_candidates(
    dir: &Path,
    files: &mut Vec<PathBuf>,
    seen: &mut HashSet<PathBuf>,
) -> CoreResult<()> {
    let io_err = |e: std::io::Error| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    };

    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()
        .map_err(io_err)?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if !hidden {
                collect_candidates(&path, files, seen)?;
            }
            continue;
        }
        if !is_unit_candidate(&path) {
            log::debug!("Skipping non-migration file {}", path.display());
            continue;
        }
        let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
        if seen.insert(canonical) {
            files.push(path);
        }
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
#[path = "discovery_test.rs"]
mod tests;

//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tm_core::MigrationId;
use tm_db::DuckDbBackend;
use tm_engine::Engine;
use tm_state::{AppliedRecord, MemoryStore, StateError, StateResult, StateStore};

/// Memory store that logs every mutation and can be told to fail.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    calls: Mutex<Vec<String>>,
    pub fail_marks: AtomicBool,
    pub fail_unmarks: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl RecordingStore {
    /// Mutations in call order, as `mark <id>` / `unmark <id>`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub async fn applied(&self) -> Vec<String> {
        self.inner
            .list_applied()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id.to_string())
            .collect()
    }

    /// Seed a record without going through the engine
    pub async fn seed(&self, id: &str) {
        self.inner
            .mark_applied(&MigrationId::parse(id).unwrap(), Utc::now())
            .await
            .unwrap();
    }
}

#[async_trait]
impl StateStore for RecordingStore {
    async fn is_applied(&self, id: &MigrationId) -> StateResult<bool> {
        self.inner.is_applied(id).await
    }

    async fn mark_applied(&self, id: &MigrationId, at: DateTime<Utc>) -> StateResult<()> {
        if self.fail_marks.load(Ordering::SeqCst) {
            return Err(StateError::Unavailable("injected failure".to_string()));
        }
        self.calls.lock().unwrap().push(format!("mark {id}"));
        self.inner.mark_applied(id, at).await
    }

    async fn unmark_applied(&self, id: &MigrationId) -> StateResult<()> {
        if self.fail_unmarks.load(Ordering::SeqCst) {
            return Err(StateError::Unavailable("injected failure".to_string()));
        }
        self.calls.lock().unwrap().push(format!("unmark {id}"));
        self.inner.unmark_applied(id).await
    }

    async fn list_applied(&self) -> StateResult<Vec<AppliedRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StateError::Unavailable("injected failure".to_string()));
        }
        self.inner.list_applied().await
    }

    fn engine_name(&self) -> &'static str {
        "recording"
    }
}

/// A migration directory, a target database and a recording store.
pub struct Fixture {
    pub dir: TempDir,
    pub db: Arc<DuckDbBackend>,
    pub store: Arc<RecordingStore>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            db: Arc::new(DuckDbBackend::in_memory().unwrap()),
            store: Arc::new(RecordingStore::default()),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("migrations")
    }

    pub fn engine(&self) -> Engine {
        std::fs::create_dir_all(self.root()).unwrap();
        Engine::new(vec![self.root()], self.db.clone(), self.store.clone())
    }

    /// Write a unit whose up creates table `t_<label>` and whose down drops it
    pub fn unit(&self, name: &str, deps: &[&str]) -> PathBuf {
        let label = &name[15..];
        self.unit_with(
            name,
            deps,
            &format!("CREATE TABLE t_{label} (id INT);"),
            &format!("DROP TABLE t_{label};"),
        )
    }

    pub fn unit_with(&self, name: &str, deps: &[&str], up: &str, down: &str) -> PathBuf {
        write_unit(&self.root(), name, deps, up, down)
    }

    pub async fn table_exists(&self, name: &str) -> bool {
        use tm_db::Database;
        self.db.relation_exists(name).await.unwrap()
    }
}

pub fn write_unit(dir: &Path, name: &str, deps: &[&str], up: &str, down: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let deps = if deps.is_empty() {
        "dependencies: []\n".to_string()
    } else {
        let items: String = deps.iter().map(|d| format!("  - {d}\n")).collect();
        format!("dependencies:\n{items}")
    };
    let path = dir.join(format!("{name}.yml"));
    std::fs::write(
        &path,
        format!("{deps}up: |\n  {up}\ndown: |\n  {down}\n"),
    )
    .unwrap();
    path
}

pub fn ids(list: &[MigrationId]) -> Vec<&str> {
    list.iter().map(|i| i.as_str()).collect()
}

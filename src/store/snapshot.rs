//! Full-state snapshot and the backends that persist it.
//!
//! The store always saves the complete snapshot; there is no partial write
//! path. [`JsonFileBackend`] writes to a sibling temp file and renames it over
//! the target so a crash mid-write never leaves a truncated file behind.

use crate::error::{PrepError, Result};
use crate::model::{Task, User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Everything the service knows, in one serializable value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: BTreeMap<UserId, User>,
    #[serde(default)]
    pub tasks: BTreeMap<String, Task>,
    #[serde(default)]
    pub deleted_tasks: BTreeMap<String, Task>,
    /// Most recently completed first.
    #[serde(default)]
    pub completed_tasks: Vec<Task>,
}

/// Where snapshots are loaded from and saved to.
pub trait SnapshotBackend: Send + Sync {
    /// Load the last saved snapshot. A backend with nothing saved yet
    /// returns an empty snapshot.
    fn load(&self) -> Result<Snapshot>;

    /// Replace the persisted snapshot.
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "data.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotBackend for JsonFileBackend {
    fn load(&self) -> Result<Snapshot> {
        let bytes = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Snapshot::default());
            }
            Err(e) => {
                return Err(PrepError::Persistence(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )));
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            PrepError::Persistence(format!("cannot parse {}: {e}", self.path.display()))
        })
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| PrepError::Persistence(format!("cannot create data dir: {e}")))?;
        }

        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| PrepError::Persistence(format!("cannot serialize snapshot: {e}")))?;

        let tmp = self.temp_path();
        std::fs::write(&tmp, json)
            .map_err(|e| PrepError::Persistence(format!("cannot write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            PrepError::Persistence(format!("cannot replace {}: {e}", self.path.display()))
        })?;
        Ok(())
    }
}

/// In-process backend. Clones share the same saved state, so a test can keep
/// one handle while the store owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    saved: Arc<Mutex<Snapshot>>,
    fail_saves: Arc<AtomicBool>,
    save_count: Arc<AtomicUsize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            saved: Arc::new(Mutex::new(snapshot)),
            ..Self::default()
        }
    }

    /// Make every subsequent save fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    /// The last successfully saved snapshot.
    pub fn saved(&self) -> Snapshot {
        self.saved.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SnapshotBackend for MemoryBackend {
    fn load(&self) -> Result<Snapshot> {
        Ok(self.saved())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PrepError::Persistence("simulated save failure".to_owned()));
        }
        *self.saved.lock().unwrap_or_else(|e| e.into_inner()) = snapshot.clone();
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

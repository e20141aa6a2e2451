//! Photo file storage.
//!
//! The store only records the reference returned by [`PhotoStorage::store`]
//! and asks for a purge when the task carrying it detaches it or is erased.
//! Each stored file gets a fresh name, so a reference is owned by one task.

use crate::error::{PrepError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// URL prefix under which stored photos are served.
pub const PHOTO_URL_PREFIX: &str = "/photos/";

/// Accepted photo file extensions (lowercase).
pub const ALLOWED_PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

pub trait PhotoStorage: Send + Sync {
    /// Persist `bytes` and return the reference to record on the task.
    fn store(&self, filename: &str, bytes: &[u8]) -> Result<String>;

    /// Delete the file behind `reference`. A file that is already gone is
    /// not an error.
    fn purge(&self, reference: &str) -> Result<()>;
}

/// Reject names without an accepted image extension.
pub fn validate_photo_name(filename: &str) -> Result<()> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if ALLOWED_PHOTO_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(PrepError::Validation(format!(
            "invalid file type for '{filename}'"
        )))
    }
}

/// Keep the final path component and replace anything outside `[A-Za-z0-9._-]`.
fn sanitize_name(filename: &str) -> String {
    let base = filename.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(filename);
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Final path component of a stored reference.
fn reference_basename(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

/// Photos as files in one directory, referenced as `/photos/<uuid>_<name>`.
#[derive(Debug, Clone)]
pub struct FsPhotoStorage {
    dir: PathBuf,
}

impl FsPhotoStorage {
    /// Create the storage, making sure the directory exists.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| PrepError::Photo(format!("cannot create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PhotoStorage for FsPhotoStorage {
    fn store(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        validate_photo_name(filename)?;
        let unique = format!("{}_{}", uuid::Uuid::new_v4(), sanitize_name(filename));
        let path = self.dir.join(&unique);
        std::fs::write(&path, bytes)
            .map_err(|e| PrepError::Photo(format!("cannot write {}: {e}", path.display())))?;
        Ok(format!("{PHOTO_URL_PREFIX}{unique}"))
    }

    fn purge(&self, reference: &str) -> Result<()> {
        let name = reference_basename(reference);
        if name.is_empty() || name == ".." {
            return Ok(());
        }
        match std::fs::remove_file(self.dir.join(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PrepError::Photo(format!("cannot purge {reference}: {e}"))),
        }
    }
}

/// Keeps nothing on disk; records what was stored and purged.
#[derive(Debug, Clone, Default)]
pub struct MemoryPhotoStorage {
    stored: Arc<Mutex<Vec<String>>>,
    purged: Arc<Mutex<Vec<String>>>,
}

impl MemoryPhotoStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// References handed out so far.
    pub fn stored(&self) -> Vec<String> {
        self.stored.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// References purged so far, in order.
    pub fn purged(&self) -> Vec<String> {
        self.purged.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl PhotoStorage for MemoryPhotoStorage {
    fn store(&self, filename: &str, _bytes: &[u8]) -> Result<String> {
        validate_photo_name(filename)?;
        let reference = format!(
            "{PHOTO_URL_PREFIX}{}_{}",
            uuid::Uuid::new_v4(),
            sanitize_name(filename)
        );
        self.stored
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(reference.clone());
        Ok(reference)
    }

    fn purge(&self, reference: &str) -> Result<()> {
        self.purged
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(reference.to_owned());
        Ok(())
    }
}

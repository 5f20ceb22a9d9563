//! Durable snapshot of the current experiment
//!
//! A [`SnapshotBackend`] is a tiny key-value surface holding raw bytes.
//! [`Persistence`] sits on top of one backend and one fixed key and owns the
//! whole contract: `load` once at startup, `save` after every mutation,
//! `purge` on clear. It never lets a storage problem escape as an error:
//! corrupt snapshots are discarded and failed writes are logged, so the
//! session degrades to "changes are session-only".

use crate::error::PersistenceError;
use annotator_schema::{parse_experiment_bytes, Experiment};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Storage key used when none is configured
pub const DEFAULT_STORAGE_KEY: &str = "evaluation_harness_data";

/// Raw key-value storage for snapshots
#[cfg_attr(test, mockall::automock)]
pub trait SnapshotBackend {
    /// Read the blob stored under `key`; `Ok(None)` when nothing is stored
    ///
    /// Bytes are returned undecoded so that a non-UTF-8 blob is treated as
    /// corrupt content rather than as a storage failure.
    ///
    /// # Errors
    /// Returns error if the storage cannot be read.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;

    /// Overwrite the blob stored under `key`
    ///
    /// # Errors
    /// Returns error if the storage cannot be written.
    fn write(&self, key: &str, blob: &str) -> Result<(), PersistenceError>;

    /// Remove the blob stored under `key`; removing nothing is not an error
    ///
    /// # Errors
    /// Returns error if the storage cannot be modified.
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// What a call to [`Persistence::save`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Snapshot overwritten
    Written,
    /// Experiment had no entries; storage left alone
    SkippedEmpty,
    /// Backend refused the write; logged and ignored
    Failed,
}

/// Load/save/purge contract over one backend and one key
#[derive(Debug, Clone)]
pub struct Persistence<B> {
    backend: B,
    key: String,
}

impl<B: SnapshotBackend> Persistence<B> {
    /// Create adapter over `backend` using `key`
    #[inline]
    #[must_use]
    pub fn new(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Create adapter using [`DEFAULT_STORAGE_KEY`]
    #[inline]
    #[must_use]
    pub fn with_default_key(backend: B) -> Self {
        Self::new(backend, DEFAULT_STORAGE_KEY)
    }

    /// Storage key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Underlying backend
    #[inline]
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Read and validate the stored snapshot
    ///
    /// Missing, unreadable, non-JSON and schema-violating snapshots all come
    /// back as `None`; non-UTF-8, non-JSON and schema-violating snapshots are
    /// also purged so the next boot starts clean.
    pub fn load(&self) -> Option<Experiment> {
        let blob = match self.backend.read(&self.key) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                tracing::debug!("No stored snapshot under '{}'", self.key);
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to read stored snapshot: {}", e);
                return None;
            }
        };

        match parse_experiment_bytes(&blob) {
            Ok(experiment) => {
                tracing::info!(
                    "Restored '{}' ({} entries) from storage",
                    experiment.name,
                    experiment.len()
                );
                Some(experiment)
            }
            Err(e) => {
                tracing::warn!("Invalid data in storage, discarding snapshot: {}", e);
                self.purge();
                None
            }
        }
    }

    /// Overwrite the snapshot with `experiment`
    ///
    /// Experiments without entries are never written, so an emptied dataset
    /// cannot mask the bundled sample on the next start.
    pub fn save(&self, experiment: &Experiment) -> SaveOutcome {
        if experiment.is_empty() {
            return SaveOutcome::SkippedEmpty;
        }
        let result = serde_json::to_string(experiment)
            .map_err(PersistenceError::from)
            .and_then(|blob| self.backend.write(&self.key, &blob));
        match result {
            Ok(()) => SaveOutcome::Written,
            Err(e) => {
                tracing::warn!("Failed to persist snapshot, changes are session-only: {}", e);
                SaveOutcome::Failed
            }
        }
    }

    /// Remove the stored snapshot
    pub fn purge(&self) {
        if let Err(e) = self.backend.remove(&self.key) {
            tracing::warn!("Failed to purge stored snapshot: {}", e);
        }
    }
}

/// Snapshot files in one directory, one `<key>.json` per key
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Create backend rooted at `dir` (created lazily on first write)
    #[inline]
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding snapshot files
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`
    #[inline]
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SnapshotBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::io_error(path, e)),
        }
    }

    fn write(&self, key: &str, blob: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key);
        atomic_write(&path, blob.as_bytes()).map_err(|e| PersistenceError::io_error(path, e))
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::io_error(path, e)),
        }
    }
}

/// Write to a sibling temp file, then rename over `path`
///
/// Readers see either the old snapshot or the new one, never a torn file.
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("snapshot");
    let tmp = path.with_file_name(format!(".{}.tmp.{}", name, std::process::id()));
    let result = write_and_rename(&tmp, path, bytes);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_and_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(tmp, path)
}

/// In-process backend
///
/// Clones share the same storage, so a test can keep a handle while the
/// store owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBackend {
    /// Create empty backend
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create backend pre-seeded with one blob
    #[must_use]
    pub fn with_blob(key: impl Into<String>, blob: impl Into<String>) -> Self {
        let backend = Self::new();
        backend.inner.lock().insert(key.into(), blob.into());
        backend
    }

    /// Current blob under `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().get(key).cloned()
    }

    /// Check if anything is stored under `key`
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().contains_key(key)
    }
}

impl SnapshotBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.get(key).map(String::into_bytes))
    }

    fn write(&self, key: &str, blob: &str) -> Result<(), PersistenceError> {
        self.inner.lock().insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.inner.lock().remove(key);
        Ok(())
    }
}

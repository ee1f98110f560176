//! In-memory filesystem keyed by absolute path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::ports::filesystem::{FileSystem, PortError};

/// Filesystem held entirely in memory.
///
/// Directories are implicit: a path "exists" as a directory when any file
/// lives beneath it.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryFileSystem {
    /// Creates an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filesystem pre-populated with `(path, contents)` pairs.
    #[must_use]
    pub fn with_files<P: Into<PathBuf>, C: Into<Vec<u8>>>(
        files: impl IntoIterator<Item = (P, C)>,
    ) -> Self {
        let map = files
            .into_iter()
            .map(|(p, c)| (p.into(), c.into()))
            .collect();
        Self {
            files: Mutex::new(map),
        }
    }

    /// Paths of every stored file, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, PortError> {
        self.lock()
            .get(path)
            .cloned()
            .ok_or_else(|| format!("file not found: {}", path.display()).into())
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), PortError> {
        self.lock().insert(path.to_path_buf(), contents.as_bytes().to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.lock();
        files.contains_key(path) || files.keys().any(|k| k.starts_with(path) && k != path)
    }

    fn modified(&self, _path: &Path) -> Option<DateTime<Utc>> {
        None
    }
}

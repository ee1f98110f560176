//! Live filesystem adapter using `std::fs`.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::ports::filesystem::{FileSystem, PortError};

/// Filesystem adapter backed by real disk I/O.
pub struct LiveFileSystem;

impl FileSystem for LiveFileSystem {
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, PortError> {
        Ok(std::fs::read(path)?)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), PortError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(std::fs::write(path, contents)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn modified(&self, path: &Path) -> Option<DateTime<Utc>> {
        let modified = std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()?;
        Some(DateTime::<Utc>::from(modified))
    }
}

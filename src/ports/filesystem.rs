//! Filesystem port for reading scanned files and persisting generations.

use std::path::Path;

use chrono::{DateTime, Utc};

/// Boxed error returned across the port boundary.
pub type PortError = Box<dyn std::error::Error + Send + Sync>;

/// Provides file access to the scanner and the generation store.
///
/// Workers share one implementation across threads, hence `Send + Sync`.
pub trait FileSystem: Send + Sync {
    /// Reads the raw bytes of a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be read.
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, PortError>;

    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(&self, path: &Path) -> Result<String, PortError> {
        let bytes = self.read_bytes(path)?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Writes the given contents to a file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(&self, path: &Path, contents: &str) -> Result<(), PortError>;

    /// Returns `true` if the path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Last modification time of a file, when the backend knows it.
    fn modified(&self, path: &Path) -> Option<DateTime<Utc>>;
}

//! Clock port used to stamp generations.

use chrono::{DateTime, Utc};

/// Source of the generation timestamp.
///
/// Only generation metadata carries a time; component records never do, which
/// keeps `components.json` byte-stable across re-scans.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

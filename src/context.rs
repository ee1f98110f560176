//! Service context bundling all port trait objects.

use chrono::{DateTime, Utc};

use crate::adapters::live::clock::LiveClock;
use crate::adapters::live::filesystem::LiveFileSystem;
use crate::adapters::live::id_gen::LiveIdGenerator;
use crate::adapters::memory::{FixedClock, MemoryFileSystem, SequentialIdGenerator};
use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;
use crate::ports::id_gen::IdGenerator;

/// Bundles the port trait objects the pipeline and commands need.
///
/// Constructors wire up different adapter implementations (live or in-memory).
pub struct ServiceContext {
    /// Clock for stamping generations.
    pub clock: Box<dyn Clock>,
    /// Filesystem for reading sources and persisting state.
    pub fs: Box<dyn FileSystem>,
    /// Generation id source.
    pub id_gen: Box<dyn IdGenerator>,
}

impl ServiceContext {
    /// Creates a live context backed by the real disk, clock, and UUIDs.
    #[must_use]
    pub fn live() -> Self {
        Self {
            clock: Box::new(LiveClock),
            fs: Box::new(LiveFileSystem),
            id_gen: Box::new(LiveIdGenerator),
        }
    }

    /// Creates a fully deterministic context over an in-memory filesystem.
    ///
    /// The clock is frozen at `now` and generation ids are `gen-0001`,
    /// `gen-0002`, ... in call order.
    #[must_use]
    pub fn in_memory(fs: MemoryFileSystem, now: DateTime<Utc>) -> Self {
        Self {
            clock: Box::new(FixedClock(now)),
            fs: Box::new(fs),
            id_gen: Box::new(SequentialIdGenerator::new("gen")),
        }
    }

    /// Replaces the filesystem while keeping the other ports.
    #[must_use]
    pub fn with_fs(mut self, fs: Box<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }
}

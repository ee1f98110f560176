//! In-memory adapters for deterministic tests of persistence and reporting.

pub mod clock;
pub mod filesystem;
pub mod id_gen;

pub use clock::FixedClock;
pub use filesystem::MemoryFileSystem;
pub use id_gen::SequentialIdGenerator;

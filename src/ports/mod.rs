//! Port traits for the side effects the pipeline performs.
//!
//! Reading source files, persisting generations, stamping reports with a time,
//! and naming generations all go through these traits so the analysis stages
//! stay pure. Implementations live in `src/adapters/`.

pub mod clock;
pub mod filesystem;
pub mod id_gen;

pub use clock::Clock;
pub use filesystem::{FileSystem, PortError};
pub use id_gen::IdGenerator;

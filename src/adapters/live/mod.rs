//! Live adapters backed by the real disk, system clock, and random UUIDs.

pub mod clock;
pub mod filesystem;
pub mod id_gen;

//! Predictable generation ids: `<prefix>-0001`, `<prefix>-0002`, ...

use std::sync::atomic::{AtomicU64, Ordering};

use crate::ports::IdGenerator;

/// Hands out numbered ids in call order.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    /// Creates a generator whose ids start at `<prefix>-0001`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n:04}", self.prefix)
    }
}

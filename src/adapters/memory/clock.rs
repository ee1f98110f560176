//! Clock frozen at a chosen instant.

use chrono::{DateTime, Utc};

use crate::ports::Clock;

/// Always returns the same time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

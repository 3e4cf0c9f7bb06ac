//! Pinned time for conversation tests.

use banter_core::clock::Clock;
use chrono::{DateTime, Utc};

/// Stamps every entry with the same instant, so assertions on
/// `recorded_at` do not depend on the wall clock.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

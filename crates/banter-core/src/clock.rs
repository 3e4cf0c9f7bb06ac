//! Time source for conversation entries.

use chrono::{DateTime, Utc};

/// Stamps `recorded_at` on every appended entry. Injected so tests can pin
/// timestamps.
pub trait Clock: Send + Sync {
    /// The instant an entry is recorded at.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time, used by the server binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

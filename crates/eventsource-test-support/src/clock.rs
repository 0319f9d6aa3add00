//! Deterministic `Clock` implementation for tests.

use chrono::{DateTime, TimeZone, Utc};
use eventsource_core::clock::Clock;

/// A clock that always returns a fixed point in time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// 2009-11-10 23:00:00 UTC, i.e. `1_257_894_000_000_000_000` nanoseconds.
    #[must_use]
    pub fn playground() -> Self {
        Self(Utc.timestamp_opt(1_257_894_000, 0).single().unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

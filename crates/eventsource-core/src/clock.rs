//! Clock abstraction for record timestamps.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Abstraction over system time so saves can be made deterministic.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Current time as nanoseconds since the Unix epoch, the unit stored in
    /// records.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the time is outside the range an
    /// `i64` of nanoseconds can hold (before 1677 or after 2262).
    fn now_nanos(&self) -> Result<i64> {
        let now = self.now();
        now.timestamp_nanos_opt()
            .ok_or_else(|| Error::Configuration(format!("clock time {now} out of range")))
    }
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

use std::time::Instant;
use chrono::{DateTime, Local};

/// Time source for window scheduling and report stamps.
pub trait Clock {
    /// Monotonic time used for window lengths
    fn now(&self) -> Instant;

    /// Wall-clock time printed in report headers
    fn wall(&self) -> DateTime<Local>;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[cfg(test)]
pub use manual::ManualClock;

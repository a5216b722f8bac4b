use std::time::{Duration, Instant};

/// Decides when the current window has run long enough to flush.
///
/// There is no timer: the caller asks after every processed line, so a window
/// lasts at least `interval` and may overshoot by the wait for the next line.
#[derive(Debug, Clone)]
pub struct WindowScheduler {
    interval: Duration,
    last_flush: Instant,
}

impl WindowScheduler {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_flush: now,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time since the last flush, i.e. the length of the current window so far.
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_flush)
    }

    /// Strictly greater than the interval; a check landing exactly on the
    /// boundary still belongs to the current window.
    pub fn should_flush(&self, now: Instant) -> bool {
        self.elapsed(now) > self.interval
    }

    /// Start the next window at the time the flush was detected.
    pub fn mark_flushed(&mut self, now: Instant) {
        self.last_flush = now;
    }
}

//! Time sources for record timestamps.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt;

/// A source of wall-clock time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock stopped at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Sets the current time, backwards included.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: std::time::Duration) {
        let by = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Returns the timestamp for a mutation of a row last updated at `previous`.
///
/// The result is strictly after `previous` even if the clock stalled or went
/// backwards.
pub fn next_timestamp(clock: &dyn Clock, previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = clock.now();
    match previous {
        Some(previous) if now <= previous => previous + chrono::Duration::microseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn manual_clock_moves_on_request() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_secs(10));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(10));
    }

    #[test]
    fn next_timestamp_always_advances() {
        let start = Utc::now();
        let clock = ManualClock::new(start);

        assert_eq!(next_timestamp(&clock, None), start);

        let stalled = next_timestamp(&clock, Some(start));
        assert!(stalled > start);

        clock.set(start - chrono::Duration::hours(1));
        let backwards = next_timestamp(&clock, Some(start));
        assert!(backwards > start);

        clock.set(start + chrono::Duration::seconds(5));
        assert_eq!(next_timestamp(&clock, Some(start)), clock.now());
    }
}

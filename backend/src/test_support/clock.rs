//! Deterministic clock for time-dependent tests.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

/// Clock whose current instant only moves when a test advances it.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use mockable::Clock;
/// use paddock::test_support::clock::MutableClock;
///
/// let start = Utc.with_ymd_and_hms(2026, 3, 1, 14, 0, 0).unwrap();
/// let clock = MutableClock::new(start);
/// clock.advance_seconds(30);
/// assert_eq!((clock.utc() - start).num_seconds(), 30);
/// ```
#[derive(Debug)]
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move time forward by a std duration.
    ///
    /// # Panics
    ///
    /// Panics when `delta` does not fit into a chrono `TimeDelta`.
    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => {
                panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}")
            }
        };
        *self.lock_clock() += delta;
    }

    /// Move time forward by whole seconds.
    pub fn advance_seconds(&self, seconds: i64) {
        *self.lock_clock() += TimeDelta::seconds(seconds);
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

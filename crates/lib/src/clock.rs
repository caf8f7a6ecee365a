//! Time provider abstraction
//!
//! Cache entries carry `createTimestamp` and `lastUpdate` attributes in seconds
//! since the Unix epoch. The [`Clock`] trait lets production code use the
//! system time while tests pin time to known values.
//!
//! # Example
//!
//! ```
//! use idcache::{Clock, SystemClock};
//!
//! let clock = SystemClock;
//! assert!(clock.now_secs() > 0);
//! ```

use std::fmt::Debug;

#[cfg(any(test, feature = "testing"))]
use std::sync::Mutex;

/// A time provider for entry timestamps.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time as seconds since Unix epoch.
    fn now_secs(&self) -> i64;

    /// Timestamp to store as `lastUpdate` on an entry last stamped `previous`.
    ///
    /// Never returns less than `previous`, so a clock stepping backwards cannot
    /// make an entry look older than it was.
    fn next_update(&self, previous: Option<i64>) -> i64 {
        let now = self.now_secs();
        previous.map_or(now, |prev| now.max(prev))
    }
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Test clock pinned to a settable time.
///
/// Unlike [`SystemClock`] this never moves on its own; use [`FixedClock::advance`]
/// and [`FixedClock::set`] to move it, including backwards.
///
/// ```
/// use idcache::{Clock, FixedClock};
///
/// let clock = FixedClock::new(1000);
/// assert_eq!(clock.now_secs(), 1000);
/// clock.advance(5);
/// assert_eq!(clock.now_secs(), 1005);
/// ```
#[cfg(any(test, feature = "testing"))]
pub struct FixedClock {
    secs: Mutex<i64>,
}

#[cfg(any(test, feature = "testing"))]
impl FixedClock {
    /// Create a new fixed clock at the given time in seconds.
    pub fn new(secs: i64) -> Self {
        Self {
            secs: Mutex::new(secs),
        }
    }

    /// Advance the clock by the given number of seconds.
    pub fn advance(&self, secs: i64) {
        *self.secs.lock().unwrap() += secs;
    }

    /// Set the clock to a specific time in seconds.
    pub fn set(&self, secs: i64) {
        *self.secs.lock().unwrap() = secs;
    }
}

#[cfg(any(test, feature = "testing"))]
impl Clock for FixedClock {
    fn now_secs(&self) -> i64 {
        *self.secs.lock().unwrap()
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for FixedClock {
    fn default() -> Self {
        // 2024-01-01 00:00:00 UTC
        Self::new(1_704_067_200)
    }
}

#[cfg(any(test, feature = "testing"))]
impl Debug for FixedClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedClock")
            .field("secs", &*self.secs.lock().unwrap())
            .finish()
    }
}

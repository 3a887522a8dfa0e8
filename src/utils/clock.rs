//! Clock port for event and checkpoint timestamps.
//!
//! History invariants require per-instance timestamps to be non-decreasing.
//! Wall clocks can step backwards (NTP corrections, leap smearing), so the
//! production [`SystemClock`] clamps to the last issued instant. Tests inject
//! a [`ManualClock`] for fully deterministic ordering.

use std::sync::Mutex;
use std::sync::PoisonError;

use chrono::{DateTime, Duration, Utc};

/// Source of UTC timestamps for engine operations.
///
/// Implementations must be monotonically non-decreasing: two consecutive
/// `now()` calls on the same clock never go backwards.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock: `Utc::now()` clamped to never run backwards.
///
/// # Examples
///
/// ```rust
/// use agendaflow::utils::clock::{Clock, SystemClock};
///
/// let clock = SystemClock::new();
/// let a = clock.now();
/// let b = clock.now();
/// assert!(b >= a);
/// ```
#[derive(Debug, Default)]
pub struct SystemClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let mut now = Utc::now();
        if let Some(prev) = *last {
            if now < prev {
                now = prev;
            }
        }
        *last = Some(now);
        now
    }
}

/// Deterministic clock for tests.
///
/// Starts at a fixed instant and advances by a fixed tick on every `now()`
/// call, so successive events get distinct, strictly increasing timestamps.
/// `advance` jumps the clock forward explicitly.
///
/// # Examples
///
/// ```rust
/// use agendaflow::utils::clock::{Clock, ManualClock};
/// use chrono::{Duration, TimeZone, Utc};
///
/// let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
/// let clock = ManualClock::starting_at(start);
/// let first = clock.now();
/// let second = clock.now();
/// assert_eq!(first, start);
/// assert!(second > first);
///
/// clock.advance(Duration::minutes(5));
/// assert!(clock.now() >= start + Duration::minutes(5));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
    tick: Duration,
}

impl ManualClock {
    /// A manual clock positioned at `start`, ticking 1ms per `now()` call.
    #[must_use]
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
            tick: Duration::milliseconds(1),
        }
    }

    /// Override the per-call tick.
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Jump the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let now = *current;
        *current += self.tick;
        now
    }
}

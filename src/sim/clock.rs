use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{NaiveDateTime, TimeDelta};

/// A scheduling clock that yields one instant per tick over a fixed run.
///
/// The `TickClock` advances scheduling time in fixed steps starting at
/// `start`, handing each instant to the caller exactly once.
///
/// # Examples
///
/// ```
/// use appliance_scheduler::sim::clock::TickClock;
/// use chrono::{NaiveDate, TimeDelta};
///
/// let start = NaiveDate::from_ymd_opt(2026, 1, 1)
///     .and_then(|d| d.and_hms_opt(8, 0, 0))
///     .unwrap();
/// let mut clock = TickClock::new(start, TimeDelta::seconds(30), 3);
/// let mut ticks = Vec::new();
///
/// clock.run(|_, now| ticks.push(now));
/// assert_eq!(ticks.len(), 3);
/// assert_eq!(ticks[2] - ticks[0], TimeDelta::seconds(60));
/// ```
#[derive(Debug, Clone)]
pub struct TickClock {
    /// First instant handed out
    start: NaiveDateTime,
    /// Spacing between consecutive instants
    step: TimeDelta,
    /// Index of the next tick
    current: usize,
    /// Total ticks in the run
    total: usize,
}

impl TickClock {
    /// Creates a new clock producing `total` instants spaced by `step`.
    pub fn new(start: NaiveDateTime, step: TimeDelta, total: usize) -> Self {
        Self {
            start,
            step,
            current: 0,
            total,
        }
    }

    /// Advances the clock by one tick.
    ///
    /// # Returns
    ///
    /// * `Some((index, now))` - The tick index (starting from 0) and its instant
    /// * `None` - If the clock has handed out all ticks, or the next instant
    ///   is not representable
    pub fn tick(&mut self) -> Option<(usize, NaiveDateTime)> {
        if self.current >= self.total {
            return None;
        }
        let index = self.current;
        self.current += 1;
        let now = i32::try_from(index)
            .ok()
            .and_then(|i| self.step.checked_mul(i))
            .and_then(|offset| self.start.checked_add_signed(offset));
        if now.is_none() {
            self.current = self.total;
        }
        now.map(|now| (index, now))
    }

    /// Runs a function for each remaining tick.
    pub fn run(&mut self, mut f: impl FnMut(usize, NaiveDateTime)) {
        while let Some((index, now)) = self.tick() {
            f(index, now);
        }
    }
}

/// Wall-clock source in milliseconds.
///
/// Only cache ageing reads this; scheduling decisions use the `now` passed
/// into each call.
pub trait WallClock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Reads the operating system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Settable clock shared between its clones.
///
/// Advancing one handle advances every clone, so a test or the simulation
/// can keep a handle while the scheduler owns another.
#[derive(Default, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(millis)),
        }
    }

    pub fn set_millis(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance_millis(&self, delta: i64) {
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }
}

impl WallClock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("millis", &self.now_millis())
            .finish()
    }
}

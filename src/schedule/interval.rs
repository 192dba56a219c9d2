use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{Result, ScheduleError};

/// A half-open time range `[start, end)`.
///
/// Construction guarantees `start < end`; two intervals are equal iff both
/// bounds match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Interval {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl Interval {
    /// Creates the interval `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidInterval`] if `start >= end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if start >= end {
            return Err(ScheduleError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Returns `true` when `start <= now < end`.
    pub fn contains(&self, now: NaiveDateTime) -> bool {
        self.start <= now && now < self.end
    }

    /// Returns `true` once `now` has reached the exclusive end.
    pub fn is_elapsed(&self, now: NaiveDateTime) -> bool {
        now >= self.end
    }

    /// Returns `true` when both ranges share at least one instant.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Seconds from `now` to the start, negative once started.
    pub fn seconds_until_start(&self, now: NaiveDateTime) -> i64 {
        (self.start - now).num_seconds()
    }

    /// Seconds from `now` to the end, negative once elapsed.
    pub fn seconds_until_end(&self, now: NaiveDateTime) -> i64 {
        (self.end - now).num_seconds()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

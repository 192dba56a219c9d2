//! Error types for schedule admission.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Rejections raised while building intervals or admitting them into a queue.
///
/// Missing collaborator data (no meter, unknown vehicle) never surfaces here;
/// those paths degrade to defaults and log instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid interval: start {start} must be before end {end}")]
    InvalidInterval {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error(
        "interval {start} - {end} overlaps queued interval {conflict_start} - {conflict_end}"
    )]
    OverlapRejected {
        start: NaiveDateTime,
        end: NaiveDateTime,
        conflict_start: NaiveDateTime,
        conflict_end: NaiveDateTime,
    },

    #[error("offset of {offset_min} min from {base} is out of range")]
    OffsetOutOfRange { base: NaiveDateTime, offset_min: i64 },
}

pub type Result<T> = std::result::Result<T, ScheduleError>;

//! API response and query types.

use serde::{Deserialize, Serialize};

use crate::schedule::TimeframeIntervalSnapshot;
use crate::sim::{RunSummary, TickRecord};

/// Combined state response: summary, final queue and latest tick.
#[derive(Debug, Serialize)]
pub struct StateResponse<'a> {
    pub appliance_id: &'a str,
    /// Aggregate run summary.
    pub summary: &'a RunSummary,
    /// Windows still queued after the run.
    pub queue: &'a [TimeframeIntervalSnapshot],
    /// Most recent tick record, absent for an empty run.
    pub latest_tick: Option<&'a TickRecord>,
}

/// Optional range query parameters for the ticks endpoint.
#[derive(Debug, Deserialize)]
pub struct TickQuery {
    /// First tick (inclusive).
    pub from: Option<usize>,
    /// Last tick (inclusive).
    pub to: Option<usize>,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

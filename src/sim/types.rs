//! Per-tick record produced by the runner.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

/// Snapshot of one scheduling tick.
///
/// Captures the selected window, the demand it reported, and how the
/// charger responded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickRecord {
    /// Tick index.
    pub tick: usize,
    /// Scheduling instant of the tick.
    pub timestamp: NaiveDateTime,
    /// Start of the active window, if any.
    pub active_start: Option<NaiveDateTime>,
    /// End of the active window, if any.
    pub active_end: Option<NaiveDateTime>,
    /// Request variant of the active window.
    pub request_kind: Option<&'static str>,
    /// Remaining demand of the active window (seconds or Wh).
    pub demand_max: Option<i64>,
    /// Charging power requested from the charger (kW).
    pub setpoint_kw: Option<f64>,
    /// Charging power actually drawn (kW).
    pub charge_kw: f64,
    /// True vehicle SoC after the tick (percent).
    pub soc: f64,
    /// SoC reported to the schedule on this tick, if a report was due.
    pub reported_soc: Option<f32>,
    /// Windows left in the queue after the tick.
    pub queue_len: usize,
    /// Windows retired since the run started.
    pub retired: usize,
}

impl fmt::Display for TickRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.request_kind.unwrap_or("-");
        let demand = self
            .demand_max
            .map_or_else(|| "-".to_string(), |d| d.to_string());
        write!(
            f,
            "t={:>4} {} | active={:<20} demand={:>7} | charge={:>5.2} kW \
             (SoC={:.1}%) | queued={} retired={}",
            self.tick,
            self.timestamp.format("%Y-%m-%d %H:%M"),
            kind,
            demand,
            self.charge_kw,
            self.soc,
            self.queue_len,
            self.retired,
        )
    }
}

//! Post-hoc run summary computed from tick records.

use std::fmt;

use serde::Serialize;

use super::types::TickRecord;

/// Aggregate figures derived from a complete run.
///
/// Computed post-hoc from `Vec<TickRecord>` so the summary never drifts from
/// the recorded ticks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Number of ticks recorded.
    pub ticks: usize,
    /// Ticks on which a window was active.
    pub active_ticks: usize,
    /// Energy drawn by the charger (kWh).
    pub energy_delivered_kwh: f64,
    /// Highest charging power seen (kW).
    pub peak_charge_kw: f64,
    /// Vehicle SoC after the last tick (percent).
    pub final_soc: f64,
    /// Windows retired over the run.
    pub windows_retired: usize,
    /// Windows still queued after the last tick.
    pub windows_remaining: usize,
}

impl RunSummary {
    /// Computes the summary from the complete tick record vector.
    ///
    /// # Arguments
    ///
    /// * `records` - Complete tick records
    /// * `dt_hours` - Tick duration in hours
    pub fn from_records(records: &[TickRecord], dt_hours: f64) -> Self {
        let Some(last) = records.last() else {
            return Self {
                ticks: 0,
                active_ticks: 0,
                energy_delivered_kwh: 0.0,
                peak_charge_kw: 0.0,
                final_soc: 0.0,
                windows_retired: 0,
                windows_remaining: 0,
            };
        };

        let mut active_ticks = 0_usize;
        let mut energy_kwh = 0.0_f64;
        let mut peak_kw = 0.0_f64;
        for r in records {
            if r.active_start.is_some() {
                active_ticks += 1;
            }
            energy_kwh += r.charge_kw * dt_hours;
            peak_kw = peak_kw.max(r.charge_kw);
        }

        Self {
            ticks: records.len(),
            active_ticks,
            energy_delivered_kwh: energy_kwh,
            peak_charge_kw: peak_kw,
            final_soc: last.soc,
            windows_retired: last.retired,
            windows_remaining: last.queue_len,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Run Summary ---")?;
        writeln!(
            f,
            "Ticks:                 {} ({} with an active window)",
            self.ticks, self.active_ticks
        )?;
        writeln!(f, "Energy delivered:      {:.2} kWh", self.energy_delivered_kwh)?;
        writeln!(f, "Peak charge power:     {:.2} kW", self.peak_charge_kw)?;
        writeln!(f, "Final SoC:             {:.1}%", self.final_soc)?;
        write!(
            f,
            "Windows:               {} retired, {} remaining",
            self.windows_retired, self.windows_remaining
        )
    }
}

//! Closed-loop run of one charger against its timeframe queue.

use chrono::{NaiveDateTime, TimeDelta};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, ScenarioConfig};
use crate::devices::{Device, DeviceContext, SharedMeter, SimulatedCharger, Vehicles};
use crate::error::ScheduleError;
use crate::schedule::{RequestKind, TimeframeIntervalHandler, TimeframeIntervalSnapshot};

use super::clock::{ManualClock, TickClock};
use super::types::TickRecord;

/// Drives a [`TimeframeIntervalHandler`] and a [`SimulatedCharger`] tick by tick.
///
/// Each tick the runner lets the handler pick the active window, feeds the
/// vehicle's SoC back when a report is due or the active window changed, and
/// charges at the power the active request calls for. The wall clock seen by
/// the energy cache advances with simulated time.
#[derive(Debug)]
pub struct Runner {
    handler: TimeframeIntervalHandler,
    charger: SimulatedCharger,
    meter: SharedMeter,
    wall_clock: ManualClock,
    tick_clock: TickClock,
    tick_millis: i64,
    dt_hours: f64,
    surplus_kw: f64,
    soc_report_ticks: usize,
    last_active: Option<(NaiveDateTime, NaiveDateTime)>,
    rejected: Vec<ScheduleError>,
}

impl Runner {
    /// Builds the handler, charger and meter a scenario describes and admits
    /// its windows.
    ///
    /// # Errors
    ///
    /// Returns every validation error if the scenario is invalid.
    pub fn from_config(config: &ScenarioConfig) -> Result<Self, Vec<ConfigError>> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(errors);
        }

        let sim = &config.simulation;
        let vehicles = config.electric_vehicles();
        let connected = vehicles
            .iter()
            .find(|v| v.id == config.charger.ev_id)
            .cloned()
            .ok_or_else(|| {
                vec![ConfigError {
                    field: "charger.ev_id".into(),
                    message: format!("no vehicle with id {}", config.charger.ev_id),
                }]
            })?;

        let meter = SharedMeter::default();
        let wall_clock = ManualClock::new(0);
        let mut handler = TimeframeIntervalHandler::new(sim.appliance_id.clone(), Vehicles::new(vehicles))
            .with_clock(wall_clock.clone());
        if config.meter.enabled {
            handler = handler.with_meter(meter.clone());
        }

        let mut timeframe_intervals = Vec::with_capacity(config.timeframes.len());
        let mut rejected = Vec::new();
        for timeframe in &config.timeframes {
            match timeframe.to_timeframe_interval(sim.start) {
                Ok(tfi) => timeframe_intervals.push(tfi),
                Err(e) => rejected.push(e),
            }
        }
        rejected.extend(handler.fill_queue(sim.start, timeframe_intervals, sim.allow_overlap));
        for e in &rejected {
            warn!(appliance = %sim.appliance_id, "timeframe not admitted: {e}");
        }

        let charger = SimulatedCharger::new(
            config.charger.max_charge_kw,
            &connected,
            config.charger.initial_soc,
            config.charger.soc_noise_std,
            meter.clone(),
            sim.seed,
        );

        info!(
            appliance = %sim.appliance_id,
            queued = handler.queue().len(),
            rejected = rejected.len(),
            ticks = sim.ticks,
            "runner ready"
        );

        Ok(Self {
            handler,
            charger,
            meter,
            wall_clock,
            tick_clock: TickClock::new(sim.start, TimeDelta::seconds(sim.tick_seconds), sim.ticks),
            tick_millis: sim.tick_seconds * 1000,
            dt_hours: sim.tick_seconds as f64 / 3600.0,
            surplus_kw: config.charger.surplus_kw,
            soc_report_ticks: config.charger.soc_report_ticks.max(1),
            last_active: None,
            rejected,
        })
    }

    /// Executes one tick at `now` and returns its record.
    pub fn step(&mut self, tick: usize, now: NaiveDateTime) -> TickRecord {
        let mut snapshot = self.handler.update_queue(now, false);

        let active = snapshot.as_ref().map(|s| (s.start, s.end));
        let report_due = tick % self.soc_report_ticks == 0 || active != self.last_active;
        self.last_active = active;

        let reported_soc = if report_due {
            let soc = self.charger.reported_soc();
            self.handler.on_ev_charger_soc_changed(now, soc);
            // metered energy counts from the latest SoC reading
            self.meter.reset();
            if snapshot.is_some() {
                snapshot = self.handler.update_queue(now, true);
            }
            Some(soc)
        } else {
            None
        };

        let setpoint_kw = snapshot.as_ref().and_then(|s| self.setpoint_kw(s));
        let context = match setpoint_kw {
            Some(kw) => DeviceContext::with_setpoint(self.dt_hours, kw),
            None => DeviceContext::new(self.dt_hours),
        };
        let charge_kw = self.charger.power_kw(&context);
        self.wall_clock.advance_millis(self.tick_millis);

        let record = TickRecord {
            tick,
            timestamp: now,
            active_start: snapshot.as_ref().map(|s| s.start),
            active_end: snapshot.as_ref().map(|s| s.end),
            request_kind: snapshot.as_ref().map(|s| s.request.kind),
            demand_max: snapshot.as_ref().map(|s| s.request.max),
            setpoint_kw,
            charge_kw,
            soc: self.charger.soc(),
            reported_soc,
            queue_len: self.handler.queue().len(),
            retired: self.handler.retired_count(),
        };
        debug!(appliance = %self.handler.appliance_id(), "{record}");
        record
    }

    /// Executes all ticks and returns the complete record vector.
    pub fn run(&mut self) -> Vec<TickRecord> {
        let mut records = Vec::new();
        while let Some((tick, now)) = self.tick_clock.tick() {
            records.push(self.step(tick, now));
        }
        records
    }

    /// Charging power for the active window, `None` when it wants nothing.
    fn setpoint_kw(&self, snapshot: &TimeframeIntervalSnapshot) -> Option<f64> {
        let request = &snapshot.request;
        if request.finished {
            return None;
        }
        let available_kw = if request.optional_energy {
            self.surplus_kw.min(self.charger.max_charge_kw)
        } else {
            self.charger.max_charge_kw
        };
        let runtime = self
            .handler
            .active()
            .is_some_and(|tfi| matches!(tfi.request().kind(), RequestKind::Runtime(_)));
        if runtime {
            Some(available_kw)
        } else {
            // do not draw more than the remaining energy within one tick
            let remaining_kw = request.max as f64 / 1000.0 / self.dt_hours;
            Some(available_kw.min(remaining_kw))
        }
    }

    pub fn handler(&self) -> &TimeframeIntervalHandler {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut TimeframeIntervalHandler {
        &mut self.handler
    }

    /// Tick duration in hours.
    pub fn dt_hours(&self) -> f64 {
        self.dt_hours
    }

    /// Windows that were configured but not admitted.
    pub fn rejected(&self) -> &[ScheduleError] {
        &self.rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RequestType, TimeframeConfig};

    #[test]
    fn invalid_config_is_refused() {
        let mut config = ScenarioConfig::baseline();
        config.simulation.tick_seconds = 0;
        let errors = Runner::from_config(&config).err().unwrap_or_default();
        assert!(errors.iter().any(|e| e.field == "simulation.tick_seconds"));
    }

    #[test]
    fn out_of_range_scenario_is_refused() {
        let toml = r#"
[[vehicles]]
id = 1
battery_capacity_wh = 100000000000000000

[[timeframes]]
start_offset_min = 0
end_offset_min = 9000000000000000
request = "soc"
soc = 80
ev_id = 1
"#;
        let config = ScenarioConfig::from_toml_str(toml).unwrap();
        let errors = Runner::from_config(&config).err().unwrap_or_default();
        assert!(errors.iter().any(|e| e.field == "vehicles[0].battery_capacity_wh"));
        assert!(errors.iter().any(|e| e.field == "timeframes[0].end_offset_min"));
    }

    #[test]
    fn first_tick_activates_and_reports_soc() {
        let config = ScenarioConfig::baseline();
        let mut runner = Runner::from_config(&config).unwrap();
        let record = runner.step(0, config.simulation.start);

        assert_eq!(record.active_start, Some(config.simulation.start));
        assert_eq!(record.reported_soc, Some(20.0));
        // (80 - 20) * 110 * 50_000 / 10_000
        assert_eq!(record.demand_max, Some(33_000));
        assert_eq!(record.setpoint_kw, Some(11.0));
        assert!((record.charge_kw - 11.0).abs() < 1e-9);
    }

    #[test]
    fn baseline_reaches_target_and_retires_window() {
        let config = ScenarioConfig::baseline();
        let mut runner = Runner::from_config(&config).unwrap();
        let records = runner.run();

        assert_eq!(records.len(), config.simulation.ticks);
        let last = records.last().unwrap();
        assert!(last.soc >= 80.0 && last.soc < 81.5, "final SoC {}", last.soc);
        assert_eq!(last.retired, 1);
        assert_eq!(last.queue_len, 0);
        assert!(runner.handler().active().is_none());
    }

    #[test]
    fn idle_before_first_window() {
        let mut config = ScenarioConfig::baseline();
        config.timeframes[0].start_offset_min = 30;
        let mut runner = Runner::from_config(&config).unwrap();
        let records = runner.run();

        assert!(records[..30].iter().all(|r| r.active_start.is_none() && r.charge_kw == 0.0));
        assert!(records[30].active_start.is_some());
    }

    #[test]
    fn overlapping_windows_rejected_without_overlap_policy() {
        let mut config = ScenarioConfig::overlap();
        config.simulation.allow_overlap = false;
        let runner = Runner::from_config(&config).unwrap();

        assert_eq!(runner.handler().queue().len(), 1);
        assert!(matches!(
            runner.rejected(),
            [ScheduleError::OverlapRejected { .. }]
        ));
    }

    #[test]
    fn disabled_window_never_charges() {
        let mut config = ScenarioConfig::baseline();
        config.timeframes = vec![TimeframeConfig {
            start_offset_min: 0,
            end_offset_min: 60,
            request: RequestType::Soc,
            min_seconds: None,
            max_seconds: None,
            soc: Some(80),
            ev_id: Some(1),
            enabled: false,
        }];
        config.simulation.ticks = 90;
        let mut runner = Runner::from_config(&config).unwrap();
        let records = runner.run();

        assert!(records.iter().all(|r| r.charge_kw == 0.0));
        assert_eq!(records.last().map(|r| r.retired), Some(1));
    }
}

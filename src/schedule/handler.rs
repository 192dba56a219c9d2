//! Queue of timeframe intervals for one appliance.
//!
//! The handler is driven by [`TimeframeIntervalHandler::update_queue`] once
//! per scheduling tick. Each tick retires elapsed or satisfied windows,
//! activates the earliest enabled window containing `now`, and evaluates its
//! request. One handler serves one appliance and is not shared between
//! threads while a tick runs.

use std::fmt;

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::devices::meter::Meter;
use crate::devices::types::RequestContext;
use crate::devices::vehicle::VehicleRegistry;
use crate::error::{Result, ScheduleError};
use crate::schedule::interval::Interval;
use crate::schedule::state::TimeframeIntervalState;
use crate::schedule::timeframe::{TimeframeInterval, TimeframeIntervalSnapshot};
use crate::sim::clock::{SystemClock, WallClock};

/// Collaborators injected into a handler at construction.
struct Collaborators {
    appliance_id: String,
    meter: Option<Box<dyn Meter>>,
    vehicles: Box<dyn VehicleRegistry>,
    clock: Box<dyn WallClock>,
}

impl Collaborators {
    fn context(&self) -> RequestContext<'_> {
        RequestContext {
            appliance_id: &self.appliance_id,
            meter: self.meter.as_deref(),
            vehicles: self.vehicles.as_ref(),
            clock: self.clock.as_ref(),
        }
    }
}

fn change_state(appliance: &str, tfi: &mut TimeframeInterval, next: TimeframeIntervalState) -> bool {
    let from = tfi.state();
    let changed = tfi.transition(next);
    if changed {
        debug!(appliance, interval = %tfi.interval(), %from, to = %next, "state change");
    }
    changed
}

/// Ordered queue of timeframe intervals, earliest start first.
pub struct TimeframeIntervalHandler {
    collaborators: Collaborators,
    queue: Vec<TimeframeInterval>,
    retired: usize,
}

impl TimeframeIntervalHandler {
    /// Creates an empty handler without a meter, ageing caches on the system clock.
    pub fn new(appliance_id: impl Into<String>, vehicles: impl VehicleRegistry + 'static) -> Self {
        Self {
            collaborators: Collaborators {
                appliance_id: appliance_id.into(),
                meter: None,
                vehicles: Box::new(vehicles),
                clock: Box::new(SystemClock),
            },
            queue: Vec::new(),
            retired: 0,
        }
    }

    pub fn with_meter(mut self, meter: impl Meter + 'static) -> Self {
        self.collaborators.meter = Some(Box::new(meter));
        self
    }

    pub fn with_clock(mut self, clock: impl WallClock + 'static) -> Self {
        self.collaborators.clock = Box::new(clock);
        self
    }

    pub fn appliance_id(&self) -> &str {
        &self.collaborators.appliance_id
    }

    /// Queued timeframe intervals in schedule order.
    pub fn queue(&self) -> &[TimeframeInterval] {
        &self.queue
    }

    /// Number of intervals retired by ticks or removed since construction.
    pub fn retired_count(&self) -> usize {
        self.retired
    }

    /// The interval selected by the last tick, if any.
    pub fn active(&self) -> Option<&TimeframeInterval> {
        self.queue
            .iter()
            .find(|tfi| tfi.state() == TimeframeIntervalState::Active)
    }

    /// Admits a timeframe interval, ordered by start time.
    ///
    /// Intervals with equal starts keep their admission order.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::OverlapRejected`] if `allow_overlap` is false
    /// and a queued interval overlaps; the queue is left unchanged.
    pub fn add_timeframe_interval(
        &mut self,
        now: NaiveDateTime,
        timeframe_interval: TimeframeInterval,
        allow_overlap: bool,
    ) -> Result<()> {
        let interval = *timeframe_interval.interval();
        if !allow_overlap {
            if let Some(conflict) = self
                .queue
                .iter()
                .find(|queued| queued.interval().overlaps(&interval))
            {
                let conflict = *conflict.interval();
                debug!(
                    appliance = %self.collaborators.appliance_id,
                    %interval,
                    %conflict,
                    "rejecting overlapping timeframe interval"
                );
                return Err(ScheduleError::OverlapRejected {
                    start: interval.start(),
                    end: interval.end(),
                    conflict_start: conflict.start(),
                    conflict_end: conflict.end(),
                });
            }
        }

        let position = self
            .queue
            .partition_point(|queued| queued.interval().start() <= interval.start());
        info!(
            appliance = %self.collaborators.appliance_id,
            seconds_until_start = interval.seconds_until_start(now),
            "adding timeframe interval {timeframe_interval}"
        );
        self.queue.insert(position, timeframe_interval);
        Ok(())
    }

    /// Admits a batch of intervals, returning the rejections.
    pub fn fill_queue(
        &mut self,
        now: NaiveDateTime,
        timeframe_intervals: impl IntoIterator<Item = TimeframeInterval>,
        allow_overlap: bool,
    ) -> Vec<ScheduleError> {
        timeframe_intervals
            .into_iter()
            .filter_map(|tfi| self.add_timeframe_interval(now, tfi, allow_overlap).err())
            .collect()
    }

    /// Removes the queued interval with exactly this range.
    pub fn remove_timeframe_interval(&mut self, interval: &Interval) -> Option<TimeframeInterval> {
        let position = self
            .queue
            .iter()
            .position(|queued| queued.interval() == interval)?;
        let mut removed = self.queue.remove(position);
        change_state(
            &self.collaborators.appliance_id,
            &mut removed,
            TimeframeIntervalState::Finished,
        );
        self.retired += 1;
        info!(
            appliance = %self.collaborators.appliance_id,
            "removed timeframe interval {removed}"
        );
        Some(removed)
    }

    /// Enables or disables the request of the queued interval with this range.
    ///
    /// Returns `false` if no such interval is queued. Takes effect on the next tick.
    pub fn set_enabled(&mut self, interval: &Interval, enabled: bool) -> bool {
        match self.queue.iter_mut().find(|queued| queued.interval() == interval) {
            Some(tfi) => {
                tfi.request_mut().set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Drops every queued interval.
    pub fn clear_queue(&mut self) {
        debug!(appliance = %self.collaborators.appliance_id, "clearing queue");
        self.retired += self.queue.len();
        self.queue.clear();
    }

    /// Runs one scheduling tick at `now` and returns the active interval's view.
    ///
    /// `force_reevaluation` drops cached SoC energy so every request is
    /// recomputed on this tick.
    pub fn update_queue(
        &mut self,
        now: NaiveDateTime,
        force_reevaluation: bool,
    ) -> Option<TimeframeIntervalSnapshot> {
        let ctx = self.collaborators.context();
        let appliance = ctx.appliance_id;

        if force_reevaluation {
            for tfi in &mut self.queue {
                tfi.request_mut().invalidate();
            }
        }

        let mut retained = Vec::with_capacity(self.queue.len());
        for mut tfi in self.queue.drain(..) {
            let elapsed = tfi.interval().is_elapsed(now);
            if elapsed || tfi.request_mut().is_finished(now, &ctx) {
                change_state(appliance, &mut tfi, TimeframeIntervalState::Finished);
                self.retired += 1;
                info!(
                    appliance,
                    elapsed, "retiring timeframe interval {tfi}"
                );
            } else {
                retained.push(tfi);
            }
        }
        self.queue = retained;

        let selected = self
            .queue
            .iter()
            .position(|tfi| tfi.interval().contains(now) && tfi.request().is_enabled());

        for (index, tfi) in self.queue.iter_mut().enumerate() {
            if Some(index) == selected {
                if tfi.state() != TimeframeIntervalState::Active {
                    change_state(appliance, tfi, TimeframeIntervalState::Active);
                    info!(appliance, "activated timeframe interval {tfi}");
                }
            } else if tfi.state() == TimeframeIntervalState::Active {
                change_state(appliance, tfi, TimeframeIntervalState::Queued);
                debug!(appliance, "deactivated timeframe interval {tfi}");
            }
        }

        let index = selected?;
        let snapshot = self.queue.get_mut(index)?.snapshot(now, &ctx);
        debug!(
            appliance,
            min = ?snapshot.request.min,
            max = snapshot.request.max,
            "active request evaluated"
        );
        Some(snapshot)
    }

    /// Hands a live SoC reading to the queue; only the active interval uses it.
    pub fn on_ev_charger_soc_changed(&mut self, now: NaiveDateTime, soc: f32) {
        let appliance = &self.collaborators.appliance_id;
        for tfi in &mut self.queue {
            tfi.on_ev_charger_soc_changed(appliance, now, soc);
        }
    }

    /// Read-only views of every queued interval evaluated at `now`.
    pub fn inspect(&mut self, now: NaiveDateTime) -> Vec<TimeframeIntervalSnapshot> {
        let ctx = self.collaborators.context();
        self.queue
            .iter_mut()
            .map(|tfi| tfi.snapshot(now, &ctx))
            .collect()
    }
}

impl fmt::Debug for TimeframeIntervalHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeframeIntervalHandler")
            .field("appliance_id", &self.collaborators.appliance_id)
            .field("has_meter", &self.collaborators.meter.is_some())
            .field("queue", &self.queue)
            .field("retired", &self.retired)
            .finish()
    }
}

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::devices::types::RequestContext;
use crate::schedule::interval::Interval;
use crate::schedule::request::Request;
use crate::schedule::state::TimeframeIntervalState;

/// A time window bound to the request it carries and its lifecycle state.
///
/// Equality is structural over interval, request and state.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeframeInterval {
    interval: Interval,
    request: Request,
    state: TimeframeIntervalState,
}

impl TimeframeInterval {
    /// Creates a queued timeframe interval.
    pub fn new(interval: Interval, request: Request) -> Self {
        Self::with_state(TimeframeIntervalState::Queued, interval, request)
    }

    /// Creates a timeframe interval already in `state`.
    pub fn with_state(state: TimeframeIntervalState, interval: Interval, request: Request) -> Self {
        let mut request = request;
        request.set_active(state == TimeframeIntervalState::Active);
        Self {
            interval,
            request,
            state,
        }
    }

    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    pub fn state(&self) -> TimeframeIntervalState {
        self.state
    }

    /// Moves to `next`, keeping the request's active flag in step.
    ///
    /// Returns `false` and leaves the state untouched for illegal moves.
    pub fn transition(&mut self, next: TimeframeIntervalState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        self.request.set_active(next == TimeframeIntervalState::Active);
        true
    }

    /// Forwards a live SoC reading; only active intervals pass it on.
    pub fn on_ev_charger_soc_changed(&mut self, appliance: &str, now: NaiveDateTime, soc: f32) {
        self.request.on_ev_charger_soc_changed(appliance, now, soc);
    }

    /// Evaluates the request at `now` into a read-only view.
    pub fn snapshot(&mut self, now: NaiveDateTime, ctx: &RequestContext<'_>) -> TimeframeIntervalSnapshot {
        let min = self.request.get_min(now, ctx);
        let max = self.request.get_max(now, ctx);
        TimeframeIntervalSnapshot {
            start: self.interval.start(),
            end: self.interval.end(),
            state: self.state,
            request: RequestSnapshot {
                kind: self.request.kind_name(),
                min,
                max,
                enabled: self.request.is_enabled(),
                finished: max <= 0,
                optional_energy: self.request.is_using_optional_energy(),
            },
        }
    }
}

impl fmt::Display for TimeframeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.state, self.interval, self.request)
    }
}

/// Point-in-time view of a request's demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestSnapshot {
    pub kind: &'static str,
    /// Seconds for runtime requests, Wh for SoC requests.
    pub min: Option<i64>,
    pub max: i64,
    pub enabled: bool,
    pub finished: bool,
    pub optional_energy: bool,
}

/// Point-in-time view of a queued timeframe interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeframeIntervalSnapshot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub state: TimeframeIntervalState,
    pub request: RequestSnapshot,
}

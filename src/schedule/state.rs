use std::fmt;

use serde::Serialize;

/// Lifecycle position of a timeframe interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeframeIntervalState {
    /// Admitted, waiting for its window (or for an earlier window to finish).
    Queued,
    /// Selected by the handler; its request drives the appliance.
    Active,
    /// Elapsed or satisfied; about to leave the queue.
    Finished,
}

impl TimeframeIntervalState {
    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// `Active -> Queued` happens when an earlier or re-enabled window takes
    /// over; nothing leaves `Finished`.
    pub fn can_transition_to(self, next: TimeframeIntervalState) -> bool {
        use TimeframeIntervalState::{Active, Finished, Queued};
        match (self, next) {
            (Finished, _) => false,
            (Queued, Active | Finished) | (Active, Queued | Finished) => true,
            (Queued, Queued) | (Active, Active) => false,
        }
    }
}

impl fmt::Display for TimeframeIntervalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Queued => "QUEUED",
            Self::Active => "ACTIVE",
            Self::Finished => "FINISHED",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::TimeframeIntervalState::{Active, Finished, Queued};

    #[test]
    fn finished_is_terminal() {
        assert!(!Finished.can_transition_to(Queued));
        assert!(!Finished.can_transition_to(Active));
    }

    #[test]
    fn queued_and_active_alternate() {
        assert!(Queued.can_transition_to(Active));
        assert!(Active.can_transition_to(Queued));
        assert!(Active.can_transition_to(Finished));
        assert!(Queued.can_transition_to(Finished));
        assert!(!Active.can_transition_to(Active));
    }
}

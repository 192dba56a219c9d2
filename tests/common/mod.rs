//! Shared test fixtures for integration tests.

use chrono::{NaiveDate, NaiveDateTime};

use appliance_scheduler::devices::{ElectricVehicle, SharedMeter, Vehicles};
use appliance_scheduler::schedule::{Interval, TimeframeIntervalHandler};
use appliance_scheduler::sim::clock::ManualClock;

/// Appliance id used by every fixture handler.
pub const APPLIANCE_ID: &str = "F-00000001-000000000001-00";

/// Instant on the fixture day (2026-06-01).
pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 6, 1)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .expect("fixture time should be valid")
}

/// Window between two full hours of the fixture day.
pub fn hours(from: u32, to: u32) -> Interval {
    Interval::new(at(from, 0), at(to, 0)).expect("fixture interval should be valid")
}

/// Default vehicle (id 1, 50 kWh, 10% charge loss).
pub fn default_vehicle() -> ElectricVehicle {
    ElectricVehicle::new(1, "Nissan Leaf", 50_000).with_charge_loss(10)
}

/// Handler with the default vehicle, a manual clock and a shared meter.
///
/// Returns `(handler, clock, meter)`; the clock and meter handles observe
/// the same state the handler reads.
pub fn metered_handler() -> (TimeframeIntervalHandler, ManualClock, SharedMeter) {
    let clock = ManualClock::new(0);
    let meter = SharedMeter::default();
    let handler = TimeframeIntervalHandler::new(APPLIANCE_ID, Vehicles::new(vec![default_vehicle()]))
        .with_clock(clock.clone())
        .with_meter(meter.clone());
    (handler, clock, meter)
}

/// Handler without a meter or known vehicles.
pub fn bare_handler() -> (TimeframeIntervalHandler, ManualClock) {
    let clock = ManualClock::new(0);
    let handler =
        TimeframeIntervalHandler::new(APPLIANCE_ID, Vehicles::default()).with_clock(clock.clone());
    (handler, clock)
}

//! Timeframe-request scheduling for smart appliances and EV chargers.
//!
//! A [`schedule::TimeframeIntervalHandler`] keeps the windows in which an
//! appliance should run and, once per tick, decides which one is active and
//! how much runtime or energy it still asks for. Electric vehicle windows
//! express their demand as a target state of charge that is converted to Wh.

#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod devices;
pub mod error;
pub mod io;
pub mod schedule;
/// Clocks, the closed-loop runner and run summaries.
pub mod sim;

//! Collaborators of the scheduling core: meter, vehicles and the charger model.

/// Simulated EV charger model.
pub mod ev_charger;
/// Cumulative energy meters.
pub mod meter;
pub mod types;
/// Electric vehicles and their registry.
pub mod vehicle;

// Re-export the main types for convenience
pub use ev_charger::SimulatedCharger;
pub use meter::{Meter, SharedMeter};
pub use types::{Device, DeviceContext, RequestContext};
pub use vehicle::{ElectricVehicle, VehicleRegistry, Vehicles};

//! Common types shared by the scheduling core and its collaborators.

use rand::{Rng, rngs::StdRng};

use crate::devices::meter::Meter;
use crate::devices::vehicle::VehicleRegistry;
use crate::sim::clock::WallClock;

/// Collaborators handed to every request evaluation.
/// Includes the owning appliance id and the injected meter, vehicles and clock.
/// # Fields
/// * `appliance_id` - Appliance the evaluated request belongs to (log field)
/// * `meter` - Energy meter, `None` when the appliance has no meter configured
/// * `vehicles` - Vehicle registry resolving `ev_id` references
/// * `clock` - Wall clock used for energy cache ageing
#[derive(Clone, Copy)]
pub struct RequestContext<'a> {
    pub appliance_id: &'a str,
    pub meter: Option<&'a dyn Meter>,
    pub vehicles: &'a dyn VehicleRegistry,
    pub clock: &'a dyn WallClock,
}

impl<'a> RequestContext<'a> {
    /// Creates a context for an appliance without a meter.
    pub fn new(
        appliance_id: &'a str,
        vehicles: &'a dyn VehicleRegistry,
        clock: &'a dyn WallClock,
    ) -> Self {
        Self {
            appliance_id,
            meter: None,
            vehicles,
            clock,
        }
    }

    /// Creates a context that reads metered energy from `meter`.
    pub fn with_meter(
        appliance_id: &'a str,
        meter: &'a dyn Meter,
        vehicles: &'a dyn VehicleRegistry,
        clock: &'a dyn WallClock,
    ) -> Self {
        Self {
            appliance_id,
            meter: Some(meter),
            vehicles,
            clock,
        }
    }
}

/// Contextual information passed to simulated devices on each tick.
/// # Fields
/// * `dt_hours` - Tick length in hours
/// * `setpoint_kw` - Optional power setpoint for controllable devices (kW)
#[derive(Debug, Clone, Copy)]
pub struct DeviceContext {
    pub dt_hours: f64,
    pub setpoint_kw: Option<f64>,
}

impl DeviceContext {
    /// Creates a new DeviceContext with no setpoint.
    pub fn new(dt_hours: f64) -> Self {
        Self {
            dt_hours,
            setpoint_kw: None,
        }
    }

    /// Creates a new DeviceContext with the given setpoint.
    pub fn with_setpoint(dt_hours: f64, setpoint_kw: f64) -> Self {
        Self {
            dt_hours,
            setpoint_kw: Some(setpoint_kw),
        }
    }
}

/// A simulated device drawing power on each tick.
pub trait Device {
    /// Returns the power drawn during the tick in kilowatts (kW).
    ///
    /// Devices draw nothing unless `context.setpoint_kw` allows it.
    fn power_kw(&mut self, context: &DeviceContext) -> f64;
}

/// Utility function to generate Gaussian noise using Box-Muller transform.
///
/// # Arguments
///
/// * `rng` - Random number generator
/// * `std_dev` - Standard deviation of the noise
///
/// # Returns
///
/// Random value from a Gaussian distribution with mean 0 and specified standard deviation
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f32) -> f32 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f32 = rng.random::<f32>().clamp(1e-6, 1.0);
    let u2: f32 = rng.random::<f32>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
    z0 * std_dev
}

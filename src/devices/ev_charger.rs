use crate::devices::meter::{Meter, SharedMeter};
use crate::devices::types::{Device, DeviceContext, gaussian_noise};
use crate::devices::vehicle::ElectricVehicle;
use rand::{SeedableRng, rngs::StdRng};

/// A wallbox with one connected vehicle, used to close the scheduling loop.
///
/// Each tick the charger draws up to `max_charge_kw`, further limited by the
/// context setpoint. Delivered energy is written to the appliance meter and,
/// after charge loss, raises the vehicle's state of charge. The SoC it
/// reports carries optional Gaussian sensor noise.
#[derive(Debug, Clone)]
pub struct SimulatedCharger {
    /// Maximum charging power in kilowatts.
    pub max_charge_kw: f64,

    /// Usable battery capacity of the connected vehicle in Wh.
    battery_capacity_wh: f64,

    /// Charge loss of the connected vehicle in percent.
    charge_loss_pct: f64,

    /// True state of charge in percent (0..100).
    soc: f64,

    /// Standard deviation of reported SoC noise in percentage points.
    pub soc_noise_std: f32,

    meter: SharedMeter,
    rng: StdRng,
}

impl SimulatedCharger {
    /// Creates a new charger with the specified vehicle connected.
    ///
    /// # Arguments
    ///
    /// * `max_charge_kw` - Maximum charging power in kW (must be > 0)
    /// * `vehicle` - Connected vehicle
    /// * `initial_soc` - SoC of the vehicle when plugged in (0..100)
    /// * `soc_noise_std` - Noise on reported SoC (percentage points)
    /// * `meter` - Meter the delivered energy is written to
    /// * `seed` - Random seed for reproducible SoC noise
    ///
    /// # Panics
    ///
    /// Panics if `max_charge_kw` <= 0 or `initial_soc` is outside 0..=100.
    pub fn new(
        max_charge_kw: f64,
        vehicle: &ElectricVehicle,
        initial_soc: f64,
        soc_noise_std: f32,
        meter: SharedMeter,
        seed: u64,
    ) -> Self {
        assert!(max_charge_kw > 0.0);
        assert!((0.0..=100.0).contains(&initial_soc));

        Self {
            max_charge_kw,
            battery_capacity_wh: vehicle.battery_capacity_wh as f64,
            charge_loss_pct: vehicle.charge_loss_pct as f64,
            soc: initial_soc,
            soc_noise_std,
            meter,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// True state of charge in percent.
    pub fn soc(&self) -> f64 {
        self.soc
    }

    /// State of charge as the vehicle's sensor reports it.
    pub fn reported_soc(&mut self) -> f32 {
        let noisy = self.soc as f32 + gaussian_noise(&mut self.rng, self.soc_noise_std);
        noisy.clamp(0.0, 100.0)
    }

    /// Energy metered since the charger was created in kWh.
    pub fn metered_kwh(&self) -> f64 {
        self.meter.energy_kwh()
    }
}

impl Device for SimulatedCharger {
    /// Returns actual charging power after applying setpoint cap.
    fn power_kw(&mut self, context: &DeviceContext) -> f64 {
        let Some(setpoint_kw) = context.setpoint_kw else {
            return 0.0;
        };
        if self.soc >= 100.0 || context.dt_hours <= 0.0 {
            return 0.0;
        }

        let headroom_wh =
            (100.0 - self.soc) / 100.0 * (100.0 + self.charge_loss_pct) / 100.0
                * self.battery_capacity_wh;
        let headroom_kw = headroom_wh / 1000.0 / context.dt_hours;
        let charge_kw = setpoint_kw
            .min(self.max_charge_kw)
            .min(headroom_kw)
            .max(0.0);

        let delivered_kwh = charge_kw * context.dt_hours;
        self.meter.add_energy_kwh(delivered_kwh);

        if charge_kw >= headroom_kw {
            self.soc = 100.0;
        } else {
            let stored_wh = delivered_kwh * 1000.0 * 100.0 / (100.0 + self.charge_loss_pct);
            self.soc = (self.soc + stored_wh / self.battery_capacity_wh * 100.0).min(100.0);
        }

        charge_kw
    }
}

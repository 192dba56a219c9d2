use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative energy meter of an appliance.
pub trait Meter: Send + Sync {
    /// Energy metered so far in kWh.
    fn energy_kwh(&self) -> f64;
}

/// Meter whose reading is written by its owner and read through clones.
///
/// The scheduler holds one handle while the charging model writes the
/// reading through another.
#[derive(Debug, Clone, Default)]
pub struct SharedMeter {
    /// `f64` bit pattern of the reading in kWh.
    bits: Arc<AtomicU64>,
}

impl SharedMeter {
    pub fn new(energy_kwh: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(energy_kwh.to_bits())),
        }
    }

    pub fn set_energy_kwh(&self, energy_kwh: f64) {
        self.bits.store(energy_kwh.to_bits(), Ordering::SeqCst);
    }

    pub fn add_energy_kwh(&self, delta_kwh: f64) {
        self.set_energy_kwh(self.energy_kwh() + delta_kwh);
    }

    /// Zeroes the reading, e.g. when a new charging session starts.
    pub fn reset(&self) {
        self.set_energy_kwh(0.0);
    }
}

impl Meter for SharedMeter {
    fn energy_kwh(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

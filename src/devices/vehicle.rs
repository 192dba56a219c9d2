/// Electric vehicle known to a charger.
#[derive(Debug, Clone, PartialEq)]
pub struct ElectricVehicle {
    /// Identifier referenced by SoC requests.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Usable battery capacity in Wh.
    pub battery_capacity_wh: i64,
    /// Energy overhead lost while charging, in percent.
    pub charge_loss_pct: i64,
    /// Target SoC used by optional-energy requests that do not set one.
    pub default_soc_optional_energy: Option<u8>,
}

impl ElectricVehicle {
    /// Battery capacity assumed when a vehicle cannot be resolved (100 kWh).
    pub const DEFAULT_BATTERY_CAPACITY_WH: i64 = 100_000;
    /// Charge loss assumed when a vehicle cannot be resolved.
    pub const DEFAULT_CHARGE_LOSS_PCT: i64 = 10;

    /// Creates a vehicle with the default charge loss.
    pub fn new(id: u32, name: impl Into<String>, battery_capacity_wh: i64) -> Self {
        Self {
            id,
            name: name.into(),
            battery_capacity_wh,
            charge_loss_pct: Self::DEFAULT_CHARGE_LOSS_PCT,
            default_soc_optional_energy: None,
        }
    }

    pub fn with_charge_loss(mut self, charge_loss_pct: i64) -> Self {
        self.charge_loss_pct = charge_loss_pct;
        self
    }

    pub fn with_default_soc_optional_energy(mut self, soc: u8) -> Self {
        self.default_soc_optional_energy = Some(soc);
        self
    }
}

/// Lookup of vehicles by id. Requests hold ids, never the vehicle itself.
pub trait VehicleRegistry: Send + Sync {
    fn resolve(&self, ev_id: u32) -> Option<&ElectricVehicle>;
}

/// Vehicles configured for one charger.
#[derive(Debug, Clone, Default)]
pub struct Vehicles {
    vehicles: Vec<ElectricVehicle>,
}

impl Vehicles {
    pub fn new(vehicles: Vec<ElectricVehicle>) -> Self {
        Self { vehicles }
    }

}

impl VehicleRegistry for Vehicles {
    fn resolve(&self, ev_id: u32) -> Option<&ElectricVehicle> {
        self.vehicles.iter().find(|v| v.id == ev_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_by_id() {
        let vehicles = Vehicles::new(vec![
            ElectricVehicle::new(1, "Zoe", 52_000),
            ElectricVehicle::new(2, "Model 3", 75_000).with_charge_loss(12),
        ]);
        assert_eq!(vehicles.resolve(2).map(|v| v.charge_loss_pct), Some(12));
        assert_eq!(vehicles.resolve(1).map(|v| v.charge_loss_pct), Some(10));
        assert!(vehicles.resolve(3).is_none());
    }
}

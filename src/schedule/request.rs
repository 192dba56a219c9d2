//! Demand contracts carried by timeframe intervals.
//!
//! A [`Request`] answers, for a given instant, how much the appliance must
//! (`min`) and may (`max`) run or charge, and whether the demand is already
//! satisfied. Runtime requests carry static bounds in seconds; SoC requests
//! derive an energy need in Wh from the connected vehicle and the meter.

use std::fmt;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::devices::types::RequestContext;
use crate::devices::vehicle::ElectricVehicle;

/// Milliseconds a computed SoC energy value is served from cache.
pub const ENERGY_CACHE_MILLIS: i64 = 5_000;

/// Target SoC used when none is configured.
pub const DEFAULT_TARGET_SOC: u8 = 100;

/// Initial SoC used until the vehicle reports one.
pub const DEFAULT_INITIAL_SOC: u8 = 0;

/// Demand request with its participation gate.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    enabled: bool,
    /// Mirrors whether the owning timeframe interval is active.
    active: bool,
    kind: RequestKind,
}

/// The demand variants a timeframe interval can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    /// Fixed min/max runtime in seconds.
    Runtime(RuntimeRequest),
    /// Mandatory energy to reach a target SoC.
    Soc(SocRequest),
    /// Energy to reach a target SoC that may go unmet.
    OptionalEnergySoc(SocRequest),
}

impl Request {
    /// Creates an enabled request of the given kind.
    pub fn new(kind: RequestKind) -> Self {
        Self {
            enabled: true,
            active: false,
            kind,
        }
    }

    pub fn runtime(min: Option<i64>, max: i64) -> Self {
        Self::new(RequestKind::Runtime(RuntimeRequest::new(min, max)))
    }

    pub fn soc(soc: Option<u8>, ev_id: Option<u32>) -> Self {
        Self::new(RequestKind::Soc(SocRequest::new(soc, ev_id)))
    }

    pub fn optional_energy_soc(soc: Option<u8>, ev_id: Option<u32>) -> Self {
        Self::new(RequestKind::OptionalEnergySoc(SocRequest::new(soc, ev_id)))
    }

    pub fn kind(&self) -> &RequestKind {
        &self.kind
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            RequestKind::Runtime(_) => "runtime",
            RequestKind::Soc(_) => "soc",
            RequestKind::OptionalEnergySoc(_) => "optional_energy_soc",
        }
    }

    /// The SoC part of SoC-bearing variants.
    pub fn soc_request(&self) -> Option<&SocRequest> {
        match &self.kind {
            RequestKind::Soc(soc) | RequestKind::OptionalEnergySoc(soc) => Some(soc),
            RequestKind::Runtime(_) => None,
        }
    }

    pub fn soc_request_mut(&mut self) -> Option<&mut SocRequest> {
        match &mut self.kind {
            RequestKind::Soc(soc) | RequestKind::OptionalEnergySoc(soc) => Some(soc),
            RequestKind::Runtime(_) => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether the owning timeframe interval is currently active.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether unmet energy is acceptable rather than mandatory.
    pub fn is_using_optional_energy(&self) -> bool {
        matches!(self.kind, RequestKind::OptionalEnergySoc(_))
    }

    /// Lower demand bound: seconds for runtime requests, Wh for SoC requests.
    pub fn get_min(&mut self, now: NaiveDateTime, ctx: &RequestContext<'_>) -> Option<i64> {
        match &mut self.kind {
            RequestKind::Runtime(runtime) => runtime.get_min(now),
            RequestKind::Soc(soc) => Some(soc.energy_wh(false, ctx)),
            RequestKind::OptionalEnergySoc(soc) => Some(soc.energy_wh(true, ctx)),
        }
    }

    /// Upper demand bound: seconds for runtime requests, Wh for SoC requests.
    pub fn get_max(&mut self, now: NaiveDateTime, ctx: &RequestContext<'_>) -> i64 {
        match &mut self.kind {
            RequestKind::Runtime(runtime) => runtime.get_max(now),
            RequestKind::Soc(soc) => soc.energy_wh(false, ctx),
            RequestKind::OptionalEnergySoc(soc) => soc.energy_wh(true, ctx),
        }
    }

    /// Whether the demand is satisfied and the window can retire early.
    pub fn is_finished(&mut self, now: NaiveDateTime, ctx: &RequestContext<'_>) -> bool {
        self.get_max(now, ctx) <= 0
    }

    /// Takes a live SoC reading while the owning interval is active.
    ///
    /// Runtime requests ignore it. The reading reaches the demand figure on
    /// the next cache refresh.
    pub fn on_ev_charger_soc_changed(&mut self, appliance: &str, now: NaiveDateTime, soc: f32) {
        if !self.active {
            return;
        }
        if let Some(request) = self.soc_request_mut() {
            request.on_soc_changed(appliance, now, soc);
        }
    }

    /// Drops any cached energy value so the next evaluation recomputes it.
    pub fn invalidate(&mut self) {
        if let Some(request) = self.soc_request_mut() {
            request.invalidate_energy();
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/enabled={}", self.kind_name(), self.enabled)?;
        match &self.kind {
            RequestKind::Runtime(runtime) => write!(f, "/{runtime}"),
            RequestKind::Soc(soc) | RequestKind::OptionalEnergySoc(soc) => write!(f, "/{soc}"),
        }
    }
}

/// Runtime demand with static bounds in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeRequest {
    min: Option<i64>,
    max: i64,
}

impl RuntimeRequest {
    pub fn new(min: Option<i64>, max: i64) -> Self {
        Self { min, max }
    }

    pub fn get_min(&self, _now: NaiveDateTime) -> Option<i64> {
        self.min
    }

    pub fn get_max(&self, _now: NaiveDateTime) -> i64 {
        self.max
    }
}

impl fmt::Display for RuntimeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.min {
            Some(min) => write!(f, "min={min}s/max={}s", self.max),
            None => write!(f, "min=-/max={}s", self.max),
        }
    }
}

/// Cached energy figure and the wall-clock millis it was computed at.
#[derive(Debug, Clone, Copy, Default)]
struct EnergyCache {
    value_wh: Option<i64>,
    computed_at_millis: Option<i64>,
}

impl EnergyCache {
    fn fresh(&self, now_millis: i64) -> Option<i64> {
        match (self.value_wh, self.computed_at_millis) {
            (Some(value), Some(at)) if now_millis - at <= ENERGY_CACHE_MILLIS => Some(value),
            _ => None,
        }
    }
}

/// Energy needed to bring a vehicle from its current to its target SoC.
///
/// Equality compares the configured and reported values, never the cache.
#[derive(Debug, Clone)]
pub struct SocRequest {
    soc: Option<u8>,
    ev_id: Option<u32>,
    initial_soc: Option<u8>,
    cache: EnergyCache,
}

impl SocRequest {
    pub fn new(soc: Option<u8>, ev_id: Option<u32>) -> Self {
        Self {
            soc,
            ev_id,
            initial_soc: None,
            cache: EnergyCache::default(),
        }
    }

    pub fn with_initial_soc(mut self, initial_soc: u8) -> Self {
        self.initial_soc = Some(initial_soc);
        self
    }

    /// Configured target SoC, `None` when the default applies.
    pub fn soc(&self) -> Option<u8> {
        self.soc
    }

    pub fn set_soc(&mut self, soc: Option<u8>) {
        self.soc = soc;
    }

    pub fn ev_id(&self) -> Option<u32> {
        self.ev_id
    }

    pub fn initial_soc(&self) -> u8 {
        self.initial_soc.unwrap_or(DEFAULT_INITIAL_SOC)
    }

    pub fn set_initial_soc(&mut self, initial_soc: Option<u8>) {
        self.initial_soc = initial_soc;
    }

    /// Last computed energy need in Wh, if any computation happened yet.
    pub fn cached_energy_wh(&self) -> Option<i64> {
        self.cache.value_wh
    }

    pub fn invalidate_energy(&mut self) {
        self.cache = EnergyCache::default();
    }

    fn on_soc_changed(&mut self, appliance: &str, _now: NaiveDateTime, soc: f32) {
        let soc = soc.clamp(0.0, 100.0) as u8;
        debug!(appliance, initial_soc = soc, "using updated SoC");
        self.initial_soc = Some(soc);
    }

    /// Remaining energy need in Wh, served from cache while it is fresh.
    pub fn energy_wh(&mut self, optional_energy: bool, ctx: &RequestContext<'_>) -> i64 {
        let now_millis = ctx.clock.now_millis();
        if let Some(value) = self.cache.fresh(now_millis) {
            return value;
        }
        let vehicle = self.ev_id.and_then(|id| ctx.vehicles.resolve(id));
        let value = self.calculate_energy(vehicle, optional_energy, ctx);
        self.cache = EnergyCache {
            value_wh: Some(value),
            computed_at_millis: Some(now_millis),
        };
        value
    }

    /// Computes the remaining energy need in Wh without touching the cache.
    ///
    /// `needed = (target - initial) / 100 * (100 + loss) / 100 * capacity`,
    /// minus the energy already metered.
    pub fn calculate_energy(
        &self,
        vehicle: Option<&ElectricVehicle>,
        optional_energy: bool,
        ctx: &RequestContext<'_>,
    ) -> i64 {
        let appliance = ctx.appliance_id;
        let metered_kwh = match ctx.meter {
            Some(meter) => {
                let energy = meter.energy_kwh();
                debug!(appliance, "energy metered: {energy} kWh");
                energy
            }
            None => {
                debug!(
                    appliance,
                    "no energy meter configured - cannot account for metered energy"
                );
                0.0
            }
        };

        let (battery_capacity, charge_loss) = match vehicle {
            Some(v) => (v.battery_capacity_wh, v.charge_loss_pct),
            None => {
                warn!(appliance, ev_id = ?self.ev_id, "vehicle not resolvable - using defaults");
                (
                    ElectricVehicle::DEFAULT_BATTERY_CAPACITY_WH,
                    ElectricVehicle::DEFAULT_CHARGE_LOSS_PCT,
                )
            }
        };
        let initial_soc = i64::from(self.initial_soc());
        let target_soc = i64::from(self.target_soc(vehicle, optional_energy));
        debug!(
            appliance,
            ev_id = ?self.ev_id,
            battery_capacity,
            charge_loss,
            initial_soc,
            target_soc,
            "calculating energy"
        );

        let soc_delta = i128::from(target_soc - initial_soc);
        let loss_factor = i128::from(charge_loss) + 100;
        let capacity = i128::from(battery_capacity);
        let needed_wh = soc_delta
            .checked_mul(loss_factor)
            .and_then(|v| v.checked_mul(capacity))
            .and_then(|v| i64::try_from(v / 10_000).ok());
        let needed_wh = match needed_wh {
            Some(wh) => wh,
            None => {
                warn!(appliance, battery_capacity, charge_loss, "energy need out of range - saturating");
                if (soc_delta < 0) ^ (loss_factor < 0) ^ (capacity < 0) {
                    i64::MIN
                } else {
                    i64::MAX
                }
            }
        };
        let metered_wh = (metered_kwh * 1000.0) as i64;
        let energy = needed_wh.saturating_sub(metered_wh);
        debug!(appliance, "energy calculated: {energy} Wh");
        energy
    }

    fn target_soc(&self, vehicle: Option<&ElectricVehicle>, optional_energy: bool) -> u8 {
        if let Some(soc) = self.soc {
            return soc;
        }
        if optional_energy {
            if let Some(soc) = vehicle.and_then(|v| v.default_soc_optional_energy) {
                return soc;
            }
        }
        DEFAULT_TARGET_SOC
    }
}

impl PartialEq for SocRequest {
    fn eq(&self, other: &Self) -> bool {
        self.soc == other.soc
            && self.ev_id == other.ev_id
            && self.initial_soc() == other.initial_soc()
    }
}

impl fmt::Display for SocRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ev_id {
            Some(id) => write!(f, "evId={id}")?,
            None => f.write_str("evId=-")?,
        }
        write!(
            f,
            "/soc={}%/energy={}Wh",
            self.soc.unwrap_or(DEFAULT_TARGET_SOC),
            self.cache.value_wh.unwrap_or(0)
        )
    }
}

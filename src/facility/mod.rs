//! Facility agents.
//!
//! Every facility is driven by the host in two phases per timestep. `tick`
//! runs before the material exchange and `tock` after it. Facilities own
//! their stocks outright; the host only reaches them through `accept` and
//! `withdraw` while matching requests and offers.

pub mod decay_storage;
pub mod fusion_power_plant;
pub mod reactor;

pub use decay_storage::DecayStorage;
pub use fusion_power_plant::FusionPowerPlant;
pub use reactor::Reactor;

use crate::config::{Archetype, FacilityConfig};
use crate::inventory::StockSet;
use crate::material::{Material, MaterialStock, StockError, COMPOSITION_TOLERANCE, QTY_EPSILON};
use crate::nuclide::NucId;
use crate::policy::{MaterialOffer, MaterialRequest};
use crate::telemetry::{
    Datum, Recorder, REACTOR_EVENTS, REACTOR_OPERATIONS, REACTOR_STATUS,
};
use std::fmt;
use std::str::FromStr;

/// Tritium burned per GW of fusion power per year, in kg
pub const BURN_RATE: f64 = 55.8;

/// Twelve default timesteps
pub const SECONDS_PER_YEAR: f64 = 2_629_846.0 * 12.0;

pub const STATUS_ONLINE: &str = "Online";
pub const STATUS_SHUTDOWN: &str = "Shut-down";

/// Tritium burned in one timestep of `dt` seconds at `fusion_power` MW
pub fn fuel_usage(fusion_power: f64, dt: f64) -> f64 {
    BURN_RATE * (fusion_power / 1000.0) / SECONDS_PER_YEAR * dt
}

/// Per-call view of the host handed to a facility
#[derive(Debug)]
pub struct FacilityContext {
    pub agent_id: usize,
    pub time: u32,
    /// Timestep length in seconds
    pub dt: f64,
    records: Vec<Datum>,
}

impl FacilityContext {
    pub fn new(agent_id: usize, time: u32, dt: f64) -> Self {
        FacilityContext {
            agent_id,
            time,
            dt,
            records: Vec::new(),
        }
    }

    /// Empty row of `table` stamped with this agent and time
    pub fn datum(&self, table: &str) -> Datum {
        Datum::new(table, self.agent_id, self.time)
    }

    pub fn status(&mut self, status: &str, power: f64) {
        self.record(self.datum(REACTOR_STATUS).with("Status", status).with("Power", power));
    }

    pub fn event(&mut self, event: &str, value: impl Into<String>) {
        self.record(
            self.datum(REACTOR_EVENTS)
                .with("Event", event)
                .with("Value", value.into()),
        );
    }

    pub fn operation(&mut self, event: &str, value: impl Into<String>) {
        self.record(
            self.datum(REACTOR_OPERATIONS)
                .with("Event", event)
                .with("Value", value.into()),
        );
    }

    pub fn records(&self) -> &[Datum] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Datum> {
        self.records
    }
}

impl Recorder for FacilityContext {
    fn record(&mut self, datum: Datum) {
        self.records.push(datum);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacilityState {
    NotStarted,
    Operating,
    Shutdown,
}

impl FacilityState {
    pub fn is_operating(&self) -> bool {
        matches!(self, FacilityState::Operating)
    }
}

impl fmt::Display for FacilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacilityState::NotStarted => write!(f, "not started"),
            FacilityState::Operating => write!(f, "operating"),
            FacilityState::Shutdown => write!(f, "shut down"),
        }
    }
}

/// Why a startup attempt was refused
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StartupFailure {
    #[error("Startup Failed: {held:.6} kg in storage is less than required {required:.6} kg to start-up!")]
    InsufficientStorage { held: f64, required: f64 },

    #[error("Startup Failed: Startup Inventory insufficient to maintain reactor for full timestep!")]
    InsufficientStartupInventory,

    #[error("Startup Failed: Fuel incommod not as expected. ")]
    ContaminatedFuel,
}

/// Fatal problems found when a facility enters the simulation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Refill mode {0} not recognized! Try 'schedule' or 'fill'.")]
    UnknownRefuelMode(String),

    #[error("Recipe '{0}' is not defined")]
    UnknownRecipe(String),

    #[error("Recipe '{name}' is invalid: {reason}")]
    InvalidRecipe { name: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefuelMode {
    Fill,
    Schedule,
}

impl FromStr for RefuelMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fill" => Ok(RefuelMode::Fill),
            "schedule" => Ok(RefuelMode::Schedule),
            other => Err(ConfigurationError::UnknownRefuelMode(other.to_string())),
        }
    }
}

/// A facility agent stepped by the host
pub trait Facility: StockSet + Send {
    fn name(&self) -> &str;

    fn archetype(&self) -> &'static str;

    fn state(&self) -> FacilityState;

    /// Called once when the facility enters the simulation
    fn enter_notify(&mut self, ctx: &mut FacilityContext) -> Result<(), ConfigurationError>;

    fn tick(&mut self, ctx: &mut FacilityContext);

    fn tock(&mut self, ctx: &mut FacilityContext);

    /// Material wanted this timestep
    fn requests(&self, time: u32) -> Vec<MaterialRequest>;

    /// Material on offer this timestep
    fn offers(&self) -> Vec<MaterialOffer>;

    fn stock_mut(&mut self, name: &str) -> Option<&mut MaterialStock>;

    /// Deliver material into one of the facility's stocks
    fn accept(&mut self, buffer: &str, material: Material) -> Result<(), StockError> {
        let stock = self
            .stock_mut(buffer)
            .ok_or_else(|| StockError::UnknownStock(buffer.to_string()))?;
        stock.push(material);
        Ok(())
    }

    /// Take material out of one of the facility's stocks
    fn withdraw(&mut self, buffer: &str, qty: f64) -> Result<Material, StockError> {
        let stock = self
            .stock_mut(buffer)
            .ok_or_else(|| StockError::UnknownStock(buffer.to_string()))?;
        stock.pop(qty)
    }
}

/// Build the facility described by `config`
pub fn build(config: &FacilityConfig) -> Box<dyn Facility> {
    match &config.archetype {
        Archetype::DecayStorage(cfg) => Box::new(DecayStorage::new(&config.name, cfg.clone())),
        Archetype::Reactor(cfg) => Box::new(Reactor::new(&config.name, cfg.clone())),
        Archetype::FusionPowerPlant(cfg) => {
            Box::new(FusionPowerPlant::new(&config.name, cfg.clone()))
        }
    }
}

/// Check whether `storage` can start a core.
///
/// On success the whole content of `storage` is returned; on failure it is
/// put back untouched.
pub(crate) fn attempt_startup(
    storage: &mut MaterialStock,
    required: f64,
    startup_inventory: f64,
    fuel_usage: f64,
) -> Result<Material, StartupFailure> {
    let fuel = storage.pop_all();

    let failure = if fuel.quantity() + QTY_EPSILON < required {
        Some(StartupFailure::InsufficientStorage {
            held: fuel.quantity(),
            required,
        })
    } else if startup_inventory < fuel_usage {
        Some(StartupFailure::InsufficientStartupInventory)
    } else if !fuel.is_pure(NucId::TRITIUM, COMPOSITION_TOLERANCE) {
        Some(StartupFailure::ContaminatedFuel)
    } else {
        None
    };

    match failure {
        Some(err) => {
            storage.push(fuel);
            Err(err)
        }
        None => Ok(fuel),
    }
}

/// Decay a tritium stock to `time` and move its helium-3 into `helium`
pub(crate) fn decay_and_strip(
    stock: &mut MaterialStock,
    helium: &mut MaterialStock,
    time: u32,
    dt: f64,
) {
    stock.decay(time, dt);
    helium.push(stock.extract_nuclide(NucId::HE3));
}

/// Move `qty` kg from one stock to another, clamped to what is held
pub(crate) fn transfer(from: &mut MaterialStock, to: &mut MaterialStock, qty: f64) -> f64 {
    let qty = qty.min(from.quantity());
    if qty <= 0.0 {
        return 0.0;
    }
    match from.pop(qty) {
        Ok(lot) => {
            let moved = lot.quantity();
            to.push(lot);
            moved
        }
        Err(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Composition;
    use std::collections::BTreeMap;

    const MONTH: f64 = 2_629_846.0;

    fn storage_with(qty: f64) -> MaterialStock {
        let mut stock = MaterialStock::discrete("storage");
        stock.push(Material::new(qty, Composition::pure(NucId::TRITIUM)));
        stock
    }

    #[test]
    fn test_fuel_usage_one_month_at_300_mw() {
        let usage = fuel_usage(300.0, MONTH);
        assert!((usage - 55.8 * 0.3 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_refuel_mode_parsing() {
        assert_eq!("fill".parse::<RefuelMode>(), Ok(RefuelMode::Fill));
        assert_eq!("schedule".parse::<RefuelMode>(), Ok(RefuelMode::Schedule));
        let err = "sometimes".parse::<RefuelMode>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Refill mode sometimes not recognized! Try 'schedule' or 'fill'."
        );
    }

    #[test]
    fn test_startup_needs_enough_fuel() {
        let mut storage = storage_with(5.0);
        let err = attempt_startup(&mut storage, 8.121, 8.121, 1.395).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Startup Failed: 5.000000 kg in storage is less than required 8.121000 kg to start-up!"
        );
        assert_eq!(storage.quantity(), 5.0);
    }

    #[test]
    fn test_startup_needs_one_full_timestep() {
        let mut storage = storage_with(10.0);
        let err = attempt_startup(&mut storage, 1.0, 1.0, 1.395).unwrap_err();
        assert_eq!(err, StartupFailure::InsufficientStartupInventory);
        assert_eq!(storage.quantity(), 10.0);
    }

    #[test]
    fn test_startup_rejects_wrong_fuel() {
        let mut fuel = BTreeMap::new();
        fuel.insert(NucId::TRITIUM, 0.5);
        fuel.insert(NucId::HE4, 0.5);
        let mut storage = MaterialStock::discrete("storage");
        storage.push(Material::new(10.0, Composition::from_atom(fuel)));

        let err = attempt_startup(&mut storage, 8.121, 8.121, 1.395).unwrap_err();
        assert_eq!(err.to_string(), "Startup Failed: Fuel incommod not as expected. ");
        assert_eq!(storage.quantity(), 10.0);
    }

    #[test]
    fn test_startup_success_takes_everything() {
        let mut storage = storage_with(9.0);
        let fuel = attempt_startup(&mut storage, 8.121, 8.121, 1.395).unwrap();
        assert_eq!(fuel.quantity(), 9.0);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_decay_and_strip_moves_helium() {
        let mut storage = storage_with(6.0);
        let mut helium = MaterialStock::bulk("helium");
        decay_and_strip(&mut storage, &mut helium, 1, MONTH);
        assert!((helium.quantity() - 0.028065619).abs() < 1e-6);
        assert!(storage.mass(NucId::HE3) < 1e-12);
    }

    #[test]
    fn test_transfer_is_clamped() {
        let mut from = storage_with(1.0);
        let mut to = MaterialStock::bulk("to");
        assert_eq!(transfer(&mut from, &mut to, 3.0), 1.0);
        assert!(from.is_empty());
        assert_eq!(to.quantity(), 1.0);
        assert_eq!(transfer(&mut from, &mut to, 1.0), 0.0);
    }

    #[test]
    fn test_context_stamps_rows() {
        let mut ctx = FacilityContext::new(4, 9, MONTH);
        ctx.status(STATUS_ONLINE, 300.0);
        ctx.event("Startup", "ok");
        let rows = ctx.into_records();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|d| d.agent_id == 4 && d.time == 9));
        assert_eq!(rows[0].text("Status"), Some("Online"));
    }
}

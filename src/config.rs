//! Scenario configuration.
//!
//! A scenario file names the run length, the recipes, the facilities and the
//! trivial sources and sinks that feed them. Everything is plain YAML.

use crate::material::{Basis, Composition};
use crate::nuclide::NuclideTable;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// One month, the host's default timestep
pub const DEFAULT_TIMESTEP_SECONDS: u64 = 2_629_846;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    #[serde(default)]
    pub recipes: BTreeMap<String, RecipeConfig>,
    pub facilities: Vec<FacilityConfig>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.general.duration == 0 {
            return Err(ValidationError::InvalidGeneral(
                "duration must be at least one timestep".to_string(),
            ));
        }
        if self.general.timestep.is_zero() {
            return Err(ValidationError::InvalidGeneral(
                "timestep cannot be zero".to_string(),
            ));
        }

        for (name, recipe) in &self.recipes {
            recipe.composition().map_err(|e| match e {
                ValidationError::InvalidRecipe(msg) => {
                    ValidationError::InvalidRecipe(format!("{}: {}", name, msg))
                }
                other => other,
            })?;
        }

        if self.facilities.is_empty() {
            return Err(ValidationError::InvalidFacility(
                "at least one facility is required".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for facility in &self.facilities {
            if facility.name.is_empty() {
                return Err(ValidationError::InvalidFacility(
                    "facility name cannot be empty".to_string(),
                ));
            }
            if !names.insert(facility.name.as_str()) {
                return Err(ValidationError::InvalidFacility(format!(
                    "duplicate facility name '{}'",
                    facility.name
                )));
            }
            facility.archetype.validate().map_err(|msg| {
                ValidationError::InvalidFacility(format!("{}: {}", facility.name, msg))
            })?;
        }

        for source in &self.sources {
            if !self.recipes.contains_key(&source.recipe) {
                return Err(ValidationError::InvalidExchange(format!(
                    "source '{}' uses unknown recipe '{}'",
                    source.name, source.recipe
                )));
            }
            if source.capacity.is_some_and(|c| c < 0.0) {
                return Err(ValidationError::InvalidExchange(format!(
                    "source '{}' capacity cannot be negative",
                    source.name
                )));
            }
        }

        for sink in &self.sinks {
            if sink.capacity.is_some_and(|c| c < 0.0) {
                return Err(ValidationError::InvalidExchange(format!(
                    "sink '{}' capacity cannot be negative",
                    sink.name
                )));
            }
        }

        Ok(())
    }

    /// Timestep length in seconds
    pub fn dt_seconds(&self) -> f64 {
        self.general.timestep.as_secs_f64()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Number of timesteps to run
    pub duration: u32,
    #[serde(with = "humantime_serde", default = "default_timestep")]
    pub timestep: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

fn default_timestep() -> Duration {
    Duration::from_secs(DEFAULT_TIMESTEP_SECONDS)
}

/// A named composition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeConfig {
    #[serde(default)]
    pub basis: Basis,
    /// Nuclide name or id to fraction
    pub nuclides: BTreeMap<String, f64>,
}

impl RecipeConfig {
    pub fn composition(&self) -> Result<Composition, ValidationError> {
        let table = NuclideTable::global();
        let mut fractions = BTreeMap::new();
        for (name, fraction) in &self.nuclides {
            let nuc = table.resolve(name).ok_or_else(|| {
                ValidationError::InvalidRecipe(format!("unknown nuclide '{}'", name))
            })?;
            if *fraction < 0.0 {
                return Err(ValidationError::InvalidRecipe(format!(
                    "negative fraction for '{}'",
                    name
                )));
            }
            *fractions.entry(nuc).or_insert(0.0) += fraction;
        }

        let composition = Composition::from_basis(self.basis, fractions);
        if composition.is_empty() {
            return Err(ValidationError::InvalidRecipe(
                "recipe has no positive fractions".to_string(),
            ));
        }
        Ok(composition)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityConfig {
    pub name: String,
    #[serde(flatten)]
    pub archetype: Archetype,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "archetype")]
pub enum Archetype {
    DecayStorage(DecayStorageConfig),
    Reactor(PlantConfig),
    FusionPowerPlant(PlantConfig),
}

impl Archetype {
    pub fn name(&self) -> &'static str {
        match self {
            Archetype::DecayStorage(_) => "DecayStorage",
            Archetype::Reactor(_) => "Reactor",
            Archetype::FusionPowerPlant(_) => "FusionPowerPlant",
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Archetype::DecayStorage(cfg) => cfg.validate(),
            Archetype::Reactor(cfg) | Archetype::FusionPowerPlant(cfg) => cfg.validate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayStorageConfig {
    pub incommod: String,
    pub outcommod: String,
    #[serde(default = "default_max_tritium_inventory")]
    pub max_tritium_inventory: f64,
    /// Sell extracted helium-3 on this commodity when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub he3_outcommod: Option<String>,
}

fn default_max_tritium_inventory() -> f64 {
    1e8
}

impl DecayStorageConfig {
    fn validate(&self) -> Result<(), String> {
        if self.incommod.is_empty() || self.outcommod.is_empty() {
            return Err("incommod and outcommod cannot be empty".to_string());
        }
        if self.max_tritium_inventory < 0.0 {
            return Err("max_tritium_inventory cannot be negative".to_string());
        }
        Ok(())
    }
}

/// Parameters shared by the reactor and the fusion power plant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantConfig {
    pub fuel_incommod: String,
    /// Commodity excess tritium is sold on, defaults to `fuel_incommod`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_outcommod: Option<String>,
    pub blanket_incommod: String,
    /// Spent blanket is sold on this commodity when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blanket_outcommod: Option<String>,
    #[serde(default = "default_he3_outcommod")]
    pub he3_outcommod: String,

    /// Nameplate fusion power in MW
    pub fusion_power: f64,
    #[serde(alias = "TBR")]
    pub tbr: f64,
    pub startup_inventory: f64,
    pub reserve_inventory: f64,
    #[serde(default)]
    pub sequestered_equilibrium: f64,

    /// `fill` or `schedule`, checked when the facility enters the simulation
    #[serde(default = "default_refuel_mode")]
    pub refuel_mode: String,
    #[serde(default = "default_buy_quantity")]
    pub buy_quantity: f64,
    #[serde(default = "default_buy_frequency")]
    pub buy_frequency: u32,

    #[serde(default = "default_li7_contribution")]
    pub li7_contribution: f64,
    #[serde(default = "default_blanket_size")]
    pub blanket_size: f64,
    #[serde(default = "default_blanket_turnover_rate")]
    pub blanket_turnover_rate: f64,
    #[serde(default = "default_blanket_turnover_frequency")]
    pub blanket_turnover_frequency: u32,

    #[serde(default = "default_fuel_limit")]
    pub fuel_limit: f64,
    #[serde(default = "default_blanket_limit")]
    pub blanket_limit: f64,
}

fn default_he3_outcommod() -> String {
    "He-3".to_string()
}

fn default_refuel_mode() -> String {
    "fill".to_string()
}

fn default_buy_quantity() -> f64 {
    0.1
}

fn default_buy_frequency() -> u32 {
    1
}

fn default_li7_contribution() -> f64 {
    0.03
}

fn default_blanket_size() -> f64 {
    1000.0
}

fn default_blanket_turnover_rate() -> f64 {
    0.05
}

fn default_blanket_turnover_frequency() -> u32 {
    1
}

fn default_fuel_limit() -> f64 {
    1000.0
}

fn default_blanket_limit() -> f64 {
    100_000.0
}

impl PlantConfig {
    fn validate(&self) -> Result<(), String> {
        if self.fuel_incommod.is_empty() || self.blanket_incommod.is_empty() {
            return Err("fuel_incommod and blanket_incommod cannot be empty".to_string());
        }

        let non_negative = [
            ("fusion_power", self.fusion_power),
            ("tbr", self.tbr),
            ("startup_inventory", self.startup_inventory),
            ("reserve_inventory", self.reserve_inventory),
            ("sequestered_equilibrium", self.sequestered_equilibrium),
            ("buy_quantity", self.buy_quantity),
            ("blanket_size", self.blanket_size),
            ("fuel_limit", self.fuel_limit),
            ("blanket_limit", self.blanket_limit),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a non-negative number, got {}", field, value));
            }
        }

        for (field, value) in [
            ("li7_contribution", self.li7_contribution),
            ("blanket_turnover_rate", self.blanket_turnover_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be between 0 and 1, got {}", field, value));
            }
        }

        if self.buy_frequency == 0 {
            return Err("buy_frequency must be at least 1".to_string());
        }
        if self.blanket_turnover_frequency == 0 {
            return Err("blanket_turnover_frequency must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn fuel_outcommod(&self) -> &str {
        self.fuel_outcommod.as_deref().unwrap_or(&self.fuel_incommod)
    }
}

/// Supplies fixed-recipe material on one commodity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub commodity: String,
    pub recipe: String,
    /// kg per timestep, unlimited when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
}

/// Takes offered material on one commodity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    pub name: String,
    pub commodity: String,
    /// kg per timestep, unlimited when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid recipe: {0}")]
    InvalidRecipe(String),
    #[error("Invalid facility configuration: {0}")]
    InvalidFacility(String),
    #[error("Invalid source or sink: {0}")]
    InvalidExchange(String),
}

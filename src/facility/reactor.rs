//! Two-buffer fusion reactor.
//!
//! All usable fuel lives in `tritium_storage`; the startup inventory already
//! includes the reserve. Anything above the reserve is moved to
//! `tritium_excess` and offered for sale. A sequestered pool is filled from
//! storage at the start of each operating step to represent tritium held up
//! in the breeding and extraction systems.

use super::{
    attempt_startup, decay_and_strip, fuel_usage, transfer, ConfigurationError, Facility,
    FacilityContext, FacilityState, RefuelMode, STATUS_ONLINE, STATUS_SHUTDOWN,
};
use crate::breeding::BreedingModel;
use crate::config::PlantConfig;
use crate::inventory::{InventoryTracker, StockSet};
use crate::material::MaterialStock;
use crate::nuclide::NucId;
use crate::policy::{BuyMode, BuyPolicy, MaterialOffer, MaterialRequest, SellPolicy};
use crate::telemetry::{Recorder, REACTOR_INVENTORIES};
use log::{debug, info, warn};

pub const TRITIUM_STORAGE: &str = "tritium_storage";
pub const TRITIUM_EXCESS: &str = "tritium_excess";
pub const TRITIUM_SEQUESTERED: &str = "tritium_sequestered";
pub const HELIUM_STORAGE: &str = "helium_storage";
pub const BLANKET: &str = "blanket";
pub const BLANKET_EXCESS: &str = "blanket_excess";

pub struct Reactor {
    name: String,
    config: PlantConfig,
    state: FacilityState,
    breeding: BreedingModel,

    fuel_usage: f64,
    blanket_turnover: f64,

    tritium_storage: MaterialStock,
    tritium_excess: MaterialStock,
    tritium_sequestered: MaterialStock,
    helium_storage: MaterialStock,
    blanket: MaterialStock,
    blanket_excess: MaterialStock,

    fuel_startup_policy: BuyPolicy,
    fuel_refill_policy: BuyPolicy,
    blanket_fill_policy: BuyPolicy,
    tritium_sell_policy: SellPolicy,
    helium_sell_policy: SellPolicy,
    blanket_sell_policy: Option<SellPolicy>,
}

impl Reactor {
    pub fn new(name: &str, config: PlantConfig) -> Self {
        let fuel_tracker = InventoryTracker::new(config.fuel_limit, &[TRITIUM_STORAGE]);
        let blanket_tracker = InventoryTracker::new(config.blanket_limit, &[BLANKET]);

        let fuel_startup_policy = BuyPolicy::new(
            "Tritium Storage",
            TRITIUM_STORAGE,
            &config.fuel_incommod,
            BuyMode::Fill {
                fill_to: config.startup_inventory,
            },
        )
        .with_tracker(fuel_tracker.clone());
        // mode is settled in enter_notify
        let fuel_refill_policy = BuyPolicy::new(
            "Input",
            TRITIUM_STORAGE,
            &config.fuel_incommod,
            BuyMode::Fill {
                fill_to: config.reserve_inventory,
            },
        )
        .with_tracker(fuel_tracker);
        let blanket_fill_policy = BuyPolicy::new(
            "Blanket Startup",
            BLANKET,
            &config.blanket_incommod,
            BuyMode::Fill {
                fill_to: config.blanket_size,
            },
        )
        .with_tracker(blanket_tracker);

        let tritium_sell_policy = SellPolicy::new(TRITIUM_EXCESS, config.fuel_outcommod());
        let helium_sell_policy = SellPolicy::new(HELIUM_STORAGE, &config.he3_outcommod);
        let blanket_sell_policy = config
            .blanket_outcommod
            .as_deref()
            .map(|commod| SellPolicy::new(BLANKET_EXCESS, commod));

        Reactor {
            name: name.to_string(),
            breeding: BreedingModel::new(config.li7_contribution),
            config,
            state: FacilityState::NotStarted,
            fuel_usage: 0.0,
            blanket_turnover: 0.0,
            tritium_storage: MaterialStock::discrete(TRITIUM_STORAGE),
            tritium_excess: MaterialStock::discrete(TRITIUM_EXCESS),
            tritium_sequestered: MaterialStock::bulk(TRITIUM_SEQUESTERED),
            helium_storage: MaterialStock::bulk(HELIUM_STORAGE),
            blanket: MaterialStock::discrete(BLANKET),
            blanket_excess: MaterialStock::discrete(BLANKET_EXCESS),
            fuel_startup_policy,
            fuel_refill_policy,
            blanket_fill_policy,
            tritium_sell_policy,
            helium_sell_policy,
            blanket_sell_policy,
        }
    }

    pub fn fuel_usage(&self) -> f64 {
        self.fuel_usage
    }

    pub fn config(&self) -> &PlantConfig {
        &self.config
    }

    /// Top the sequestered pool up to its equilibrium from storage
    fn sequester_tritium(&mut self) {
        let deficit =
            (self.config.sequestered_equilibrium - self.tritium_sequestered.mass(NucId::TRITIUM)).max(0.0);
        if deficit > 0.0 {
            let moved = transfer(&mut self.tritium_storage, &mut self.tritium_sequestered, deficit);
            debug!("{}: sequestered {:.6} kg of T", self.name, moved);
        }
    }

    /// Burn one step of fuel and breed its replacement.
    ///
    /// Returns false when the core had to shut down.
    fn operate_reactor(&mut self, ctx: &mut FacilityContext) -> bool {
        let mut fuel = self.tritium_storage.pop_all();

        if fuel.quantity() > self.fuel_usage {
            match fuel.extract_qty(self.fuel_usage) {
                Ok(burned) => debug!("{}: burned {:.6} kg of T", self.name, burned.quantity()),
                Err(e) => warn!("{}: could not burn fuel: {}", self.name, e),
            }

            // bred tritium starts decaying this step
            self.blanket.decay(ctx.time, ctx.dt);
            match self
                .breeding
                .breed_tritium(&mut self.blanket, self.fuel_usage, self.config.tbr)
            {
                Ok(bred) => {
                    ctx.operation("BlanketDepletion", "Tritium bred at prescribed rate");
                    ctx.operation(
                        "BredTritium",
                        format!("{:.6} kg of T bred from blanket", bred.quantity()),
                    );
                    fuel.absorb(bred, ctx.dt);
                }
                Err(e) => {
                    warn!("{}: {}", self.name, e);
                    ctx.operation(
                        "BreedingError",
                        "Blanket composition lacks sufficient lithium to continue breeding at prescribed rate",
                    );
                }
            }
            self.tritium_storage.push(fuel);
            true
        } else {
            self.tritium_storage.push(fuel);
            self.fuel_refill_policy.stop();
            self.blanket_fill_policy.stop();
            self.fuel_startup_policy.start(ctx.time);
            self.state = FacilityState::Shutdown;
            ctx.event("CoreShutdown", "Not enough tritium to operate");
            warn!("{} shut down at t={}: not enough tritium", self.name, ctx.time);
            false
        }
    }

    fn move_surplus(&mut self, ctx: &mut FacilityContext) {
        if self.tritium_storage.is_empty() || !self.state.is_operating() {
            return;
        }
        let surplus = (self.tritium_storage.quantity() - self.config.reserve_inventory).max(0.0);
        if surplus > 0.0 {
            let moved = transfer(&mut self.tritium_storage, &mut self.tritium_excess, surplus);
            self.tritium_excess.combine();
            ctx.operation(
                "TritiumMoved",
                format!("{:.6}kg of T moved from storage to excess", moved),
            );
        }
    }

    fn cycle_blanket(&mut self, ctx: &mut FacilityContext) {
        let frequency = self.config.blanket_turnover_frequency.max(1);
        if ctx.time % frequency != 0 || self.blanket.is_empty() {
            return;
        }

        if self.blanket.quantity() >= self.blanket_turnover {
            transfer(&mut self.blanket, &mut self.blanket_excess, self.blanket_turnover);
            self.blanket_excess.combine();
            ctx.operation(
                "BlanketCycled",
                format!("{:.6}kg of blanket removed", self.blanket_turnover),
            );
        } else {
            ctx.operation(
                "BlanketNotCycled",
                format!(
                    "Total blanket material ({:.6}) insufficient to extract {:.6}kg!",
                    self.blanket.quantity(),
                    self.blanket_turnover
                ),
            );
        }
    }
}

impl StockSet for Reactor {
    fn stock(&self, name: &str) -> Option<&MaterialStock> {
        match name {
            TRITIUM_STORAGE => Some(&self.tritium_storage),
            TRITIUM_EXCESS => Some(&self.tritium_excess),
            TRITIUM_SEQUESTERED => Some(&self.tritium_sequestered),
            HELIUM_STORAGE => Some(&self.helium_storage),
            BLANKET => Some(&self.blanket),
            BLANKET_EXCESS => Some(&self.blanket_excess),
            _ => None,
        }
    }
}

impl Facility for Reactor {
    fn name(&self) -> &str {
        &self.name
    }

    fn archetype(&self) -> &'static str {
        "Reactor"
    }

    fn state(&self) -> FacilityState {
        self.state
    }

    fn enter_notify(&mut self, ctx: &mut FacilityContext) -> Result<(), ConfigurationError> {
        let mode: RefuelMode = self.config.refuel_mode.parse()?;

        self.fuel_usage = fuel_usage(self.config.fusion_power, ctx.dt);
        self.blanket_turnover = self.config.blanket_size * self.config.blanket_turnover_rate;
        for stock in [
            &mut self.tritium_storage,
            &mut self.tritium_excess,
            &mut self.tritium_sequestered,
            &mut self.helium_storage,
            &mut self.blanket,
            &mut self.blanket_excess,
        ] {
            stock.set_timestep(ctx.dt);
        }

        self.fuel_startup_policy.start(ctx.time);
        self.blanket_fill_policy.start(ctx.time);

        if mode == RefuelMode::Schedule {
            self.fuel_refill_policy.mode = BuyMode::Schedule {
                quantity: self.config.buy_quantity,
                active: 1,
                dormant: self.config.buy_frequency.saturating_sub(1),
            };
        }

        self.tritium_sell_policy.start();
        self.helium_sell_policy.start();
        if let Some(policy) = self.blanket_sell_policy.as_mut() {
            policy.start();
        }

        if self.config.startup_inventory < self.fuel_usage {
            warn!(
                "{}: startup inventory {} kg cannot sustain one timestep burn of {:.6} kg",
                self.name, self.config.startup_inventory, self.fuel_usage
            );
            ctx.operation(
                "OperationalError",
                format!(
                    "Startup inventory of {:.6} kg is below the {:.6} kg burned per timestep",
                    self.config.startup_inventory, self.fuel_usage
                ),
            );
        }

        info!(
            "{} entered: {} MW, TBR {}, fuel usage {:.6} kg/step, refuel mode {}",
            self.name, self.config.fusion_power, self.config.tbr, self.fuel_usage, self.config.refuel_mode
        );
        Ok(())
    }

    fn tick(&mut self, ctx: &mut FacilityContext) {
        if self.state.is_operating() {
            self.sequester_tritium();
            if self.operate_reactor(ctx) {
                self.blanket_fill_policy.start(ctx.time);
                ctx.status(STATUS_ONLINE, self.config.fusion_power);
            } else {
                ctx.status(STATUS_SHUTDOWN, 0.0);
            }
        } else {
            ctx.status(STATUS_SHUTDOWN, 0.0);
        }

        decay_and_strip(&mut self.tritium_storage, &mut self.helium_storage, ctx.time, ctx.dt);
        decay_and_strip(&mut self.tritium_excess, &mut self.helium_storage, ctx.time, ctx.dt);
        decay_and_strip(
            &mut self.tritium_sequestered,
            &mut self.helium_storage,
            ctx.time,
            ctx.dt,
        );

        self.move_surplus(ctx);
        self.cycle_blanket(ctx);
    }

    fn tock(&mut self, ctx: &mut FacilityContext) {
        if !self.state.is_operating() {
            match attempt_startup(
                &mut self.tritium_storage,
                self.config.startup_inventory,
                self.config.startup_inventory,
                self.fuel_usage,
            ) {
                Ok(fuel) => {
                    self.tritium_storage.push(fuel);
                    self.fuel_startup_policy.stop();
                    self.fuel_refill_policy.start(ctx.time);
                    self.state = FacilityState::Operating;
                    ctx.event("Startup", "Sufficient tritium in system to begin operation");
                    info!("{} started up at t={}", self.name, ctx.time);
                }
                Err(failure) => {
                    debug!("{} t={}: {}", self.name, ctx.time, failure);
                    ctx.operation("StartupError", failure.to_string());
                }
            }
        }

        self.tritium_storage.combine();
        self.blanket.combine();

        ctx.record(
            ctx.datum(REACTOR_INVENTORIES)
                .with("TritiumStorage", self.tritium_storage.quantity())
                .with("TritiumExcess", self.tritium_excess.quantity())
                .with("TritiumSequestered", self.tritium_sequestered.quantity())
                .with("LithiumBlanket", self.blanket.quantity())
                .with("BlanketExcess", self.blanket_excess.quantity())
                .with("HeliumStorage", self.helium_storage.quantity()),
        );
    }

    fn requests(&self, time: u32) -> Vec<MaterialRequest> {
        [
            &self.fuel_startup_policy,
            &self.fuel_refill_policy,
            &self.blanket_fill_policy,
        ]
        .into_iter()
        .filter_map(|policy| policy.request(time, self))
        .collect()
    }

    fn offers(&self) -> Vec<MaterialOffer> {
        let mut offers: Vec<MaterialOffer> = [&self.tritium_sell_policy, &self.helium_sell_policy]
            .into_iter()
            .filter_map(|policy| policy.offer(self))
            .collect();
        if let Some(policy) = &self.blanket_sell_policy {
            offers.extend(policy.offer(self));
        }
        offers
    }

    fn stock_mut(&mut self, name: &str) -> Option<&mut MaterialStock> {
        match name {
            TRITIUM_STORAGE => Some(&mut self.tritium_storage),
            TRITIUM_EXCESS => Some(&mut self.tritium_excess),
            TRITIUM_SEQUESTERED => Some(&mut self.tritium_sequestered),
            HELIUM_STORAGE => Some(&mut self.helium_storage),
            BLANKET => Some(&mut self.blanket),
            BLANKET_EXCESS => Some(&mut self.blanket_excess),
            _ => None,
        }
    }
}

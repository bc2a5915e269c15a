//! Three-buffer fusion power plant.
//!
//! Fuel is split between the core (what is burned), the reserve (what keeps
//! the core topped up) and the excess buffer (what is sold). The blanket is
//! turned over from a dedicated feed buffer and its spent fraction goes to
//! the waste buffer.
//!
//! ```text
//!            buy                 refill              burn
//! source ---------> reserve ------------> core ------------> (gone)
//!                     |   ^
//!          surplus    |   | bred T
//!                     v   |
//!                   excess  blanket <---- blanket_feed <---- buy
//!                     |        |
//!                     v        v
//!                    sell  blanket_waste
//! ```

use super::{
    attempt_startup, decay_and_strip, fuel_usage, transfer, ConfigurationError, Facility,
    FacilityContext, FacilityState, RefuelMode, STATUS_ONLINE, STATUS_SHUTDOWN,
};
use crate::breeding::BreedingModel;
use crate::config::PlantConfig;
use crate::inventory::{InventoryTracker, StockSet};
use crate::material::{MaterialStock, COMPOSITION_TOLERANCE, QTY_EPSILON};
use crate::nuclide::NucId;
use crate::policy::{BuyMode, BuyPolicy, MaterialOffer, MaterialRequest, SellPolicy};
use crate::telemetry::{Recorder, REACTOR_INVENTORIES};
use log::{debug, info, warn};

pub const TRITIUM_CORE: &str = "tritium_core";
pub const TRITIUM_RESERVE: &str = "tritium_reserve";
pub const TRITIUM_EXCESS: &str = "tritium_excess";
pub const TRITIUM_SEQUESTERED: &str = "tritium_sequestered";
pub const HELIUM_STORAGE: &str = "helium_storage";
pub const BLANKET: &str = "blanket";
pub const BLANKET_FEED: &str = "blanket_feed";
pub const BLANKET_WASTE: &str = "blanket_waste";

pub const SHUTDOWN_NO_FUEL: &str = "Not enough tritium to operate";
pub const SHUTDOWN_NO_FEED: &str = "Not enough blanket feed to cycle blanket";
pub const SHUTDOWN_DIRTY_FUEL: &str = "Fuel composition not as expected";

pub struct FusionPowerPlant {
    name: String,
    config: PlantConfig,
    state: FacilityState,
    breeding: BreedingModel,

    fuel_usage: f64,
    blanket_turnover: f64,

    tritium_core: MaterialStock,
    tritium_reserve: MaterialStock,
    tritium_excess: MaterialStock,
    tritium_sequestered: MaterialStock,
    helium_storage: MaterialStock,
    blanket: MaterialStock,
    blanket_feed: MaterialStock,
    blanket_waste: MaterialStock,

    fuel_startup_policy: BuyPolicy,
    fuel_refill_policy: BuyPolicy,
    blanket_fill_policy: BuyPolicy,
    blanket_feed_policy: BuyPolicy,
    tritium_sell_policy: SellPolicy,
    helium_sell_policy: SellPolicy,
    blanket_sell_policy: Option<SellPolicy>,
}

impl FusionPowerPlant {
    pub fn new(name: &str, config: PlantConfig) -> Self {
        let fuel_tracker = InventoryTracker::new(config.fuel_limit, &[TRITIUM_CORE, TRITIUM_RESERVE]);
        let blanket_tracker =
            InventoryTracker::new(config.blanket_limit, &[BLANKET, BLANKET_FEED]);
        let blanket_turnover = config.blanket_size * config.blanket_turnover_rate;

        let fuel_startup_policy = BuyPolicy::new(
            "Tritium Startup",
            TRITIUM_RESERVE,
            &config.fuel_incommod,
            BuyMode::Fill {
                fill_to: config.startup_inventory + config.reserve_inventory,
            },
        )
        .with_tracker(fuel_tracker.clone());
        let fuel_refill_policy = BuyPolicy::new(
            "Tritium Refill",
            TRITIUM_RESERVE,
            &config.fuel_incommod,
            BuyMode::Fill {
                fill_to: config.reserve_inventory,
            },
        )
        .with_tracker(fuel_tracker);
        let blanket_fill_policy = BuyPolicy::new(
            "Blanket Fill",
            BLANKET,
            &config.blanket_incommod,
            BuyMode::Fill {
                fill_to: config.blanket_size,
            },
        )
        .with_tracker(blanket_tracker.clone());
        let blanket_feed_policy = BuyPolicy::new(
            "Blanket Feed",
            BLANKET_FEED,
            &config.blanket_incommod,
            BuyMode::Fill {
                fill_to: blanket_turnover,
            },
        )
        .with_tracker(blanket_tracker);

        let tritium_sell_policy = SellPolicy::new(TRITIUM_EXCESS, config.fuel_outcommod());
        let helium_sell_policy = SellPolicy::new(HELIUM_STORAGE, &config.he3_outcommod);
        let blanket_sell_policy = config
            .blanket_outcommod
            .as_deref()
            .map(|commod| SellPolicy::new(BLANKET_WASTE, commod));

        FusionPowerPlant {
            name: name.to_string(),
            breeding: BreedingModel::new(config.li7_contribution),
            config,
            state: FacilityState::NotStarted,
            fuel_usage: 0.0,
            blanket_turnover,
            tritium_core: MaterialStock::discrete(TRITIUM_CORE),
            tritium_reserve: MaterialStock::discrete(TRITIUM_RESERVE),
            tritium_excess: MaterialStock::discrete(TRITIUM_EXCESS),
            tritium_sequestered: MaterialStock::bulk(TRITIUM_SEQUESTERED),
            helium_storage: MaterialStock::bulk(HELIUM_STORAGE),
            blanket: MaterialStock::discrete(BLANKET),
            blanket_feed: MaterialStock::discrete(BLANKET_FEED),
            blanket_waste: MaterialStock::discrete(BLANKET_WASTE),
            fuel_startup_policy,
            fuel_refill_policy,
            blanket_fill_policy,
            blanket_feed_policy,
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

    fn turnover_due(&self, time: u32) -> bool {
        time % self.config.blanket_turnover_frequency.max(1) == 0
    }

    /// Why the core cannot run this step, if it cannot
    fn operating_failure(&self, time: u32) -> Option<&'static str> {
        if self.tritium_core.quantity() + self.tritium_reserve.quantity() < self.fuel_usage {
            return Some(SHUTDOWN_NO_FUEL);
        }
        if self.turnover_due(time)
            && self.blanket_feed.quantity() + QTY_EPSILON < self.blanket_turnover
        {
            return Some(SHUTDOWN_NO_FEED);
        }
        let clean = self.tritium_core.is_pure(NucId::TRITIUM, COMPOSITION_TOLERANCE)
            && self.tritium_reserve.is_pure(NucId::TRITIUM, COMPOSITION_TOLERANCE);
        if !clean {
            return Some(SHUTDOWN_DIRTY_FUEL);
        }
        None
    }

    fn shut_down(&mut self, ctx: &mut FacilityContext, reason: &str) {
        self.fuel_refill_policy.stop();
        self.fuel_startup_policy.start(ctx.time);
        self.state = FacilityState::Shutdown;

        let unloaded = self.tritium_core.pop_all();
        self.tritium_reserve.push(unloaded);

        ctx.event("CoreShutdown", reason);
        warn!("{} shut down at t={}: {}", self.name, ctx.time, reason);
    }

    fn operate(&mut self, ctx: &mut FacilityContext) {
        let shortfall = self.fuel_usage - self.tritium_core.quantity();
        if shortfall > 0.0 {
            transfer(&mut self.tritium_reserve, &mut self.tritium_core, shortfall);
        }

        match self.tritium_core.pop(self.fuel_usage) {
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
                self.tritium_reserve.push(bred);
            }
            Err(e) => {
                warn!("{}: {}", self.name, e);
                ctx.operation("BreedingError", e.to_string());
            }
        }
    }

    /// Refill the core and the sequestered pool, then sell what is left over
    fn rebalance(&mut self, ctx: &mut FacilityContext) {
        let core_deficit = self.config.startup_inventory - self.tritium_core.quantity();
        if core_deficit > 0.0 {
            transfer(&mut self.tritium_reserve, &mut self.tritium_core, core_deficit);
        }

        let sequestered_deficit = (self.config.sequestered_equilibrium
            - self.tritium_sequestered.mass(NucId::TRITIUM))
        .max(0.0);
        let moved = transfer(
            &mut self.tritium_reserve,
            &mut self.tritium_sequestered,
            sequestered_deficit,
        );
        let outstanding = sequestered_deficit - moved;

        let surplus =
            self.tritium_reserve.quantity() - (self.config.reserve_inventory + outstanding);
        if surplus > QTY_EPSILON {
            let moved = transfer(&mut self.tritium_reserve, &mut self.tritium_excess, surplus);
            ctx.operation(
                "TritiumMoved",
                format!("{:.6}kg of T moved from reserve to excess", moved),
            );
        }
    }

    fn cycle_blanket(&mut self, ctx: &mut FacilityContext) {
        if !self.turnover_due(ctx.time) {
            return;
        }

        if self.blanket.quantity() >= self.blanket_turnover {
            transfer(&mut self.blanket, &mut self.blanket_waste, self.blanket_turnover);
            transfer(&mut self.blanket_feed, &mut self.blanket, self.blanket_turnover);
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

    fn try_startup(&mut self, ctx: &mut FacilityContext) {
        let required = self.config.startup_inventory + self.config.reserve_inventory;
        match attempt_startup(
            &mut self.tritium_reserve,
            required,
            self.config.startup_inventory,
            self.fuel_usage,
        ) {
            Ok(mut fuel) => {
                match fuel.extract_qty(self.config.startup_inventory) {
                    Ok(core) => self.tritium_core.push(core),
                    Err(e) => warn!("{}: could not load core: {}", self.name, e),
                }
                self.tritium_reserve.push(fuel);

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
}

impl StockSet for FusionPowerPlant {
    fn stock(&self, name: &str) -> Option<&MaterialStock> {
        match name {
            TRITIUM_CORE => Some(&self.tritium_core),
            TRITIUM_RESERVE => Some(&self.tritium_reserve),
            TRITIUM_EXCESS => Some(&self.tritium_excess),
            TRITIUM_SEQUESTERED => Some(&self.tritium_sequestered),
            HELIUM_STORAGE => Some(&self.helium_storage),
            BLANKET => Some(&self.blanket),
            BLANKET_FEED => Some(&self.blanket_feed),
            BLANKET_WASTE => Some(&self.blanket_waste),
            _ => None,
        }
    }
}

impl Facility for FusionPowerPlant {
    fn name(&self) -> &str {
        &self.name
    }

    fn archetype(&self) -> &'static str {
        "FusionPowerPlant"
    }

    fn state(&self) -> FacilityState {
        self.state
    }

    fn enter_notify(&mut self, ctx: &mut FacilityContext) -> Result<(), ConfigurationError> {
        let mode: RefuelMode = self.config.refuel_mode.parse()?;

        self.fuel_usage = fuel_usage(self.config.fusion_power, ctx.dt);
        for stock in [
            &mut self.tritium_core,
            &mut self.tritium_reserve,
            &mut self.tritium_excess,
            &mut self.tritium_sequestered,
            &mut self.helium_storage,
            &mut self.blanket,
            &mut self.blanket_feed,
            &mut self.blanket_waste,
        ] {
            stock.set_timestep(ctx.dt);
        }

        if mode == RefuelMode::Schedule {
            self.fuel_refill_policy.mode = BuyMode::Schedule {
                quantity: self.config.buy_quantity,
                active: 1,
                dormant: self.config.buy_frequency.saturating_sub(1),
            };
        }

        self.fuel_startup_policy.start(ctx.time);
        self.blanket_fill_policy.start(ctx.time);
        self.blanket_feed_policy.start(ctx.time);
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
            "{} entered: {} MW, TBR {}, fuel usage {:.6} kg/step, blanket turnover {:.3} kg",
            self.name,
            self.config.fusion_power,
            self.config.tbr,
            self.fuel_usage,
            self.blanket_turnover
        );
        Ok(())
    }

    fn tick(&mut self, ctx: &mut FacilityContext) {
        if self.state.is_operating() {
            match self.operating_failure(ctx.time) {
                Some(reason) => {
                    self.shut_down(ctx, reason);
                    ctx.status(STATUS_SHUTDOWN, 0.0);
                }
                None => {
                    self.operate(ctx);
                    ctx.status(STATUS_ONLINE, self.config.fusion_power);
                }
            }
        } else {
            ctx.status(STATUS_SHUTDOWN, 0.0);
        }

        for stock in [
            &mut self.tritium_core,
            &mut self.tritium_reserve,
            &mut self.tritium_excess,
            &mut self.tritium_sequestered,
        ] {
            decay_and_strip(stock, &mut self.helium_storage, ctx.time, ctx.dt);
        }

        if self.state.is_operating() {
            self.rebalance(ctx);
            self.cycle_blanket(ctx);
        }
    }

    fn tock(&mut self, ctx: &mut FacilityContext) {
        if !self.state.is_operating() {
            self.try_startup(ctx);
        }

        if self.blanket_fill_policy.is_active()
            && self.blanket.quantity() + QTY_EPSILON >= self.config.blanket_size
        {
            self.blanket_fill_policy.stop();
            debug!("{}: blanket filled", self.name);
        }

        for stock in [
            &mut self.tritium_core,
            &mut self.tritium_reserve,
            &mut self.tritium_excess,
            &mut self.blanket,
            &mut self.blanket_feed,
            &mut self.blanket_waste,
        ] {
            stock.combine();
        }

        ctx.record(
            ctx.datum(REACTOR_INVENTORIES)
                .with("TritiumCore", self.tritium_core.quantity())
                .with("TritiumReserve", self.tritium_reserve.quantity())
                .with("TritiumExcess", self.tritium_excess.quantity())
                .with("TritiumSequestered", self.tritium_sequestered.quantity())
                .with("LithiumBlanket", self.blanket.quantity())
                .with("BlanketFeed", self.blanket_feed.quantity())
                .with("BlanketWaste", self.blanket_waste.quantity())
                .with("HeliumStorage", self.helium_storage.quantity()),
        );
    }

    fn requests(&self, time: u32) -> Vec<MaterialRequest> {
        [
            &self.fuel_startup_policy,
            &self.fuel_refill_policy,
            &self.blanket_fill_policy,
            &self.blanket_feed_policy,
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
            TRITIUM_CORE => Some(&mut self.tritium_core),
            TRITIUM_RESERVE => Some(&mut self.tritium_reserve),
            TRITIUM_EXCESS => Some(&mut self.tritium_excess),
            TRITIUM_SEQUESTERED => Some(&mut self.tritium_sequestered),
            HELIUM_STORAGE => Some(&mut self.helium_storage),
            BLANKET => Some(&mut self.blanket),
            BLANKET_FEED => Some(&mut self.blanket_feed),
            BLANKET_WASTE => Some(&mut self.blanket_waste),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Composition, Material};
    use crate::telemetry::{Datum, REACTOR_EVENTS, REACTOR_OPERATIONS, REACTOR_STATUS};
    use std::collections::BTreeMap;

    const MONTH: f64 = 2_629_846.0;

    fn plant_config() -> PlantConfig {
        serde_yaml::from_str(
            r#"
fuel_incommod: Tritium
blanket_incommod: Enriched_Lithium
fusion_power: 300
tbr: 1.05
reserve_inventory: 6.0
startup_inventory: 2.121
"#,
        )
        .unwrap()
    }

    fn tritium(qty: f64) -> Material {
        Material::new(qty, Composition::pure(NucId::TRITIUM))
    }

    fn lithium(qty: f64) -> Material {
        let mut m = BTreeMap::new();
        m.insert(NucId::LI6, 0.3);
        m.insert(NucId::LI7, 0.7);
        Material::new(qty, Composition::from_atom(m))
    }

    /// Serve every request from an unlimited supply
    fn supply(plant: &mut FusionPowerPlant, time: u32) {
        for req in plant.requests(time) {
            let lot = if req.commodity == "Tritium" {
                Material::new_at(req.quantity, Composition::pure(NucId::TRITIUM), time)
            } else {
                lithium(req.quantity)
            };
            plant.accept(&req.buffer, lot).unwrap();
        }
    }

    fn step(plant: &mut FusionPowerPlant, time: u32) -> Vec<Datum> {
        let mut ctx = FacilityContext::new(0, time, MONTH);
        plant.tick(&mut ctx);
        supply(plant, time);
        plant.tock(&mut ctx);
        ctx.into_records()
    }

    fn entered(config: PlantConfig) -> FusionPowerPlant {
        let mut plant = FusionPowerPlant::new("plant", config);
        let mut ctx = FacilityContext::new(0, 0, MONTH);
        plant.enter_notify(&mut ctx).unwrap();
        plant
    }

    fn find<'a>(rows: &'a [Datum], table: &str, event: &str) -> Option<&'a Datum> {
        rows.iter()
            .find(|d| d.table == table && d.text("Event") == Some(event))
    }

    #[test]
    fn test_startup_splits_core_and_reserve() {
        let mut plant = entered(plant_config());
        let wanted: f64 = plant
            .requests(0)
            .iter()
            .filter(|r| r.buffer == TRITIUM_RESERVE)
            .map(|r| r.quantity)
            .sum();
        assert!((wanted - 8.121).abs() < 1e-12);

        let rows = step(&mut plant, 0);
        assert!(find(&rows, REACTOR_EVENTS, "Startup").is_some());
        assert!(plant.state().is_operating());
        assert!((plant.tritium_core.quantity() - 2.121).abs() < 1e-12);
        assert!((plant.tritium_reserve.quantity() - 6.0).abs() < 1e-9);
        assert!(!plant.blanket_fill_policy.is_active());
    }

    #[test]
    fn test_core_held_at_startup_inventory() {
        let mut plant = entered(plant_config());
        step(&mut plant, 0);
        for t in 1..6 {
            let rows = step(&mut plant, t);
            let inventory = rows.iter().find(|d| d.table == REACTOR_INVENTORIES).unwrap();
            let core = inventory.float("TritiumCore").unwrap();
            assert!((core - 2.121).abs() < 1e-9, "core {} at t={}", core, t);
            let status = rows.iter().find(|d| d.table == REACTOR_STATUS).unwrap();
            assert_eq!(status.text("Status"), Some("Online"));
        }
    }

    #[test]
    fn test_breeding_surplus_reaches_excess() {
        let mut plant = entered(plant_config());
        let mut excess = 0.0;
        for t in 0..10 {
            let rows = step(&mut plant, t);
            let inventory = rows.iter().find(|d| d.table == REACTOR_INVENTORIES).unwrap();
            excess = inventory.float("TritiumExcess").unwrap();
        }
        assert!(excess > 0.0);
        assert!(plant.offers().iter().any(|o| o.buffer == TRITIUM_EXCESS));
    }

    #[test]
    fn test_blanket_cycled_from_feed() {
        let mut plant = entered(plant_config());
        step(&mut plant, 0);
        let rows = step(&mut plant, 1);
        let cycled = find(&rows, REACTOR_OPERATIONS, "BlanketCycled").unwrap();
        assert_eq!(cycled.text("Value"), Some("50.000000kg of blanket removed"));
        let waste = plant.blanket_waste.quantity();
        assert!((waste - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_shutdown_without_feed() {
        let mut plant = entered(plant_config());
        step(&mut plant, 0);
        plant.blanket_feed.pop_all();

        let mut ctx = FacilityContext::new(0, 1, MONTH);
        plant.tick(&mut ctx);
        let rows = ctx.into_records();
        let shutdown = find(&rows, REACTOR_EVENTS, "CoreShutdown").unwrap();
        assert_eq!(shutdown.text("Value"), Some(SHUTDOWN_NO_FEED));
        assert_eq!(plant.state(), FacilityState::Shutdown);
        assert!(plant.tritium_core.is_empty());
        assert!(plant.fuel_startup_policy.is_active());
    }

    #[test]
    fn test_shutdown_without_fuel() {
        let mut plant = entered(plant_config());
        step(&mut plant, 0);
        plant.tritium_core.pop_all();
        plant.tritium_reserve.pop_all();

        let mut ctx = FacilityContext::new(0, 1, MONTH);
        plant.tick(&mut ctx);
        let rows = ctx.into_records();
        let shutdown = find(&rows, REACTOR_EVENTS, "CoreShutdown").unwrap();
        assert_eq!(shutdown.text("Value"), Some(SHUTDOWN_NO_FUEL));
        let status = rows.iter().find(|d| d.table == REACTOR_STATUS).unwrap();
        assert_eq!(status.text("Status"), Some("Shut-down"));
    }

    #[test]
    fn test_shutdown_on_contaminated_core() {
        let mut plant = entered(plant_config());
        step(&mut plant, 0);
        plant
            .tritium_core
            .push(Material::new(0.1, Composition::pure(NucId::HE4)));

        let mut ctx = FacilityContext::new(0, 1, MONTH);
        plant.tick(&mut ctx);
        let rows = ctx.into_records();
        let shutdown = find(&rows, REACTOR_EVENTS, "CoreShutdown").unwrap();
        assert_eq!(shutdown.text("Value"), Some(SHUTDOWN_DIRTY_FUEL));
        assert_eq!(plant.state(), FacilityState::Shutdown);
        // the unloaded core, helium included, waits in the reserve
        assert!(plant.tritium_core.is_empty());
        assert!((plant.tritium_reserve.mass(NucId::HE4) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_startup_requires_core_and_reserve() {
        let mut plant = entered(plant_config());
        let mut ctx = FacilityContext::new(0, 0, MONTH);
        plant.tick(&mut ctx);
        plant.accept(TRITIUM_RESERVE, tritium(7.0)).unwrap();
        plant.tock(&mut ctx);
        let rows = ctx.into_records();
        let error = find(&rows, REACTOR_OPERATIONS, "StartupError").unwrap();
        assert_eq!(
            error.text("Value"),
            Some("Startup Failed: 7.000000 kg in storage is less than required 8.121000 kg to start-up!")
        );
        assert_eq!(plant.state(), FacilityState::NotStarted);
    }

    #[test]
    fn test_sequestered_pool_reaches_equilibrium() {
        let mut config = plant_config();
        config.sequestered_equilibrium = 1.0;
        let mut plant = entered(config);
        step(&mut plant, 0);
        step(&mut plant, 1);
        let sequestered = plant.tritium_sequestered.quantity();
        assert!((sequestered - 1.0).abs() < 1e-9);
        // reserve is kept at its floor once the pool is full
        assert!(plant.tritium_reserve.quantity() <= 6.0 + 1e-9);
    }
}

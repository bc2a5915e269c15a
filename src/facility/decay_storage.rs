//! Bulk tritium storage that lets its inventory decay.

use super::{decay_and_strip, ConfigurationError, Facility, FacilityContext, FacilityState};
use crate::config::DecayStorageConfig;
use crate::inventory::{InventoryTracker, StockSet};
use crate::material::MaterialStock;
use crate::policy::{BuyMode, BuyPolicy, MaterialOffer, MaterialRequest, SellPolicy};
use crate::telemetry::{Recorder, STORAGE_INVENTORIES};
use log::{debug, info};

pub const TRITIUM_STORAGE: &str = "tritium_storage";
pub const HELIUM_STORAGE: &str = "helium_storage";

pub struct DecayStorage {
    name: String,
    config: DecayStorageConfig,
    state: FacilityState,
    tritium_storage: MaterialStock,
    helium_storage: MaterialStock,
    buy_policy: BuyPolicy,
    tritium_sell_policy: SellPolicy,
    helium_sell_policy: Option<SellPolicy>,
}

impl DecayStorage {
    pub fn new(name: &str, config: DecayStorageConfig) -> Self {
        let tracker = InventoryTracker::new(config.max_tritium_inventory, &[TRITIUM_STORAGE]);
        let buy_policy = BuyPolicy::new("Input", TRITIUM_STORAGE, &config.incommod, BuyMode::Unbounded)
            .with_tracker(tracker);
        let tritium_sell_policy = SellPolicy::new(TRITIUM_STORAGE, &config.outcommod);
        let helium_sell_policy = config
            .he3_outcommod
            .as_deref()
            .map(|commod| SellPolicy::new(HELIUM_STORAGE, commod));

        DecayStorage {
            name: name.to_string(),
            config,
            state: FacilityState::NotStarted,
            tritium_storage: MaterialStock::bulk(TRITIUM_STORAGE),
            helium_storage: MaterialStock::bulk(HELIUM_STORAGE),
            buy_policy,
            tritium_sell_policy,
            helium_sell_policy,
        }
    }

    pub fn config(&self) -> &DecayStorageConfig {
        &self.config
    }
}

impl StockSet for DecayStorage {
    fn stock(&self, name: &str) -> Option<&MaterialStock> {
        match name {
            TRITIUM_STORAGE => Some(&self.tritium_storage),
            HELIUM_STORAGE => Some(&self.helium_storage),
            _ => None,
        }
    }
}

impl Facility for DecayStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn archetype(&self) -> &'static str {
        "DecayStorage"
    }

    fn state(&self) -> FacilityState {
        self.state
    }

    fn enter_notify(&mut self, ctx: &mut FacilityContext) -> Result<(), ConfigurationError> {
        self.tritium_storage.set_timestep(ctx.dt);
        self.helium_storage.set_timestep(ctx.dt);
        self.buy_policy.start(ctx.time);
        self.tritium_sell_policy.start();
        if let Some(policy) = self.helium_sell_policy.as_mut() {
            policy.start();
        }
        self.state = FacilityState::Operating;
        info!(
            "{} stores up to {} kg of {}",
            self.name, self.config.max_tritium_inventory, self.config.incommod
        );
        Ok(())
    }

    fn tick(&mut self, ctx: &mut FacilityContext) {
        decay_and_strip(
            &mut self.tritium_storage,
            &mut self.helium_storage,
            ctx.time,
            ctx.dt,
        );
        debug!(
            "{} t={}: {:.6} kg T, {:.6} kg He-3",
            self.name,
            ctx.time,
            self.tritium_storage.quantity(),
            self.helium_storage.quantity()
        );
    }

    fn tock(&mut self, ctx: &mut FacilityContext) {
        ctx.record(
            ctx.datum(STORAGE_INVENTORIES)
                .with("TritiumStorage", self.tritium_storage.quantity())
                .with("HeliumStorage", self.helium_storage.quantity()),
        );
    }

    fn requests(&self, time: u32) -> Vec<MaterialRequest> {
        self.buy_policy.request(time, self).into_iter().collect()
    }

    fn offers(&self) -> Vec<MaterialOffer> {
        let mut offers: Vec<MaterialOffer> = self.tritium_sell_policy.offer(self).into_iter().collect();
        if let Some(policy) = &self.helium_sell_policy {
            offers.extend(policy.offer(self));
        }
        offers
    }

    fn stock_mut(&mut self, name: &str) -> Option<&mut MaterialStock> {
        match name {
            TRITIUM_STORAGE => Some(&mut self.tritium_storage),
            HELIUM_STORAGE => Some(&mut self.helium_storage),
            _ => None,
        }
    }
}

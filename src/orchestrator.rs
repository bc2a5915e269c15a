//! Simulation orchestrator.
//!
//! Builds the facilities, sources and sinks of a scenario and drives them
//! through the fixed-timestep loop. Every step runs the facility ticks,
//! then one round of trading, then the facility tocks. Ticks and tocks are
//! independent per facility and run on the rayon pool; the exchange and the
//! merge of recorded rows stay sequential in facility order so a run is
//! reproducible regardless of the thread count.

use crate::config::Config;
use crate::exchange::{AgentEntry, Exchange};
use crate::facility::{self, Facility, FacilityContext};
use crate::telemetry::{
    Datum, MemoryRecorder, REACTOR_EVENTS, REACTOR_STATUS, TRANSACTIONS,
};
use color_eyre::eyre::{eyre, Result};
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Final state of one facility
#[derive(Debug, Clone, Serialize)]
pub struct FacilitySummary {
    pub id: usize,
    pub name: String,
    pub archetype: String,
    pub final_state: String,
    pub online_steps: usize,
    pub startups: usize,
    pub shutdowns: usize,
}

/// What a finished run looked like
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub duration: u32,
    pub timestep_seconds: f64,
    pub facilities: Vec<FacilitySummary>,
    pub agents: Vec<AgentEntry>,
    pub transactions: usize,
    pub traded_quantity: f64,
    pub record_counts: BTreeMap<String, usize>,
}

pub struct Simulation {
    duration: u32,
    dt: f64,
    time: u32,
    entered: bool,
    facilities: Vec<Box<dyn Facility>>,
    exchange: Exchange,
    recorder: MemoryRecorder,
    traded_quantity: f64,
}

impl Simulation {
    /// Build every agent described by `config`
    pub fn new(config: &Config) -> Result<Self> {
        let facilities: Vec<Box<dyn Facility>> =
            config.facilities.iter().map(facility::build).collect();
        let exchange = Exchange::from_config(config)
            .map_err(|e| eyre!("Failed to set up sources and sinks: {}", e))?;

        info!(
            "Built {} facilities, {} sources and {} sinks",
            facilities.len(),
            exchange.sources().len(),
            exchange.sinks().len()
        );

        Ok(Simulation {
            duration: config.general.duration,
            dt: config.dt_seconds(),
            time: 0,
            entered: false,
            facilities,
            exchange,
            recorder: MemoryRecorder::new(),
            traded_quantity: 0.0,
        })
    }

    pub fn time(&self) -> u32 {
        self.time
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn facilities(&self) -> &[Box<dyn Facility>] {
        &self.facilities
    }

    pub fn records(&self) -> &MemoryRecorder {
        &self.recorder
    }

    pub fn into_records(self) -> MemoryRecorder {
        self.recorder
    }

    /// Facilities, sources and sinks with their agent ids
    pub fn agents(&self) -> Vec<AgentEntry> {
        let facilities = self.facilities.iter().enumerate().map(|(id, f)| AgentEntry {
            id,
            name: f.name().to_string(),
            kind: f.archetype().to_string(),
        });
        facilities.chain(self.exchange.agents()).collect()
    }

    /// Notify every facility that it entered the simulation
    pub fn enter(&mut self) -> Result<()> {
        if self.entered {
            return Ok(());
        }
        for (id, facility) in self.facilities.iter_mut().enumerate() {
            let mut ctx = FacilityContext::new(id, self.time, self.dt);
            facility.enter_notify(&mut ctx).map_err(|e| {
                eyre!("Facility '{}' rejected its configuration: {}", facility.name(), e)
            })?;
            self.recorder.extend(ctx.into_records());
        }
        self.entered = true;
        Ok(())
    }

    /// Run one timestep
    pub fn step(&mut self) -> Result<()> {
        self.enter()?;
        let time = self.time;
        let dt = self.dt;

        let ticks: Vec<Vec<Datum>> = self
            .facilities
            .par_iter_mut()
            .enumerate()
            .map(|(id, facility)| {
                let mut ctx = FacilityContext::new(id, time, dt);
                facility.tick(&mut ctx);
                ctx.into_records()
            })
            .collect();
        self.recorder.extend(ticks.into_iter().flatten());

        let traded = self
            .exchange
            .trade(time, &mut self.facilities, &mut self.recorder);
        self.traded_quantity += traded.quantity;

        let tocks: Vec<Vec<Datum>> = self
            .facilities
            .par_iter_mut()
            .enumerate()
            .map(|(id, facility)| {
                let mut ctx = FacilityContext::new(id, time, dt);
                facility.tock(&mut ctx);
                ctx.into_records()
            })
            .collect();
        self.recorder.extend(tocks.into_iter().flatten());

        debug!(
            "t={}: {} transactions, {:.6} kg traded",
            time, traded.transactions, traded.quantity
        );
        self.time += 1;
        Ok(())
    }

    /// Run every remaining timestep
    pub fn run(&mut self) -> Result<RunSummary> {
        info!("Running {} timesteps of {} s", self.duration, self.dt);
        while self.time < self.duration {
            self.step()?;
        }
        info!(
            "Simulation finished after {} timesteps with {} recorded rows",
            self.time,
            self.recorder.len()
        );
        Ok(self.summary())
    }

    pub fn summary(&self) -> RunSummary {
        let facilities = self
            .facilities
            .iter()
            .enumerate()
            .map(|(id, f)| FacilitySummary {
                id,
                name: f.name().to_string(),
                archetype: f.archetype().to_string(),
                final_state: f.state().to_string(),
                online_steps: self
                    .recorder
                    .agent_table(REACTOR_STATUS, id)
                    .filter(|d| d.text("Status") == Some(facility::STATUS_ONLINE))
                    .count(),
                startups: count_events(&self.recorder, id, "Startup"),
                shutdowns: count_events(&self.recorder, id, "CoreShutdown"),
            })
            .collect();

        RunSummary {
            duration: self.time,
            timestep_seconds: self.dt,
            facilities,
            agents: self.agents(),
            transactions: self.recorder.table(TRANSACTIONS).count(),
            traded_quantity: self.traded_quantity,
            record_counts: self.recorder.counts(),
        }
    }
}

fn count_events(recorder: &MemoryRecorder, agent_id: usize, event: &str) -> usize {
    recorder
        .agent_table(REACTOR_EVENTS, agent_id)
        .filter(|d| d.text("Event") == Some(event))
        .count()
}

/// Size the global rayon pool; the first call wins
pub fn configure_threads(threads: usize) -> Result<()> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .map_err(|e| eyre!("Failed to configure {} worker threads: {}", threads, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{REACTOR_INVENTORIES, STORAGE_INVENTORIES};

    const STORAGE_YAML: &str = r#"
general:
  duration: 3
recipes:
  tritium:
    nuclides: { T: 1.0 }
facilities:
  - name: tank
    archetype: DecayStorage
    incommod: Tritium
    outcommod: Stored_Tritium
    max_tritium_inventory: 2.0
sources:
  - name: supply
    commodity: Tritium
    recipe: tritium
    capacity: 1.0
"#;

    fn config(yaml: &str) -> Config {
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
        config
    }

    #[test]
    fn test_storage_filled_by_source() {
        let mut sim = Simulation::new(&config(STORAGE_YAML)).unwrap();
        let summary = sim.run().unwrap();

        assert_eq!(summary.duration, 3);
        // the last step only tops up what decayed
        assert_eq!(summary.transactions, 3);
        let rows: Vec<_> = sim.records().agent_table(STORAGE_INVENTORIES, 0).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].float("TritiumStorage"), Some(1.0));
        let last = rows[2].float("TritiumStorage").unwrap();
        assert!((last - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_agent_listing() {
        let sim = Simulation::new(&config(STORAGE_YAML)).unwrap();
        let agents = sim.agents();
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].kind, "DecayStorage");
        assert_eq!(agents[1].name, "supply");
        assert_eq!(agents[1].id, 1);
    }

    #[test]
    fn test_bad_refuel_mode_fails_on_entry() {
        let yaml = r#"
general:
  duration: 2
facilities:
  - name: plant
    archetype: Reactor
    fuel_incommod: Tritium
    blanket_incommod: Lithium
    fusion_power: 300
    tbr: 1.05
    startup_inventory: 8.121
    reserve_inventory: 6
    refuel_mode: sometimes
"#;
        let mut sim = Simulation::new(&config(yaml)).unwrap();
        let err = sim.run().unwrap_err();
        assert!(err.to_string().contains("Refill mode sometimes not recognized"));
        assert_eq!(sim.time(), 0);
    }

    #[test]
    fn test_steps_are_repeatable() {
        let yaml = r#"
general:
  duration: 6
recipes:
  tritium:
    nuclides: { T: 1.0 }
  enriched_lithium:
    basis: atom
    nuclides: { Li6: 0.3, Li7: 0.7 }
facilities:
  - name: plant
    archetype: Reactor
    fuel_incommod: Tritium
    blanket_incommod: Enriched_Lithium
    fusion_power: 300
    tbr: 1.05
    startup_inventory: 8.121
    reserve_inventory: 6
  - name: tank
    archetype: DecayStorage
    incommod: Tritium
    outcommod: Stored_Tritium
sources:
  - name: tritium_supply
    commodity: Tritium
    recipe: tritium
    capacity: 10
  - name: lithium_supply
    commodity: Enriched_Lithium
    recipe: enriched_lithium
"#;
        let cfg = config(yaml);
        let mut first = Simulation::new(&cfg).unwrap();
        let mut second = Simulation::new(&cfg).unwrap();
        first.run().unwrap();
        second.run().unwrap();

        let a: Vec<_> = first.records().table(REACTOR_INVENTORIES).collect();
        let b: Vec<_> = second.records().table(REACTOR_INVENTORIES).collect();
        assert_eq!(a.len(), 6);
        assert_eq!(a, b);
    }
}

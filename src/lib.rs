//! # Tricycle - Tritium fuel-cycle facilities for timestep simulations
//!
//! This library models the facilities of a fusion fuel cycle and a small
//! deterministic host that steps them through a scenario.
//!
//! ## Overview
//!
//! A fusion plant burns tritium, breeds new tritium in a lithium blanket and
//! loses the inventory it holds to radioactive decay. Tricycle tracks every
//! kilogram of it: tritium moves between named stocks inside each facility,
//! decays into helium-3, and is bought and sold on commodities matched by a
//! per-step exchange.
//!
//! ## Key Features
//!
//! - **Three archetypes**: `DecayStorage`, `Reactor` and `FusionPowerPlant`
//! - **Decay-aware material**: lots remember when they last decayed
//! - **Blanket breeding**: Li-6 and Li-7 depletion with a configurable TBR
//! - **Buy and sell policies**: fill, schedule and capacity-bounded purchases
//! - **Reproducible**: parallel stepping with a sequential exchange
//!
//! ## Architecture
//!
//! - `nuclide`: nuclide ids and the static nuclide table
//! - `decay`: closed-form decay of nuclide inventories
//! - `material`: compositions, lots and stocks
//! - `breeding`: tritium production in the lithium blanket
//! - `inventory`: capacity limits over sets of stocks
//! - `policy`: buy and sell policies
//! - `facility`: the facility archetypes
//! - `exchange`: sources, sinks and per-step trading
//! - `telemetry`: recorded rows and in-memory recorders
//! - `config` / `config_loader`: scenario files
//! - `orchestrator`: the timestep loop
//! - `report`: JSON, text and compressed binary output
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tricycle::{config_loader, orchestrator::Simulation};
//! use std::path::Path;
//!
//! let config = config_loader::load_config(Path::new("scenarios/fpp_baseline.yaml"))?;
//! let mut sim = Simulation::new(&config)?;
//! let summary = sim.run()?;
//! println!("{} transactions", summary.transactions);
//! # Ok::<(), color_eyre::Report>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! general:
//!   duration: 120
//!   timestep: 2629846s
//!
//! recipes:
//!   tritium:
//!     nuclides: { T: 1.0 }
//!   enriched_lithium:
//!     basis: atom
//!     nuclides: { Li6: 0.3, Li7: 0.7 }
//!
//! facilities:
//!   - name: plant
//!     archetype: FusionPowerPlant
//!     fuel_incommod: Tritium
//!     blanket_incommod: Enriched_Lithium
//!     fusion_power: 300
//!     TBR: 1.05
//!     startup_inventory: 2.121
//!     reserve_inventory: 6
//!
//! sources:
//!   - { name: tritium_supply, commodity: Tritium, recipe: tritium }
//!   - { name: lithium_supply, commodity: Enriched_Lithium, recipe: enriched_lithium }
//! ```
//!
//! ## Error Handling
//!
//! Domain operations return typed errors built with `thiserror`. The loader,
//! orchestrator and report writers return `color_eyre` results with context.

pub mod breeding;
pub mod config;
pub mod config_loader;
pub mod decay;
pub mod exchange;
pub mod facility;
pub mod inventory;
pub mod material;
pub mod nuclide;
pub mod orchestrator;
pub mod policy;
pub mod report;
pub mod telemetry;

//! Per-step material market.
//!
//! Sources and sinks are the trivial agents at the edge of a scenario. Each
//! step the exchange walks the facilities in configuration order and fills
//! their requests, first from other facilities' offers and then from
//! sources. Whatever is still on offer afterwards goes to the sinks.

use crate::config::{Config, SinkConfig, SourceConfig};
use crate::facility::{ConfigurationError, Facility};
use crate::material::{Composition, Material, QTY_EPSILON};
use crate::policy::MaterialOffer;
use crate::telemetry::{Datum, Recorder, TRANSACTIONS};
use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;

/// Supplies fresh material of one recipe
#[derive(Debug, Clone)]
pub struct Source {
    pub name: String,
    pub commodity: String,
    pub composition: Composition,
    /// kg per step, unlimited when `None`
    pub capacity: Option<f64>,
}

impl Source {
    fn from_config(
        config: &SourceConfig,
        recipes: &BTreeMap<String, Composition>,
    ) -> Result<Self, ConfigurationError> {
        let composition = recipes
            .get(&config.recipe)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownRecipe(config.recipe.clone()))?;
        Ok(Source {
            name: config.name.clone(),
            commodity: config.commodity.clone(),
            composition,
            capacity: config.capacity,
        })
    }
}

/// Takes and discards offered material
#[derive(Debug, Clone)]
pub struct Sink {
    pub name: String,
    pub commodity: String,
    pub capacity: Option<f64>,
}

impl From<&SinkConfig> for Sink {
    fn from(config: &SinkConfig) -> Self {
        Sink {
            name: config.name.clone(),
            commodity: config.commodity.clone(),
            capacity: config.capacity,
        }
    }
}

/// One row of the agent listing in the run summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentEntry {
    pub id: usize,
    pub name: String,
    pub kind: String,
}

/// Totals for one step of trading
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TradeSummary {
    pub transactions: usize,
    pub quantity: f64,
}

impl TradeSummary {
    fn add(&mut self, quantity: f64) {
        self.transactions += 1;
        self.quantity += quantity;
    }
}

struct OpenOffer {
    facility: usize,
    offer: MaterialOffer,
    remaining: f64,
}

pub struct Exchange {
    sources: Vec<Source>,
    sinks: Vec<Sink>,
    /// Agent id of the first source; sinks follow the sources
    first_source_id: usize,
}

impl Exchange {
    pub fn new(sources: Vec<Source>, sinks: Vec<Sink>, facility_count: usize) -> Self {
        Exchange {
            sources,
            sinks,
            first_source_id: facility_count,
        }
    }

    /// Resolve the sources and sinks of a scenario
    pub fn from_config(config: &Config) -> Result<Self, ConfigurationError> {
        let mut recipes = BTreeMap::new();
        for (name, recipe) in &config.recipes {
            let composition =
                recipe
                    .composition()
                    .map_err(|e| ConfigurationError::InvalidRecipe {
                        name: name.clone(),
                        reason: e.to_string(),
                    })?;
            recipes.insert(name.clone(), composition);
        }

        let sources = config
            .sources
            .iter()
            .map(|s| Source::from_config(s, &recipes))
            .collect::<Result<Vec<_>, _>>()?;
        let sinks = config.sinks.iter().map(Sink::from).collect();

        Ok(Self::new(sources, sinks, config.facilities.len()))
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn sinks(&self) -> &[Sink] {
        &self.sinks
    }

    fn source_id(&self, index: usize) -> usize {
        self.first_source_id + index
    }

    fn sink_id(&self, index: usize) -> usize {
        self.first_source_id + self.sources.len() + index
    }

    /// Sources and sinks with their agent ids
    pub fn agents(&self) -> Vec<AgentEntry> {
        let sources = self.sources.iter().enumerate().map(|(i, s)| AgentEntry {
            id: self.source_id(i),
            name: s.name.clone(),
            kind: "Source".to_string(),
        });
        let sinks = self.sinks.iter().enumerate().map(|(i, s)| AgentEntry {
            id: self.sink_id(i),
            name: s.name.clone(),
            kind: "Sink".to_string(),
        });
        sources.chain(sinks).collect()
    }

    /// Match every facility request and offer for one step
    pub fn trade(
        &self,
        time: u32,
        facilities: &mut [Box<dyn Facility>],
        recorder: &mut dyn Recorder,
    ) -> TradeSummary {
        let mut summary = TradeSummary::default();
        let mut source_left: Vec<f64> = self
            .sources
            .iter()
            .map(|s| s.capacity.unwrap_or(f64::INFINITY))
            .collect();
        let mut sink_left: Vec<f64> = self
            .sinks
            .iter()
            .map(|s| s.capacity.unwrap_or(f64::INFINITY))
            .collect();

        let mut offers: Vec<OpenOffer> = facilities
            .iter()
            .enumerate()
            .flat_map(|(facility, f)| {
                f.offers().into_iter().map(move |offer| OpenOffer {
                    facility,
                    remaining: offer.quantity,
                    offer,
                })
            })
            .collect();

        for receiver in 0..facilities.len() {
            for request in facilities[receiver].requests(time) {
                let mut wanted = request.quantity;
                let mut refused = false;

                for open in offers.iter_mut() {
                    if wanted <= QTY_EPSILON || refused {
                        break;
                    }
                    if open.facility == receiver
                        || open.offer.commodity != request.commodity
                        || open.remaining <= QTY_EPSILON
                    {
                        continue;
                    }
                    let qty = wanted.min(open.remaining);
                    let lot = match facilities[open.facility].withdraw(&open.offer.buffer, qty) {
                        Ok(lot) => lot,
                        Err(e) => {
                            warn!(
                                "{} could not hand over {} kg of {}: {}",
                                facilities[open.facility].name(),
                                qty,
                                open.offer.commodity,
                                e
                            );
                            continue;
                        }
                    };
                    let moved = lot.quantity();
                    if let Err(e) = facilities[receiver].accept(&request.buffer, lot.clone()) {
                        warn!("{} rejected delivery: {}", facilities[receiver].name(), e);
                        // undelivered material goes back where it came from
                        if let Err(e) = facilities[open.facility].accept(&open.offer.buffer, lot) {
                            warn!(
                                "{} could not take back {} kg of {}: {}",
                                facilities[open.facility].name(),
                                moved,
                                open.offer.commodity,
                                e
                            );
                        }
                        refused = true;
                        continue;
                    }
                    open.remaining -= moved;
                    wanted -= moved;
                    recorder.record(transaction(
                        receiver,
                        time,
                        facilities[open.facility].name(),
                        facilities[receiver].name(),
                        &request.commodity,
                        moved,
                    ));
                    summary.add(moved);
                }

                for (index, source) in self.sources.iter().enumerate() {
                    if wanted <= QTY_EPSILON || refused {
                        break;
                    }
                    if source.commodity != request.commodity || source_left[index] <= QTY_EPSILON
                    {
                        continue;
                    }
                    let qty = wanted.min(source_left[index]);
                    let lot = Material::new_at(qty, source.composition.clone(), time);
                    if let Err(e) = facilities[receiver].accept(&request.buffer, lot) {
                        warn!("{} rejected delivery: {}", facilities[receiver].name(), e);
                        refused = true;
                        continue;
                    }
                    source_left[index] -= qty;
                    wanted -= qty;
                    recorder.record(transaction(
                        receiver,
                        time,
                        &source.name,
                        facilities[receiver].name(),
                        &request.commodity,
                        qty,
                    ));
                    summary.add(qty);
                }

                if wanted > QTY_EPSILON {
                    debug!(
                        "t={}: {} short {:.6} kg of {}",
                        time,
                        facilities[receiver].name(),
                        wanted,
                        request.commodity
                    );
                }
            }
        }

        for open in offers.iter_mut() {
            for (index, sink) in self.sinks.iter().enumerate() {
                if open.remaining <= QTY_EPSILON {
                    break;
                }
                if sink.commodity != open.offer.commodity || sink_left[index] <= QTY_EPSILON {
                    continue;
                }
                let qty = open.remaining.min(sink_left[index]);
                let lot = match facilities[open.facility].withdraw(&open.offer.buffer, qty) {
                    Ok(lot) => lot,
                    Err(e) => {
                        warn!("{} could not sell to {}: {}", facilities[open.facility].name(), sink.name, e);
                        break;
                    }
                };
                let moved = lot.quantity();
                open.remaining -= moved;
                sink_left[index] -= moved;
                recorder.record(transaction(
                    self.sink_id(index),
                    time,
                    facilities[open.facility].name(),
                    &sink.name,
                    &open.offer.commodity,
                    moved,
                ));
                summary.add(moved);
            }
        }

        summary
    }
}

fn transaction(
    agent_id: usize,
    time: u32,
    sender: &str,
    receiver: &str,
    commodity: &str,
    quantity: f64,
) -> Datum {
    Datum::new(TRANSACTIONS, agent_id, time)
        .with("Sender", sender)
        .with("Receiver", receiver)
        .with("Commodity", commodity)
        .with("Quantity", quantity)
}

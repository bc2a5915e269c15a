//! Buy and sell policies attached to facility stocks.
//!
//! Policies only describe what a facility wants or has on offer each step.
//! Matching them up is the job of the host exchange.

use crate::inventory::{InventoryTracker, StockSet};
use crate::material::QTY_EPSILON;
use serde::Serialize;

/// Request for material to be delivered into a facility stock
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialRequest {
    pub buffer: String,
    pub commodity: String,
    pub quantity: f64,
}

/// Material a facility is willing to hand over from one of its stocks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialOffer {
    pub buffer: String,
    pub commodity: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuyMode {
    /// Top the stock up to `fill_to` kg every step
    Fill { fill_to: f64 },
    /// Buy `quantity` kg on `active` steps, then wait `dormant` steps
    Schedule {
        quantity: f64,
        active: u32,
        dormant: u32,
    },
    /// Take whatever the tracker still has room for
    Unbounded,
}

#[derive(Debug, Clone)]
pub struct BuyPolicy {
    pub label: String,
    pub buffer: String,
    pub commodity: String,
    pub mode: BuyMode,
    pub tracker: Option<InventoryTracker>,
    active: bool,
    started_at: u32,
}

impl BuyPolicy {
    pub fn new(label: &str, buffer: &str, commodity: &str, mode: BuyMode) -> Self {
        BuyPolicy {
            label: label.to_string(),
            buffer: buffer.to_string(),
            commodity: commodity.to_string(),
            mode,
            tracker: None,
            active: false,
            started_at: 0,
        }
    }

    pub fn with_tracker(mut self, tracker: InventoryTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Begin requesting; schedules count their cadence from `time`.
    /// Starting an already active policy keeps its original cadence.
    pub fn start(&mut self, time: u32) {
        if !self.active {
            self.active = true;
            self.started_at = time;
        }
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// What the policy asks for at `time`, if anything
    pub fn request(&self, time: u32, stocks: &dyn StockSet) -> Option<MaterialRequest> {
        if !self.active {
            return None;
        }

        let capacity = self
            .tracker
            .as_ref()
            .map(|t| t.available_capacity(stocks))
            .unwrap_or(f64::INFINITY);

        let wanted = match &self.mode {
            BuyMode::Fill { fill_to } => {
                let held = stocks.stock(&self.buffer).map(|s| s.quantity()).unwrap_or(0.0);
                fill_to - held
            }
            BuyMode::Schedule {
                quantity,
                active,
                dormant,
            } => {
                let period = (active + dormant).max(1);
                let phase = time.saturating_sub(self.started_at) % period;
                if phase < *active {
                    *quantity
                } else {
                    0.0
                }
            }
            BuyMode::Unbounded => capacity,
        };

        let quantity = wanted.min(capacity);
        if quantity.is_finite() && quantity > QTY_EPSILON {
            Some(MaterialRequest {
                buffer: self.buffer.clone(),
                commodity: self.commodity.clone(),
                quantity,
            })
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct SellPolicy {
    pub buffer: String,
    pub commodity: String,
    active: bool,
}

impl SellPolicy {
    pub fn new(buffer: &str, commodity: &str) -> Self {
        SellPolicy {
            buffer: buffer.to_string(),
            commodity: commodity.to_string(),
            active: false,
        }
    }

    pub fn start(&mut self) {
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Offer the whole content of the stock
    pub fn offer(&self, stocks: &dyn StockSet) -> Option<MaterialOffer> {
        if !self.active {
            return None;
        }
        let quantity = stocks.stock(&self.buffer)?.quantity();
        (quantity > QTY_EPSILON).then(|| MaterialOffer {
            buffer: self.buffer.clone(),
            commodity: self.commodity.clone(),
            quantity,
        })
    }
}

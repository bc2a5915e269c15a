//! Named buffers of material owned by a facility.

use super::{Composition, Material, StockError, QTY_EPSILON};
use crate::config::DEFAULT_TIMESTEP_SECONDS;
use crate::nuclide::NucId;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How pushed lots are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockMode {
    /// Lots merge on push
    Bulk,
    /// Lots are kept apart until `combine`
    Discrete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Holding {
    Homogeneous(Material),
    Heterogeneous(VecDeque<Material>),
}

#[derive(Debug, Clone)]
pub struct MaterialStock {
    name: String,
    mode: StockMode,
    holding: Holding,
    /// Timestep length used to bring lots to a common decay stamp on merge
    timestep: f64,
}

impl MaterialStock {
    pub fn new(name: impl Into<String>, mode: StockMode) -> Self {
        let holding = match mode {
            StockMode::Bulk => Holding::Homogeneous(Material::zero()),
            StockMode::Discrete => Holding::Heterogeneous(VecDeque::new()),
        };
        MaterialStock {
            name: name.into(),
            mode,
            holding,
            timestep: DEFAULT_TIMESTEP_SECONDS as f64,
        }
    }

    pub fn bulk(name: impl Into<String>) -> Self {
        Self::new(name, StockMode::Bulk)
    }

    pub fn discrete(name: impl Into<String>) -> Self {
        Self::new(name, StockMode::Discrete)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> StockMode {
        self.mode
    }

    pub fn holding(&self) -> &Holding {
        &self.holding
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    pub fn set_timestep(&mut self, dt_seconds: f64) {
        self.timestep = dt_seconds;
    }

    /// Total quantity held in kg
    pub fn quantity(&self) -> f64 {
        match &self.holding {
            Holding::Homogeneous(lot) => lot.quantity(),
            Holding::Heterogeneous(lots) => lots.iter().map(Material::quantity).sum(),
        }
    }

    /// Number of non-empty lots
    pub fn count(&self) -> usize {
        match &self.holding {
            Holding::Homogeneous(lot) => usize::from(!lot.is_empty()),
            Holding::Heterogeneous(lots) => lots.iter().filter(|l| !l.is_empty()).count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quantity() <= 0.0
    }

    /// Mass in kg of one nuclide across every lot
    pub fn mass(&self, nuc: NucId) -> f64 {
        match &self.holding {
            Holding::Homogeneous(lot) => lot.mass(nuc),
            Holding::Heterogeneous(lots) => lots.iter().map(|l| l.mass(nuc)).sum(),
        }
    }

    pub fn push(&mut self, lot: Material) {
        if lot.is_empty() {
            return;
        }
        let dt = self.timestep;
        match &mut self.holding {
            Holding::Homogeneous(held) => held.absorb(lot, dt),
            Holding::Heterogeneous(lots) => lots.push_back(lot),
        }
    }

    /// Remove `qty` kg, drawing from the front lot first
    pub fn pop(&mut self, qty: f64) -> Result<Material, StockError> {
        if qty < 0.0 {
            return Err(StockError::NegativeQuantity(qty));
        }
        let available = self.quantity();
        if qty > available + QTY_EPSILON {
            return Err(StockError::InsufficientQuantity {
                requested: qty,
                available,
            });
        }
        if qty >= available {
            return Ok(self.pop_all());
        }

        let dt = self.timestep;
        match &mut self.holding {
            Holding::Homogeneous(held) => held.extract_qty(qty),
            Holding::Heterogeneous(lots) => {
                let mut taken = Material::zero();
                let mut remaining = qty;
                while remaining > 0.0 {
                    let Some(front) = lots.front_mut() else {
                        break;
                    };
                    if front.quantity() <= remaining {
                        remaining -= front.quantity();
                        if let Some(lot) = lots.pop_front() {
                            taken.absorb(lot, dt);
                        }
                    } else {
                        taken.absorb(front.extract_qty(remaining)?, dt);
                        remaining = 0.0;
                    }
                }
                Ok(taken)
            }
        }
    }

    /// Remove everything; yields a zero-quantity lot when empty
    pub fn pop_all(&mut self) -> Material {
        let dt = self.timestep;
        match &mut self.holding {
            Holding::Homogeneous(held) => std::mem::replace(held, Material::zero()),
            Holding::Heterogeneous(lots) => {
                let mut all = Material::zero();
                for lot in lots.drain(..) {
                    all.absorb(lot, dt);
                }
                all
            }
        }
    }

    /// Remove the foremost lot whole
    pub fn pop_lot(&mut self) -> Option<Material> {
        match &mut self.holding {
            Holding::Homogeneous(held) if !held.is_empty() => {
                Some(std::mem::replace(held, Material::zero()))
            }
            Holding::Homogeneous(_) => None,
            Holding::Heterogeneous(lots) => lots.pop_front(),
        }
    }

    /// The foremost lot
    pub fn peek(&self) -> Option<&Material> {
        match &self.holding {
            Holding::Homogeneous(held) if !held.is_empty() => Some(held),
            Holding::Homogeneous(_) => None,
            Holding::Heterogeneous(lots) => lots.front(),
        }
    }

    /// True when every held lot is `nuc` within `tolerance`
    pub fn is_pure(&self, nuc: NucId, tolerance: f64) -> bool {
        match &self.holding {
            Holding::Homogeneous(held) => held.is_empty() || held.is_pure(nuc, tolerance),
            Holding::Heterogeneous(lots) => lots
                .iter()
                .all(|lot| lot.is_empty() || lot.is_pure(nuc, tolerance)),
        }
    }

    /// Decay every lot to `time`
    pub fn decay(&mut self, time: u32, dt_seconds: f64) {
        self.timestep = dt_seconds;
        match &mut self.holding {
            Holding::Homogeneous(held) => held.decay(time, dt_seconds),
            Holding::Heterogeneous(lots) => {
                for lot in lots.iter_mut() {
                    lot.decay(time, dt_seconds);
                }
            }
        }
    }

    /// Remove `amount` kg of `comp` from the foremost lot
    pub fn extract(&mut self, comp: &Composition, amount: f64) -> Result<Material, StockError> {
        match &mut self.holding {
            Holding::Homogeneous(held) => held.extract_comp(amount, comp),
            Holding::Heterogeneous(lots) => match lots.front_mut() {
                Some(front) => front.extract_comp(amount, comp),
                None => Err(StockError::InsufficientQuantity {
                    requested: amount,
                    available: 0.0,
                }),
            },
        }
    }

    /// Remove every atom of `nuc` from every lot
    pub fn extract_nuclide(&mut self, nuc: NucId) -> Material {
        let mut out = Material::zero();
        let dt = self.timestep;
        match &mut self.holding {
            Holding::Homogeneous(held) => out.absorb(held.extract_nuclide(nuc), dt),
            Holding::Heterogeneous(lots) => {
                for lot in lots.iter_mut() {
                    out.absorb(lot.extract_nuclide(nuc), dt);
                }
                lots.retain(|l| !l.is_empty());
            }
        }
        out
    }

    /// Merge all lots into one
    pub fn combine(&mut self) {
        if let Holding::Heterogeneous(lots) = &mut self.holding {
            if lots.len() <= 1 {
                return;
            }
            debug!("{}: combining {} lots", self.name, lots.len());
            let mut merged = Material::zero();
            for lot in lots.drain(..) {
                merged.absorb(lot, self.timestep);
            }
            lots.push_back(merged);
        }
    }

    /// Apply `f` to the single combined lot, creating it if needed
    pub fn with_lot<R>(&mut self, f: impl FnOnce(&mut Material) -> R) -> R {
        self.combine();
        match &mut self.holding {
            Holding::Homogeneous(held) => f(held),
            Holding::Heterogeneous(lots) => {
                let mut lot = lots.pop_front().unwrap_or_else(Material::zero);
                let result = f(&mut lot);
                if !lot.is_empty() {
                    lots.push_front(lot);
                }
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONTH: f64 = 2_629_846.0;

    fn tritium(qty: f64) -> Material {
        Material::new(qty, Composition::pure(NucId::TRITIUM))
    }

    fn helium4(qty: f64) -> Material {
        Material::new(qty, Composition::pure(NucId::HE4))
    }

    #[test]
    fn test_bulk_push_merges() {
        let mut stock = MaterialStock::bulk("storage");
        stock.push(tritium(1.0));
        stock.push(tritium(2.5));
        assert_eq!(stock.count(), 1);
        assert!((stock.quantity() - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_discrete_pop_is_fifo() {
        let mut stock = MaterialStock::discrete("blanket");
        stock.push(tritium(1.0));
        stock.push(helium4(1.0));

        let first = stock.pop(0.5).unwrap();
        assert!(first.is_pure(NucId::TRITIUM, 1e-12));

        let second = stock.pop(1.0).unwrap();
        assert!((second.mass(NucId::TRITIUM) - 0.5).abs() < 1e-12);
        assert!((second.mass(NucId::HE4) - 0.5).abs() < 1e-12);
        assert!((stock.quantity() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_pop_conserves_quantity() {
        let mut stock = MaterialStock::discrete("reserve");
        for q in [0.3, 1.7, 2.2, 0.05] {
            stock.push(tritium(q));
        }
        let before = stock.quantity();
        let mut popped = 0.0;
        for q in [0.4, 1.0, 0.25, 1.1] {
            popped += stock.pop(q).unwrap().quantity();
        }
        assert!((before - stock.quantity() - popped).abs() < 1e-9);
    }

    #[test]
    fn test_pop_too_much_leaves_stock_untouched() {
        let mut stock = MaterialStock::discrete("core");
        stock.push(tritium(1.0));
        stock.push(tritium(1.0));
        let err = stock.pop(3.0).unwrap_err();
        assert_eq!(
            err,
            StockError::InsufficientQuantity {
                requested: 3.0,
                available: 2.0
            }
        );
        assert_eq!(stock.count(), 2);
        assert_eq!(stock.quantity(), 2.0);
    }

    #[test]
    fn test_pop_all_empty() {
        let mut stock = MaterialStock::bulk("excess");
        let lot = stock.pop_all();
        assert_eq!(lot.quantity(), 0.0);
        assert!(stock.peek().is_none());
    }

    #[test]
    fn test_combine_is_idempotent() {
        let mut stock = MaterialStock::discrete("storage");
        stock.push(tritium(1.0));
        stock.push(helium4(2.0));
        stock.combine();
        let once = stock.holding().clone();
        stock.combine();
        assert_eq!(&once, stock.holding());
        assert_eq!(stock.count(), 1);
        assert!((stock.quantity() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_extract_nuclide_across_lots() {
        let mut stock = MaterialStock::discrete("storage");
        stock.push(tritium(1.0));
        stock.push(helium4(2.0));
        let he4 = stock.extract_nuclide(NucId::HE4);
        assert!((he4.quantity() - 2.0).abs() < 1e-12);
        assert_eq!(stock.count(), 1);
        assert!((stock.quantity() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_extract_from_front_lot() {
        let mut stock = MaterialStock::bulk("blanket");
        stock.push(tritium(1.0));
        stock.push(helium4(1.0));
        let he4 = stock.extract(&Composition::pure(NucId::HE4), 0.4).unwrap();
        assert!((he4.quantity() - 0.4).abs() < 1e-12);
        assert!((stock.mass(NucId::HE4) - 0.6).abs() < 1e-9);

        let err = stock.extract(&Composition::pure(NucId::LI6), 0.1).unwrap_err();
        assert!(matches!(err, StockError::InsufficientComponent { .. }));
    }

    #[test]
    fn test_extract_within_epsilon_conserves_mass() {
        let mut stock = MaterialStock::discrete("core");
        stock.push(tritium(1.0));
        let taken = stock
            .extract(&Composition::pure(NucId::TRITIUM), 1.0 + 5e-8)
            .unwrap();
        assert!((stock.quantity() + taken.quantity() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bulk_push_decays_held_lot_to_new_stamp() {
        let mut stock = MaterialStock::bulk("storage");
        stock.set_timestep(MONTH);
        stock.push(tritium(1.0));
        stock.push(Material::new_at(1.0, Composition::pure(NucId::TRITIUM), 12));

        let mut aged = tritium(1.0);
        aged.decay(12, MONTH);
        let expected = aged.mass(NucId::TRITIUM) + 1.0;
        assert!((stock.mass(NucId::TRITIUM) - expected).abs() < 1e-9);
        assert_eq!(stock.peek().map(Material::prev_decay_time), Some(12));
    }

    #[test]
    fn test_decay_sets_merge_timestep() {
        let mut stock = MaterialStock::discrete("storage");
        stock.decay(1, 86_400.0);
        assert_eq!(stock.timestep(), 86_400.0);
    }

    #[test]
    fn test_pop_lot_takes_front_lot_whole() {
        let mut stock = MaterialStock::discrete("blanket");
        stock.push(tritium(1.0));
        stock.push(helium4(2.0));

        let first = stock.pop_lot().unwrap();
        assert!(first.is_pure(NucId::TRITIUM, 1e-12));
        assert_eq!(first.quantity(), 1.0);
        assert_eq!(stock.count(), 1);

        let mut bulk = MaterialStock::bulk("storage");
        assert!(bulk.pop_lot().is_none());
        bulk.push(tritium(0.5));
        assert_eq!(bulk.pop_lot().map(|l| l.quantity()), Some(0.5));
        assert!(bulk.is_empty());
    }

    #[test]
    fn test_decay_empty_stock_is_noop() {
        let mut stock = MaterialStock::discrete("storage");
        stock.decay(5, 2_629_846.0);
        assert!(stock.is_empty());
    }

    #[test]
    fn test_with_lot_on_empty_discrete_stock() {
        let mut stock = MaterialStock::discrete("blanket");
        let q = stock.with_lot(|lot| lot.quantity());
        assert_eq!(q, 0.0);
        assert_eq!(stock.count(), 0);
    }
}

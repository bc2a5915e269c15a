//! A single lot of material: a quantity in kg with one composition.

use super::{Composition, StockError, QTY_EPSILON};
use crate::decay::DecayEngine;
use crate::nuclide::{NucId, NuclideTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    quantity: f64,
    composition: Composition,
    /// Timestep the lot was last decayed to
    prev_decay_time: u32,
}

impl Material {
    pub fn new(quantity: f64, composition: Composition) -> Self {
        Self::new_at(quantity, composition, 0)
    }

    /// A lot created at `time`; decay is measured from that timestep
    pub fn new_at(quantity: f64, composition: Composition, time: u32) -> Self {
        Material {
            quantity: quantity.max(0.0),
            composition,
            prev_decay_time: time,
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, Composition::empty())
    }

    /// Build a lot from mole counts per nuclide
    pub fn from_moles(moles: BTreeMap<NucId, f64>, time: u32) -> Self {
        let quantity = DecayEngine::global().mass_of(&moles);
        Self::new_at(quantity, Composition::from_atom(moles), time)
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    pub fn prev_decay_time(&self) -> u32 {
        self.prev_decay_time
    }

    pub fn is_empty(&self) -> bool {
        self.quantity <= 0.0
    }

    /// Total moles of atoms in the lot
    pub fn total_moles(&self) -> f64 {
        let molar_mass = self.composition.molar_mass();
        if molar_mass <= 0.0 {
            0.0
        } else {
            self.quantity * 1000.0 / molar_mass
        }
    }

    pub fn moles(&self, nuc: NucId) -> f64 {
        self.composition.atom_fraction(nuc) * self.total_moles()
    }

    /// Mass in kg of one nuclide
    pub fn mass(&self, nuc: NucId) -> f64 {
        self.composition.mass_fraction(nuc) * self.quantity
    }

    pub fn nuclide_moles(&self) -> BTreeMap<NucId, f64> {
        let total = self.total_moles();
        self.composition
            .atom_fractions()
            .iter()
            .map(|(nuc, frac)| (*nuc, frac * total))
            .collect()
    }

    pub fn nuclide_masses(&self) -> BTreeMap<NucId, f64> {
        self.composition
            .mass_fractions()
            .into_iter()
            .map(|(nuc, frac)| (nuc, frac * self.quantity))
            .collect()
    }

    /// True when the lot is a single nuclide within `tolerance`
    pub fn is_pure(&self, nuc: NucId, tolerance: f64) -> bool {
        self.composition.almost_eq(&Composition::pure(nuc), tolerance)
    }

    /// Merge another lot into this one by mass.
    ///
    /// The lot with the older decay stamp is first decayed to the newer one,
    /// `dt_seconds` being the length of one timestep.
    pub fn absorb(&mut self, mut other: Material, dt_seconds: f64) {
        if other.quantity <= 0.0 {
            return;
        }
        if self.quantity <= 0.0 {
            *self = other;
            return;
        }

        if self.prev_decay_time < other.prev_decay_time {
            self.decay(other.prev_decay_time, dt_seconds);
        } else {
            other.decay(self.prev_decay_time, dt_seconds);
        }

        let mut masses = self.nuclide_masses();
        for (nuc, mass) in other.nuclide_masses() {
            *masses.entry(nuc).or_insert(0.0) += mass;
        }
        self.quantity += other.quantity;
        self.composition = Composition::from_mass(masses);
    }

    /// Split off `qty` kg with the same composition
    pub fn extract_qty(&mut self, qty: f64) -> Result<Material, StockError> {
        if qty < 0.0 {
            return Err(StockError::NegativeQuantity(qty));
        }
        if qty > self.quantity + QTY_EPSILON {
            return Err(StockError::InsufficientQuantity {
                requested: qty,
                available: self.quantity,
            });
        }

        let taken = qty.min(self.quantity);
        self.quantity -= taken;
        if self.quantity < QTY_EPSILON * 1e-3 {
            self.quantity = 0.0;
        }
        Ok(Material::new_at(taken, self.composition.clone(), self.prev_decay_time))
    }

    /// Remove `qty` kg of material with composition `comp`.
    ///
    /// Every nuclide of `comp` must be present in at least the drawn mass
    /// (within `QTY_EPSILON`), otherwise nothing is removed.
    pub fn extract_comp(&mut self, qty: f64, comp: &Composition) -> Result<Material, StockError> {
        if qty < 0.0 {
            return Err(StockError::NegativeQuantity(qty));
        }
        if qty > self.quantity + QTY_EPSILON {
            return Err(StockError::InsufficientQuantity {
                requested: qty,
                available: self.quantity,
            });
        }

        let mut masses = self.nuclide_masses();
        let drawn: BTreeMap<NucId, f64> = comp
            .mass_fractions()
            .into_iter()
            .map(|(nuc, frac)| (nuc, frac * qty))
            .collect();

        for (nuc, want) in &drawn {
            let held = masses.get(nuc).copied().unwrap_or(0.0);
            if *want > held + QTY_EPSILON {
                return Err(StockError::InsufficientComponent {
                    nuclide: *nuc,
                    requested: *want,
                    available: held,
                });
            }
        }

        // requests within epsilon of a component are clamped to what is held
        let mut removed = 0.0;
        for (nuc, want) in &drawn {
            if let Some(held) = masses.get_mut(nuc) {
                let taken = want.min(*held);
                *held -= taken;
                removed += taken;
            }
        }

        self.quantity = (self.quantity - removed).max(0.0);
        self.composition = Composition::from_mass(masses);
        if self.composition.is_empty() {
            self.quantity = 0.0;
        }
        Ok(Material::new_at(removed, comp.clone(), self.prev_decay_time))
    }

    /// Remove every atom of one nuclide
    pub fn extract_nuclide(&mut self, nuc: NucId) -> Material {
        let mass = self.mass(nuc);
        self.extract_comp(mass, &Composition::pure(nuc))
            .unwrap_or_else(|_| Material::new_at(0.0, Composition::pure(nuc), self.prev_decay_time))
    }

    /// Replace the composition without changing the quantity
    pub fn transmute(&mut self, comp: Composition) {
        self.composition = comp;
    }

    /// Add (positive) or remove (negative) mass keeping the composition
    pub fn adjust_mass(&mut self, delta: f64) {
        self.quantity = (self.quantity + delta).max(0.0);
    }

    /// Decay the lot from its last decay time to `time`
    pub fn decay(&mut self, time: u32, dt_seconds: f64) {
        if time <= self.prev_decay_time {
            return;
        }
        let elapsed = (time - self.prev_decay_time) as f64 * dt_seconds;
        self.prev_decay_time = time;
        if self.quantity <= 0.0 {
            return;
        }

        let engine = DecayEngine::new(NuclideTable::global());
        let mut moles = self.nuclide_moles();
        engine.decay_moles(&mut moles, elapsed);
        self.quantity = engine.mass_of(&moles);
        self.composition = Composition::from_atom(moles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONTH: f64 = 2_629_846.0;
    const COMPOSITION_TOL: f64 = crate::material::COMPOSITION_TOLERANCE;

    fn tritium(qty: f64) -> Material {
        Material::new(qty, Composition::pure(NucId::TRITIUM))
    }

    fn decayed_tritium(qty: f64) -> Material {
        let mut m = BTreeMap::new();
        m.insert(NucId::TRITIUM, 0.9);
        m.insert(NucId::HE3, 0.1);
        Material::new(qty, Composition::from_atom(m))
    }

    #[test]
    fn test_extract_qty_keeps_composition() {
        let mut mat = decayed_tritium(2.0);
        let part = mat.extract_qty(0.5).unwrap();
        assert!((part.quantity() - 0.5).abs() < 1e-12);
        assert!((mat.quantity() - 1.5).abs() < 1e-12);
        assert_eq!(part.composition(), mat.composition());
    }

    #[test]
    fn test_extract_qty_too_much() {
        let mut mat = tritium(1.0);
        let err = mat.extract_qty(1.5).unwrap_err();
        assert!(matches!(err, StockError::InsufficientQuantity { .. }));
        assert_eq!(mat.quantity(), 1.0);
    }

    #[test]
    fn test_extract_qty_within_epsilon_is_clamped() {
        let mut mat = tritium(1.0);
        let part = mat.extract_qty(1.0 + 1e-9).unwrap();
        assert_eq!(part.quantity(), 1.0);
        assert_eq!(mat.quantity(), 0.0);
    }

    #[test]
    fn test_extract_helium_component() {
        let mut mat = decayed_tritium(1.0);
        let he3 = mat.extract_nuclide(NucId::HE3);
        assert!((mat.quantity() + he3.quantity() - 1.0).abs() < 1e-12);
        assert!(mat.is_pure(NucId::TRITIUM, COMPOSITION_TOL));
        // atom fraction 0.1 of nearly equal masses
        assert!((mat.quantity() - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_extract_missing_component() {
        let mut mat = tritium(1.0);
        let err = mat.extract_comp(0.1, &Composition::pure(NucId::LI6)).unwrap_err();
        assert!(matches!(err, StockError::InsufficientComponent { nuclide, .. } if nuclide == NucId::LI6));
        assert_eq!(mat.quantity(), 1.0);
    }

    #[test]
    fn test_extract_absent_nuclide_yields_zero() {
        let mut mat = tritium(1.0);
        let he3 = mat.extract_nuclide(NucId::HE3);
        assert_eq!(he3.quantity(), 0.0);
        assert_eq!(mat.quantity(), 1.0);
    }

    #[test]
    fn test_absorb_mass_weighted() {
        let mut a = tritium(1.0);
        let b = Material::new(3.0, Composition::pure(NucId::HE4));
        a.absorb(b, MONTH);
        assert_eq!(a.quantity(), 4.0);
        assert!((a.mass(NucId::HE4) - 3.0).abs() < 1e-12);
        assert!((a.mass(NucId::TRITIUM) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_absorb_into_zero() {
        let mut a = Material::zero();
        a.absorb(tritium(2.0), MONTH);
        assert_eq!(a.quantity(), 2.0);
        assert!(a.is_pure(NucId::TRITIUM, COMPOSITION_TOL));
    }

    #[test]
    fn test_extract_comp_within_epsilon_conserves_mass() {
        let mut mat = tritium(1.0);
        let taken = mat
            .extract_comp(1.0 + 5e-8, &Composition::pure(NucId::TRITIUM))
            .unwrap();
        assert!((mat.quantity() + taken.quantity() - 1.0).abs() < 1e-12);
        assert!((taken.quantity() - 1.0).abs() < 1e-12);
        assert!(mat.quantity() < 1e-12);
    }

    #[test]
    fn test_absorb_decays_older_lot_first() {
        let mut held = Material::new_at(1.0, Composition::pure(NucId::HE4), 0);
        held.decay(11, MONTH);
        held.absorb(tritium(1.0), MONTH);
        assert_eq!(held.prev_decay_time(), 11);
        held.decay(12, MONTH);

        let mut alone = tritium(1.0);
        alone.decay(12, MONTH);
        assert!((held.mass(NucId::TRITIUM) - alone.mass(NucId::TRITIUM)).abs() < 1e-9);
        assert!((held.mass(NucId::HE4) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_absorb_catches_up_the_held_lot() {
        let mut held = tritium(1.0);
        held.absorb(Material::new_at(1.0, Composition::pure(NucId::TRITIUM), 6), MONTH);
        assert_eq!(held.prev_decay_time(), 6);

        let mut aged = tritium(1.0);
        aged.decay(6, MONTH);
        let expected = aged.mass(NucId::TRITIUM) + 1.0;
        assert!((held.mass(NucId::TRITIUM) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_decay_produces_helium() {
        let mut mat = tritium(6.0);
        mat.decay(1, MONTH);
        let he3 = mat.mass(NucId::HE3);
        let expected = 6.0 * (1.0 - (2.0_f64).powf(-2.57208504984e-9 * MONTH));
        assert!((he3 - expected).abs() < 1e-6);
        assert_eq!(mat.prev_decay_time(), 1);
    }

    #[test]
    fn test_decay_only_applies_elapsed_interval() {
        let mut once = tritium(1.0);
        once.decay(2, MONTH);

        let mut twice = tritium(1.0);
        twice.decay(1, MONTH);
        twice.decay(2, MONTH);
        twice.decay(2, MONTH);

        assert!((once.mass(NucId::TRITIUM) - twice.mass(NucId::TRITIUM)).abs() < 1e-12);
    }

    #[test]
    fn test_from_moles() {
        let mut moles = BTreeMap::new();
        moles.insert(NucId::TRITIUM, 1000.0);
        let mat = Material::from_moles(moles, 3);
        assert!((mat.quantity() - 3.01604928).abs() < 1e-9);
        assert!((mat.moles(NucId::TRITIUM) - 1000.0).abs() < 1e-9);
        assert_eq!(mat.prev_decay_time(), 3);
    }
}

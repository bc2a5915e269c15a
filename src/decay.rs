//! Radioactive decay of nuclide inventories.
//!
//! Decay is applied to mole quantities with the half-life form
//! `n' = n * 2^(-dt / t_half)`. Decayed atoms move to the daughter, so the
//! carrier mass changes by exactly the parent/daughter atomic-mass
//! difference once the lot mass is recomputed from moles.

use crate::nuclide::{NucId, NuclideTable};
use std::collections::BTreeMap;

pub struct DecayEngine<'a> {
    table: &'a NuclideTable,
}

impl DecayEngine<'static> {
    /// Engine backed by the process-wide nuclide table
    pub fn global() -> Self {
        DecayEngine {
            table: NuclideTable::global(),
        }
    }
}

impl<'a> DecayEngine<'a> {
    pub fn new(table: &'a NuclideTable) -> Self {
        DecayEngine { table }
    }

    /// Fraction of a nuclide surviving `elapsed` seconds
    pub fn surviving_fraction(half_life: f64, elapsed: f64) -> f64 {
        (2.0_f64).powf(-elapsed / half_life)
    }

    /// Decay a mole inventory in place over `elapsed` seconds
    pub fn decay_moles(&self, moles: &mut BTreeMap<NucId, f64>, elapsed: f64) {
        if elapsed <= 0.0 {
            return;
        }

        for data in self.table.unstable() {
            let (Some(half_life), Some(daughter)) = (data.half_life, data.daughter) else {
                continue;
            };
            let Some(parent) = moles.get_mut(&data.id) else {
                continue;
            };
            if *parent <= 0.0 {
                continue;
            }

            let remaining = *parent * Self::surviving_fraction(half_life, elapsed);
            let decayed = *parent - remaining;
            *parent = remaining;
            *moles.entry(daughter).or_insert(0.0) += decayed;
        }
    }

    /// Total mass in kg of a mole inventory
    pub fn mass_of(&self, moles: &BTreeMap<NucId, f64>) -> f64 {
        moles
            .iter()
            .map(|(nuc, n)| n * self.table.atomic_mass(*nuc) / 1000.0)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONTH: f64 = 2_629_846.0;

    fn tritium_moles(n: f64) -> BTreeMap<NucId, f64> {
        let mut m = BTreeMap::new();
        m.insert(NucId::TRITIUM, n);
        m
    }

    #[test]
    fn test_one_month_of_tritium_decay() {
        let engine = DecayEngine::global();
        let mut moles = tritium_moles(1000.0);
        engine.decay_moles(&mut moles, MONTH);

        let expected = 1000.0 * (2.0_f64).powf(-2.57208504984e-9 * MONTH);
        assert!((moles[&NucId::TRITIUM] - expected).abs() < 1e-6);
        assert!((moles[&NucId::TRITIUM] + moles[&NucId::HE3] - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_half_life_halves_inventory() {
        let engine = DecayEngine::global();
        let half_life = NuclideTable::global()
            .get(NucId::TRITIUM)
            .and_then(|d| d.half_life)
            .unwrap();
        let mut moles = tritium_moles(8.0);
        engine.decay_moles(&mut moles, half_life);
        assert!((moles[&NucId::TRITIUM] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_stable_nuclides_untouched() {
        let engine = DecayEngine::global();
        let mut moles = BTreeMap::new();
        moles.insert(NucId::LI6, 3.0);
        moles.insert(NucId::HE4, 1.0);
        let before = moles.clone();
        engine.decay_moles(&mut moles, 100.0 * MONTH);
        assert_eq!(before, moles);
    }

    #[test]
    fn test_decay_is_monotonic_in_time() {
        let engine = DecayEngine::global();
        let mut previous = f64::MAX;
        let mut previous_he3 = 0.0;
        for step in 1..=12 {
            let mut moles = tritium_moles(10.0);
            engine.decay_moles(&mut moles, step as f64 * MONTH);
            assert!(moles[&NucId::TRITIUM] < previous);
            assert!(moles[&NucId::HE3] > previous_he3);
            previous = moles[&NucId::TRITIUM];
            previous_he3 = moles[&NucId::HE3];
        }
    }

    #[test]
    fn test_mass_shrinks_by_daughter_mass_difference() {
        let engine = DecayEngine::global();
        let mut moles = tritium_moles(1000.0);
        let before = engine.mass_of(&moles);
        engine.decay_moles(&mut moles, MONTH);
        let after = engine.mass_of(&moles);
        assert!(after < before);
        assert!(before - after < 1e-6);
    }

    #[test]
    fn test_zero_elapsed_is_noop() {
        let engine = DecayEngine::global();
        let mut moles = tritium_moles(1.0);
        engine.decay_moles(&mut moles, 0.0);
        assert_eq!(moles.len(), 1);
    }
}

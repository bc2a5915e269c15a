//! Isotopic compositions.
//!
//! A `Composition` is a normalised nuclide -> atom-fraction map. Mass
//! fractions are derived on demand through the nuclide table.

use crate::nuclide::{NucId, NuclideTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tolerance used when comparing normalised fraction maps
pub const COMPOSITION_TOLERANCE: f64 = 1e-7;

/// Whether a recipe lists atom or mass fractions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Basis {
    #[default]
    Atom,
    Mass,
}

/// Normalised atom-fraction map
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Composition {
    atoms: BTreeMap<NucId, f64>,
}

impl Composition {
    /// Composition with no nuclides, used for zero-quantity material
    pub fn empty() -> Self {
        Self::default()
    }

    /// A composition containing a single nuclide
    pub fn pure(nuc: NucId) -> Self {
        let mut atoms = BTreeMap::new();
        atoms.insert(nuc, 1.0);
        Composition { atoms }
    }

    /// Build from (possibly unnormalised) atom fractions or mole counts
    pub fn from_atom(fractions: BTreeMap<NucId, f64>) -> Self {
        Composition {
            atoms: normalize(fractions),
        }
    }

    /// Build from (possibly unnormalised) mass fractions or masses
    pub fn from_mass(fractions: BTreeMap<NucId, f64>) -> Self {
        let table = NuclideTable::global();
        let moles = fractions
            .into_iter()
            .map(|(nuc, mass)| (nuc, mass / table.atomic_mass(nuc)))
            .collect();
        Self::from_atom(moles)
    }

    pub fn from_basis(basis: Basis, fractions: BTreeMap<NucId, f64>) -> Self {
        match basis {
            Basis::Atom => Self::from_atom(fractions),
            Basis::Mass => Self::from_mass(fractions),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atom_fractions(&self) -> &BTreeMap<NucId, f64> {
        &self.atoms
    }

    pub fn atom_fraction(&self, nuc: NucId) -> f64 {
        self.atoms.get(&nuc).copied().unwrap_or(0.0)
    }

    /// Mean molar mass in g/mol
    pub fn molar_mass(&self) -> f64 {
        let table = NuclideTable::global();
        self.atoms
            .iter()
            .map(|(nuc, frac)| frac * table.atomic_mass(*nuc))
            .sum()
    }

    pub fn mass_fractions(&self) -> BTreeMap<NucId, f64> {
        let table = NuclideTable::global();
        let molar_mass = self.molar_mass();
        if molar_mass <= 0.0 {
            return BTreeMap::new();
        }
        self.atoms
            .iter()
            .map(|(nuc, frac)| (*nuc, frac * table.atomic_mass(*nuc) / molar_mass))
            .collect()
    }

    pub fn mass_fraction(&self, nuc: NucId) -> f64 {
        self.mass_fractions().get(&nuc).copied().unwrap_or(0.0)
    }

    /// Compare normalised atom fractions nuclide by nuclide
    pub fn almost_eq(&self, other: &Composition, tolerance: f64) -> bool {
        self.atoms
            .keys()
            .chain(other.atoms.keys())
            .all(|nuc| (self.atom_fraction(*nuc) - other.atom_fraction(*nuc)).abs() <= tolerance)
    }
}

fn normalize(fractions: BTreeMap<NucId, f64>) -> BTreeMap<NucId, f64> {
    let positive: BTreeMap<NucId, f64> = fractions.into_iter().filter(|(_, v)| *v > 0.0).collect();
    let total: f64 = positive.values().sum();
    if total <= 0.0 {
        return BTreeMap::new();
    }
    positive.into_iter().map(|(k, v)| (k, v / total)).collect()
}

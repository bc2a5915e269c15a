//! Tritium breeding in a lithium blanket.
//!
//! Each bred tritium atom consumes one lithium atom and releases one helium-4
//! atom:
//!
//! ```text
//! Li-6 + n -> T + He-4
//! Li-7 + n -> T + He-4 + n
//! ```
//!
//! The absorbed neutron mass shows up as a mass difference between the old
//! and new blanket inventories, which is added to (or removed from) the lot
//! before it is transmuted to the depleted composition.

use crate::material::{Composition, Material, MaterialStock};
use crate::nuclide::{NucId, NuclideTable};
use log::debug;
use std::collections::BTreeMap;

/// Lithium remaining below this many moles counts as exhausted
const LITHIUM_TOLERANCE_MOLES: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BreedingError {
    #[error("blanket lacks {isotope}: need {required:.6} mol, have {available:.6} mol")]
    InsufficientLithium {
        isotope: NucId,
        required: f64,
        available: f64,
    },
}

/// Outcome of a successful depletion step
#[derive(Debug, Clone, PartialEq)]
pub struct BlanketDepletion {
    pub bred_moles: f64,
    pub li6_consumed: f64,
    pub li7_consumed: f64,
    /// Change of blanket mass in kg
    pub mass_change: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreedingModel {
    /// Fraction of bred tritium produced from Li-7
    pub li7_contribution: f64,
}

impl BreedingModel {
    pub fn new(li7_contribution: f64) -> Self {
        BreedingModel { li7_contribution }
    }

    /// Moles of tritium bred when `fuel_usage_kg` is burned at ratio `tbr`
    pub fn bred_moles(fuel_usage_kg: f64, tbr: f64) -> f64 {
        fuel_usage_kg * 1000.0 / NuclideTable::global().atomic_mass(NucId::TRITIUM) * tbr
    }

    /// Convert lithium in `blanket` to tritium and helium-4.
    ///
    /// The blanket is left unchanged when either lithium isotope would go
    /// negative.
    pub fn deplete_blanket(
        &self,
        blanket: &mut Material,
        bred_moles: f64,
    ) -> Result<BlanketDepletion, BreedingError> {
        let li7_consumed = self.li7_contribution * bred_moles;
        let li6_consumed = (1.0 - self.li7_contribution) * bred_moles;

        let li6 = blanket.moles(NucId::LI6);
        let li7 = blanket.moles(NucId::LI7);
        if li6 - li6_consumed < -LITHIUM_TOLERANCE_MOLES {
            return Err(BreedingError::InsufficientLithium {
                isotope: NucId::LI6,
                required: li6_consumed,
                available: li6,
            });
        }
        if li7 - li7_consumed < -LITHIUM_TOLERANCE_MOLES {
            return Err(BreedingError::InsufficientLithium {
                isotope: NucId::LI7,
                required: li7_consumed,
                available: li7,
            });
        }

        let mut moles = blanket.nuclide_moles();
        moles.insert(NucId::LI6, (li6 - li6_consumed).max(0.0));
        moles.insert(NucId::LI7, (li7 - li7_consumed).max(0.0));
        *moles.entry(NucId::TRITIUM).or_insert(0.0) += bred_moles;
        *moles.entry(NucId::HE4).or_insert(0.0) += bred_moles;

        let mass_change = inventory_mass(&moles) - blanket.quantity();
        blanket.adjust_mass(mass_change);
        blanket.transmute(Composition::from_atom(moles));

        debug!(
            "Depleted blanket: {:.4} mol Li-6, {:.4} mol Li-7, mass change {:.6} kg",
            li6_consumed, li7_consumed, mass_change
        );

        Ok(BlanketDepletion {
            bred_moles,
            li6_consumed,
            li7_consumed,
            mass_change,
        })
    }

    /// Breed the tritium for one timestep and pull it out of the blanket
    pub fn breed_tritium(
        &self,
        blanket: &mut MaterialStock,
        fuel_usage_kg: f64,
        tbr: f64,
    ) -> Result<Material, BreedingError> {
        let bred = Self::bred_moles(fuel_usage_kg, tbr);
        blanket.with_lot(|lot| {
            if lot.is_empty() {
                return Err(BreedingError::InsufficientLithium {
                    isotope: NucId::LI6,
                    required: (1.0 - self.li7_contribution) * bred,
                    available: 0.0,
                });
            }
            self.deplete_blanket(lot, bred)?;
            Ok(lot.extract_nuclide(NucId::TRITIUM))
        })
    }
}

fn inventory_mass(moles: &BTreeMap<NucId, f64>) -> f64 {
    let table = NuclideTable::global();
    moles
        .iter()
        .map(|(nuc, n)| n * table.atomic_mass(*nuc) / 1000.0)
        .sum()
}

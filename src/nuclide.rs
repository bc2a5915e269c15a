//! Nuclide identifiers and the immutable nuclear data table.
//!
//! Ids follow the `ZZZAAAMMMM` convention (`10030000` is tritium). The table
//! is built once per process and handed out by reference, so the decay and
//! breeding code never carries its own literals.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Nuclide identifier in `ZZZAAAMMMM` form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NucId(pub u32);

impl NucId {
    pub const TRITIUM: NucId = NucId(10030000);
    pub const HE3: NucId = NucId(20030000);
    pub const HE4: NucId = NucId(20040000);
    pub const LI6: NucId = NucId(30060000);
    pub const LI7: NucId = NucId(30070000);

    /// Atomic number
    pub fn z(&self) -> u32 {
        self.0 / 10_000_000
    }

    /// Mass number
    pub fn a(&self) -> u32 {
        (self.0 / 10_000) % 1000
    }
}

impl fmt::Display for NucId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match NuclideTable::global().get(*self) {
            Some(data) => write!(f, "{}", data.symbol),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Nuclear data for one nuclide
#[derive(Debug, Clone, PartialEq)]
pub struct NuclideData {
    pub id: NucId,
    pub symbol: &'static str,
    /// Atomic mass in g/mol
    pub atomic_mass: f64,
    /// Half-life in seconds, `None` for nuclides treated as stable
    pub half_life: Option<f64>,
    /// Decay product, only meaningful when `half_life` is set
    pub daughter: Option<NucId>,
}

impl NuclideData {
    pub fn is_stable(&self) -> bool {
        self.half_life.is_none()
    }
}

/// Lookup table of every nuclide the fuel cycle tracks
#[derive(Debug)]
pub struct NuclideTable {
    entries: BTreeMap<NucId, NuclideData>,
}

/// Tritium half-life, 12.32 years of 365.25 days
const TRITIUM_HALF_LIFE_S: f64 = 12.32 * 365.25 * 86_400.0;

static TABLE: OnceLock<NuclideTable> = OnceLock::new();

impl NuclideTable {
    /// The process-wide table
    pub fn global() -> &'static NuclideTable {
        TABLE.get_or_init(NuclideTable::fuel_cycle)
    }

    fn fuel_cycle() -> Self {
        let entries = [
            NuclideData {
                id: NucId::TRITIUM,
                symbol: "H-3",
                atomic_mass: 3.01604928,
                half_life: Some(TRITIUM_HALF_LIFE_S),
                daughter: Some(NucId::HE3),
            },
            NuclideData {
                id: NucId::HE3,
                symbol: "He-3",
                atomic_mass: 3.01602932,
                half_life: None,
                daughter: None,
            },
            NuclideData {
                id: NucId::HE4,
                symbol: "He-4",
                atomic_mass: 4.00260325,
                half_life: None,
                daughter: None,
            },
            NuclideData {
                id: NucId::LI6,
                symbol: "Li-6",
                atomic_mass: 6.01512289,
                half_life: None,
                daughter: None,
            },
            NuclideData {
                id: NucId::LI7,
                symbol: "Li-7",
                atomic_mass: 7.01600344,
                half_life: None,
                daughter: None,
            },
        ];

        NuclideTable {
            entries: entries.into_iter().map(|d| (d.id, d)).collect(),
        }
    }

    pub fn get(&self, id: NucId) -> Option<&NuclideData> {
        self.entries.get(&id)
    }

    /// Atomic mass in g/mol; ids missing from the table fall back to
    /// their mass number.
    pub fn atomic_mass(&self, id: NucId) -> f64 {
        self.get(id)
            .map(|d| d.atomic_mass)
            .unwrap_or_else(|| id.a() as f64)
    }

    /// Iterate over the unstable nuclides
    pub fn unstable(&self) -> impl Iterator<Item = &NuclideData> {
        self.entries.values().filter(|d| !d.is_stable())
    }

    /// Resolve a nuclide name or numeric id.
    ///
    /// Accepts `T`, `tritium`, `H3`, `H-3`, `He3`, `Li-7` (case-insensitive)
    /// and raw ids of tabulated nuclides such as `30060000`.
    pub fn resolve(&self, name: &str) -> Option<NucId> {
        let trimmed = name.trim();
        if let Ok(raw) = trimmed.parse::<u32>() {
            let id = NucId(raw);
            return self.get(id).map(|_| id);
        }

        let normalized: String = trimmed
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "t" | "tritium" | "h3" => Some(NucId::TRITIUM),
            _ => self
                .entries
                .values()
                .find(|d| d.symbol.replace('-', "").to_ascii_lowercase() == normalized)
                .map(|d| d.id),
        }
    }
}

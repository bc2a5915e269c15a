//! Material lots, compositions and the buffers that hold them.

pub mod composition;
pub mod lot;
pub mod stock;

pub use composition::{Basis, Composition, COMPOSITION_TOLERANCE};
pub use lot::Material;
pub use stock::{Holding, MaterialStock, StockMode};

use crate::nuclide::NucId;

/// Quantities closer than this (kg) are treated as equal on pop and extract
pub const QTY_EPSILON: f64 = 1e-7;

/// Errors raised by lot and stock operations. The source is left untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StockError {
    #[error("requested {requested} kg but only {available} kg is held")]
    InsufficientQuantity { requested: f64, available: f64 },

    #[error("requested {requested} kg of {nuclide} but only {available} kg is present")]
    InsufficientComponent {
        nuclide: NucId,
        requested: f64,
        available: f64,
    },

    #[error("quantity must be non-negative, got {0}")]
    NegativeQuantity(f64),

    #[error("no stock named '{0}'")]
    UnknownStock(String),
}

//! Upper bound over a set of watched stocks.

use crate::material::MaterialStock;
use serde::{Deserialize, Serialize};

/// Look up a facility's stocks by name
pub trait StockSet {
    fn stock(&self, name: &str) -> Option<&MaterialStock>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryTracker {
    pub limit: f64,
    pub watched: Vec<String>,
}

impl InventoryTracker {
    pub fn new(limit: f64, watched: &[&str]) -> Self {
        InventoryTracker {
            limit,
            watched: watched.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Sum of the watched stock quantities; unknown names count as empty
    pub fn held(&self, stocks: &dyn StockSet) -> f64 {
        self.watched
            .iter()
            .filter_map(|name| stocks.stock(name))
            .map(MaterialStock::quantity)
            .sum()
    }

    /// Room left under the limit, never negative
    pub fn available_capacity(&self, stocks: &dyn StockSet) -> f64 {
        (self.limit - self.held(stocks)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Composition, Material};
    use crate::nuclide::NucId;
    use std::collections::HashMap;

    struct Stocks(HashMap<String, MaterialStock>);

    impl StockSet for Stocks {
        fn stock(&self, name: &str) -> Option<&MaterialStock> {
            self.0.get(name)
        }
    }

    fn stocks(entries: &[(&str, f64)]) -> Stocks {
        let mut map = HashMap::new();
        for (name, qty) in entries {
            let mut stock = MaterialStock::bulk(*name);
            stock.push(Material::new(*qty, Composition::pure(NucId::TRITIUM)));
            map.insert(name.to_string(), stock);
        }
        Stocks(map)
    }

    #[test]
    fn test_available_capacity() {
        let tracker = InventoryTracker::new(10.0, &["core", "reserve"]);
        let set = stocks(&[("core", 2.0), ("reserve", 3.0), ("excess", 100.0)]);
        assert!((tracker.available_capacity(&set) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_capacity_never_negative() {
        let tracker = InventoryTracker::new(1.0, &["core"]);
        let set = stocks(&[("core", 4.0)]);
        assert_eq!(tracker.available_capacity(&set), 0.0);
    }

    #[test]
    fn test_unknown_stock_counts_as_empty() {
        let tracker = InventoryTracker::new(1.0, &["missing"]);
        let set = stocks(&[]);
        assert_eq!(tracker.available_capacity(&set), 1.0);
    }
}

use serde::Serialize;

use crate::data::{CounterStore, DataCache};

/// Kilograms of carbon footprint avoided per refill.
pub const CARBON_FOOTPRINT_PER_REFILL: f64 = 4.4;
/// Liters of water conserved per refill.
pub const WATER_CONSERVED_PER_REFILL: u64 = 92_708;

/// Figures shown on the reuse page, derived from the refill counter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReuseStats {
    pub water_refills: u64,
    pub carbon_footprint_reduced_kgs: f64,
    pub water_conserved_liters: u64,
}

impl ReuseStats {
    pub fn from_refills(water_refills: u64) -> Self {
        Self {
            water_refills,
            carbon_footprint_reduced_kgs: water_refills as f64 * CARBON_FOOTPRINT_PER_REFILL,
            water_conserved_liters: water_refills * WATER_CONSERVED_PER_REFILL,
        }
    }

    pub async fn load<S: CounterStore>(cache: &DataCache<S>) -> Self {
        Self::from_refills(cache.water_refills().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_from_refill_count() {
        let stats = ReuseStats::from_refills(10);
        assert_eq!(stats.carbon_footprint_reduced_kgs, 44.0);
        assert_eq!(stats.water_conserved_liters, 927_080);
    }
}

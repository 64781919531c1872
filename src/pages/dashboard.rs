use serde::Serialize;

use crate::data::{CounterStore, DataCache};
use crate::models::CounterSet;

use super::recycle::PLASTIC_RECYCLED_PER_DISPOSAL;
use super::reduce::BASE_TREES_PER_USER;
use super::reuse::WATER_CONSERVED_PER_REFILL;

/// The summary page: all four counters plus their headline derived figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub user_visits: u64,
    pub trees_planted: u64,
    pub correct_disposals: u64,
    pub plastic_recycled_kgs: f64,
    pub water_refills: u64,
    pub water_conserved_liters: u64,
    pub cycle_initiatives: u64,
    pub solar_lamps: u64,
}

impl DashboardStats {
    pub fn from_counters(counters: &CounterSet) -> Self {
        Self {
            user_visits: counters.user_count,
            trees_planted: counters.user_count * BASE_TREES_PER_USER,
            correct_disposals: counters.dustbin_data,
            plastic_recycled_kgs: counters.dustbin_data as f64 * PLASTIC_RECYCLED_PER_DISPOSAL,
            water_refills: counters.water_refills,
            water_conserved_liters: counters.water_refills * WATER_CONSERVED_PER_REFILL,
            cycle_initiatives: counters.cycle_data,
            solar_lamps: counters.cycle_data,
        }
    }

    /// Reads all four counters in one freshness-checked pass.
    pub async fn load<S: CounterStore>(cache: &DataCache<S>) -> Self {
        Self::from_counters(&cache.counters().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_all_four_counters() {
        let counters = CounterSet {
            water_refills: 3,
            user_count: 10,
            cycle_data: 2,
            dustbin_data: 4,
            last_updated: None,
        };
        let stats = DashboardStats::from_counters(&counters);
        assert_eq!(stats.trees_planted, 10);
        assert_eq!(stats.plastic_recycled_kgs, 2.0);
        assert_eq!(stats.water_conserved_liters, 278_124);
        assert_eq!(stats.solar_lamps, 2);
    }
}

use serde::Serialize;

use crate::data::{CounterStore, DataCache};

/// Trees planted per site visit.
pub const BASE_TREES_PER_USER: u64 = 1;
/// Kilograms of carbon absorbed per visit.
pub const BASE_CARBON_KGS_PER_USER: u64 = 20;

/// Figures shown on the reduce page, derived from the visit counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReduceStats {
    pub user_visits: u64,
    pub trees_planted: u64,
    pub carbon_absorbed_kgs: u64,
}

impl ReduceStats {
    pub fn from_visits(user_visits: u64) -> Self {
        Self {
            user_visits,
            trees_planted: user_visits * BASE_TREES_PER_USER,
            carbon_absorbed_kgs: user_visits * BASE_CARBON_KGS_PER_USER,
        }
    }

    pub async fn load<S: CounterStore>(cache: &DataCache<S>) -> Self {
        Self::from_visits(cache.user_count().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_from_visit_count() {
        let stats = ReduceStats::from_visits(7);
        assert_eq!(stats.trees_planted, 7);
        assert_eq!(stats.carbon_absorbed_kgs, 140);
    }
}

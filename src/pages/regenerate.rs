use serde::Serialize;

use crate::data::{CounterStore, DataCache};

/// Kilograms of carbon emission prevented per solar lamp.
pub const CARBON_EMISSION_PREVENTED_PER_LAMP: u64 = 125;

/// Figures shown on the regenerate page, derived from the cycling counter.
/// One cycling unit funds one solar lamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateStats {
    pub cycle_data: u64,
    pub solar_lamps: u64,
    pub carbon_emission_prevented_kgs: u64,
}

impl RegenerateStats {
    pub fn from_cycle_data(cycle_data: u64) -> Self {
        Self {
            cycle_data,
            solar_lamps: cycle_data,
            carbon_emission_prevented_kgs: cycle_data * CARBON_EMISSION_PREVENTED_PER_LAMP,
        }
    }

    pub async fn load<S: CounterStore>(cache: &DataCache<S>) -> Self {
        Self::from_cycle_data(cache.cycle_data().await)
    }
}

use serde::Serialize;

use crate::data::{CounterStore, DataCache};

/// Kilograms of plastic recycled per correct disposal.
pub const PLASTIC_RECYCLED_PER_DISPOSAL: f64 = 0.5;
/// Chip packet equivalents per correct disposal.
pub const CHIP_PACKETS_LANDFILLED_PER_DISPOSAL: u64 = 250;

/// Figures shown on the recycle page, derived from the disposal counter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecycleStats {
    pub correct_disposals: u64,
    pub plastic_recycled_kgs: f64,
    pub chip_packets_landfilled: u64,
}

impl RecycleStats {
    pub fn from_disposals(correct_disposals: u64) -> Self {
        Self {
            correct_disposals,
            plastic_recycled_kgs: correct_disposals as f64 * PLASTIC_RECYCLED_PER_DISPOSAL,
            chip_packets_landfilled: correct_disposals * CHIP_PACKETS_LANDFILLED_PER_DISPOSAL,
        }
    }

    pub async fn load<S: CounterStore>(cache: &DataCache<S>) -> Self {
        Self::from_disposals(cache.dustbin_data().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_from_disposal_count() {
        let stats = RecycleStats::from_disposals(8);
        assert_eq!(stats.plastic_recycled_kgs, 4.0);
        assert_eq!(stats.chip_packets_landfilled, 2000);
    }
}

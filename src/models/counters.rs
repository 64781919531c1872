use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four kiosk counters. Replaced wholesale on every successful refresh;
/// readers never see a partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSet {
    pub water_refills: u64,
    pub user_count: u64,
    pub cycle_data: u64,
    pub dustbin_data: u64,
    /// `None` until the first successful refresh.
    pub last_updated: Option<DateTime<Utc>>,
}

impl CounterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the set is older than `ttl` as of `now`. A set that has never
    /// been refreshed is always stale.
    pub fn is_stale(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let Some(at) = self.last_updated else {
            return true;
        };
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(at) > ttl,
            // TTL too large for chrono; such a set never expires
            Err(_) => false,
        }
    }
}

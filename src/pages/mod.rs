//! Per-page view models.
//!
//! Each kiosk page derives its display figures from one cached counter;
//! pages read through the [`DataCache`](crate::data::DataCache) on their
//! own and do not go through the rotator.

pub mod dashboard;
pub mod recycle;
pub mod reduce;
pub mod regenerate;
pub mod reuse;

pub use dashboard::DashboardStats;
pub use recycle::RecycleStats;
pub use reduce::ReduceStats;
pub use regenerate::RegenerateStats;
pub use reuse::ReuseStats;

use std::path::PathBuf;

use anyhow::Result;
use log::info;
use tokio::signal;
use tokio::sync::broadcast;

use ecokiosk::data::store::{
    CounterRow, CYCLE_SOURCE, DUSTBIN_SOURCE, WATER_SOURCE, WEBSITE_SOURCE,
};
use ecokiosk::data::{CounterStore, DataCache, MemoryStore};
use ecokiosk::pages::{DashboardStats, RecycleStats, ReduceStats, RegenerateStats, ReuseStats};
use ecokiosk::rotation::{PageRotator, RotationEvent};
use ecokiosk::SettingsStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("ecokiosk starting up...");

    let settings_path = std::env::var_os("ECOKIOSK_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ecokiosk.json"));
    let settings = SettingsStore::new(settings_path)?;
    let rotation_settings = settings.rotation();
    let cache_settings = settings.cache();

    let store = MemoryStore::new();
    seed_demo_counters(&store);

    let cache = DataCache::new(store.clone(), cache_settings.ttl());
    let startup = cache.preload().await;
    info!(
        "counters preloaded: {} visits, {} refills, {} disposals, {} cycle units",
        startup.user_count, startup.water_refills, startup.dustbin_data, startup.cycle_data
    );

    let _subscription = cache.subscribe(|set| {
        info!(
            "counters refreshed: {} visits, {} refills, {} disposals, {} cycle units",
            set.user_count, set.water_refills, set.dustbin_data, set.cycle_data
        );
    });

    let rotator = PageRotator::new(
        rotation_settings.route_table(),
        rotation_settings.rotation_config(),
    );
    let mut events = rotator.events();
    rotator.start().await;
    info!(
        "rotation started: {} pages, {} ms ticks",
        rotator.routes().len(),
        rotation_settings.tick_interval_ms
    );

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => show_page(&cache, event).await,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    rotator.stop().await;
    cache.shutdown().await;
    info!("ecokiosk stopped");
    Ok(())
}

/// Log what the newly shown page would display.
async fn show_page<S: CounterStore>(cache: &DataCache<S>, event: RotationEvent) {
    match event {
        RotationEvent::PageChanged { path, .. } => match path.as_str() {
            "/reduce" | "/reduce-calc" => {
                let stats = ReduceStats::load(cache).await;
                info!(
                    "page {path}: {} visits, {} trees planted",
                    stats.user_visits, stats.trees_planted
                );
            }
            "/reuse" | "/reuse-calc" => {
                let stats = ReuseStats::load(cache).await;
                info!(
                    "page {path}: {} refills, {} L water conserved",
                    stats.water_refills, stats.water_conserved_liters
                );
            }
            "/recycle" | "/recycle-calc" => {
                let stats = RecycleStats::load(cache).await;
                info!(
                    "page {path}: {} correct disposals, {:.1} kg plastic recycled",
                    stats.correct_disposals, stats.plastic_recycled_kgs
                );
            }
            "/regenerate" | "/regenerate-calc" => {
                let stats = RegenerateStats::load(cache).await;
                info!(
                    "page {path}: {} solar lamps funded",
                    stats.solar_lamps
                );
            }
            "/dashboard" => {
                let stats = DashboardStats::load(cache).await;
                info!(
                    "page {path}: {} visits, {} refills, {} disposals, {} lamps",
                    stats.user_visits, stats.water_refills, stats.correct_disposals,
                    stats.solar_lamps
                );
            }
            _ => info!("page {path}"),
        },
        RotationEvent::ExtraStarted { path } => {
            info!("interstitial {path} started");
        }
        RotationEvent::ExtraFinished => {
            info!("interstitial finished, restarting rotation");
        }
    }
}

/// Plausible starting data so the kiosk has something to show without a
/// real backend attached.
fn seed_demo_counters(store: &MemoryStore) {
    store.put_rows(
        WATER_SOURCE,
        (1..=10).map(|id| CounterRow { id, data: 30 + id as u64 }).collect(),
    );
    store.put_rows(WEBSITE_SOURCE, vec![CounterRow { id: 2, data: 4821 }]);
    store.put_rows(
        CYCLE_SOURCE,
        (1..=10).map(|id| CounterRow { id, data: 12 }).collect(),
    );
    store.put_rows(
        DUSTBIN_SOURCE,
        (1..=10).map(|id| CounterRow { id, data: 25 }).collect(),
    );
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

use crate::rotation::{RotationConfig, RouteTable};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationSettings {
    pub page_duration_secs: u64,
    pub tick_interval_ms: u64,
    pub cycle_threshold: u32,
    pub extra_duration_multiplier: u64,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            page_duration_secs: 10,
            tick_interval_ms: 100,
            cycle_threshold: 3,
            extra_duration_multiplier: 3,
        }
    }
}

impl RotationSettings {
    pub fn rotation_config(&self) -> RotationConfig {
        RotationConfig {
            tick_interval_ms: self.tick_interval_ms,
            cycle_threshold: self.cycle_threshold,
        }
    }

    pub fn route_table(&self) -> RouteTable {
        RouteTable::kiosk_default(self.page_duration_secs, self.extra_duration_multiplier)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KioskSettings {
    pub rotation: RotationSettings,
    pub cache: CacheSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<KioskSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            KioskSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> KioskSettings {
        self.data.read().unwrap().clone()
    }

    pub fn rotation(&self) -> RotationSettings {
        self.data.read().unwrap().rotation.clone()
    }

    pub fn cache(&self) -> CacheSettings {
        self.data.read().unwrap().cache.clone()
    }

    pub fn update_rotation(&self, settings: RotationSettings) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.rotation = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    pub fn update_cache(&self, settings: CacheSettings) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.cache = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &KioskSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

impl SettingsStore {
    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: KioskSettings = serde_json::from_str(&contents)?;
        let mut guard = self.data.write().unwrap();
        *guard = data;
        Ok(())
    }
}

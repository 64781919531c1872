pub mod data;
pub mod models;
pub mod pages;
pub mod rotation;
pub mod settings;

pub use data::{CounterStore, DataCache, MemoryStore};
pub use models::CounterSet;
pub use rotation::{PageRotator, RotationConfig, RotationEvent, RotationSnapshot};
pub use settings::{KioskSettings, SettingsStore};

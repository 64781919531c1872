pub mod cache;
pub mod store;

pub use cache::{DataCache, Subscription};
pub use store::{CounterRow, CounterStore, IdFilter, MemoryStore, SourceChange};

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Backend source holding per-station water refill counts.
pub const WATER_SOURCE: &str = "water";
/// Backend source holding the site visit counter.
pub const WEBSITE_SOURCE: &str = "website";
/// Backend source holding cycling minute counts.
pub const CYCLE_SOURCE: &str = "cycle";
/// Backend source holding correct-disposal counts per bin.
pub const DUSTBIN_SOURCE: &str = "dustbin";

/// Row ids that participate in summed aggregates.
pub const SUMMED_IDS: [u32; 10] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
/// The single row carrying the visit counter in the website source.
pub const VISITS_ROW_ID: u32 = 2;

/// One row of a counter source. The schema is pinned to a single `data`
/// column; backends exposing other column names adapt inside their
/// [`CounterStore`] impl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterRow {
    pub id: u32,
    pub data: u64,
}

/// Row selection for a fetch: either a fixed id list or one exact id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdFilter {
    In(Vec<u32>),
    Eq(u32),
}

impl IdFilter {
    pub fn matches(&self, id: u32) -> bool {
        match self {
            IdFilter::In(ids) => ids.contains(&id),
            IdFilter::Eq(wanted) => *wanted == id,
        }
    }
}

/// Emitted whenever anything in `source` changed. Carries no payload;
/// consumers re-fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceChange {
    pub source: String,
}

/// The remote data store, reduced to the one capability the cache needs:
/// query rows of a named source by id, and watch for changes.
pub trait CounterStore: Send + Sync + 'static {
    /// One query against a named source, filtered by row id.
    fn fetch_rows(
        &self,
        source: &str,
        filter: IdFilter,
    ) -> impl Future<Output = Result<Vec<CounterRow>>> + Send;

    /// Live-update feed. Each receiver sees changes published after it
    /// subscribed.
    fn changes(&self) -> broadcast::Receiver<SourceChange>;
}

/// In-process [`CounterStore`] backed by plain tables, used by the daemon
/// binary and tests. Mutations publish a [`SourceChange`].
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

struct MemoryStoreInner {
    tables: RwLock<HashMap<String, Vec<CounterRow>>>,
    changes: broadcast::Sender<SourceChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(32);
        Self {
            inner: Arc::new(MemoryStoreInner {
                tables: RwLock::new(HashMap::new()),
                changes,
            }),
        }
    }

    /// Replace the rows of `source` and notify watchers.
    pub fn put_rows(&self, source: &str, rows: Vec<CounterRow>) {
        self.inner
            .tables
            .write()
            .unwrap()
            .insert(source.to_string(), rows);
        let _ = self.inner.changes.send(SourceChange {
            source: source.to_string(),
        });
    }

    /// Add `delta` to one row, creating it at zero if absent, and notify
    /// watchers.
    pub fn bump(&self, source: &str, id: u32, delta: u64) {
        {
            let mut tables = self.inner.tables.write().unwrap();
            let rows = tables.entry(source.to_string()).or_default();
            match rows.iter_mut().find(|row| row.id == id) {
                Some(row) => row.data += delta,
                None => rows.push(CounterRow { id, data: delta }),
            }
        }
        let _ = self.inner.changes.send(SourceChange {
            source: source.to_string(),
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterStore for MemoryStore {
    async fn fetch_rows(&self, source: &str, filter: IdFilter) -> Result<Vec<CounterRow>> {
        let tables = self.inner.tables.read().unwrap();
        // An absent source answers with zero rows, which aggregates to 0.
        Ok(tables
            .get(source)
            .map(|rows| {
                rows.iter()
                    .copied()
                    .filter(|row| filter.matches(row.id))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn changes(&self) -> broadcast::Receiver<SourceChange> {
        self.inner.changes.subscribe()
    }
}

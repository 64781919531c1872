use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, Weak};
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use log::{error, info, warn};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::CounterSet;

use super::store::{
    CounterRow, CounterStore, IdFilter, CYCLE_SOURCE, DUSTBIN_SOURCE, SUMMED_IDS, VISITS_ROW_ID,
    WATER_SOURCE, WEBSITE_SOURCE,
};

type ListenerFn = Box<dyn Fn(&CounterSet) + Send + Sync>;
type ListenerMap = StdMutex<HashMap<Uuid, ListenerFn>>;

/// Read-through cache over the four kiosk counters.
///
/// Values are served from memory; a getter whose value is older than the TTL
/// awaits one shared refresh first. A refresh replaces all four counters as
/// one unit and then notifies listeners; a failed refresh is logged and
/// leaves the previous values untouched. Cloning is cheap and shares state.
pub struct DataCache<S: CounterStore> {
    inner: Arc<CacheInner<S>>,
}

impl<S: CounterStore> Clone for DataCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CacheInner<S> {
    store: S,
    ttl: Duration,
    state: Mutex<CounterSet>,
    /// Serializes refreshes so concurrent callers share one fetch round.
    refresh_gate: Mutex<()>,
    /// Bumped on every successful wholesale replace.
    generation: AtomicU64,
    listeners: Arc<ListenerMap>,
    live_started: AtomicBool,
    live_cancel: CancellationToken,
    live_task: StdMutex<Option<JoinHandle<()>>>,
}

/// Handle returned by [`DataCache::subscribe`]. The listener stays
/// registered until `unsubscribe` is called, even if the handle is dropped.
pub struct Subscription {
    id: Uuid,
    listeners: Weak<ListenerMap>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock_listeners(&listeners).remove(&self.id);
        }
    }
}

fn lock_listeners(listeners: &ListenerMap) -> MutexGuard<'_, HashMap<Uuid, ListenerFn>> {
    match listeners.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl<S: CounterStore> DataCache<S> {
    pub fn new(store: S, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                store,
                ttl,
                state: Mutex::new(CounterSet::new()),
                refresh_gate: Mutex::new(()),
                generation: AtomicU64::new(0),
                listeners: Arc::new(StdMutex::new(HashMap::new())),
                live_started: AtomicBool::new(false),
                live_cancel: CancellationToken::new(),
                live_task: StdMutex::new(None),
            }),
        }
    }

    /// Current cache contents without any freshness check.
    pub async fn snapshot(&self) -> CounterSet {
        self.inner.state.lock().await.clone()
    }

    pub async fn water_refills(&self) -> u64 {
        self.fresh().await.water_refills
    }

    pub async fn user_count(&self) -> u64 {
        self.fresh().await.user_count
    }

    pub async fn cycle_data(&self) -> u64 {
        self.fresh().await.cycle_data
    }

    pub async fn dustbin_data(&self) -> u64 {
        self.fresh().await.dustbin_data
    }

    /// All four counters in one freshness-checked read.
    pub async fn counters(&self) -> CounterSet {
        self.fresh().await
    }

    async fn fresh(&self) -> CounterSet {
        let set = self.snapshot().await;
        if set.is_stale(self.inner.ttl, Utc::now()) {
            self.refresh_all().await
        } else {
            set
        }
    }

    /// One batched fetch round across all four sources. Replaces the cache
    /// wholesale, then notifies listeners. On any source failing the
    /// previous values are returned unchanged and nobody is notified.
    pub async fn refresh_all(&self) -> CounterSet {
        let entry_generation = self.inner.generation.load(Ordering::Acquire);
        let _gate = self.inner.refresh_gate.lock().await;
        if self.inner.generation.load(Ordering::Acquire) != entry_generation {
            // Another caller completed a refresh while we waited for the
            // gate; its result is fresh enough.
            return self.snapshot().await;
        }

        match self.fetch_counters().await {
            Ok(fresh) => {
                {
                    let mut state = self.inner.state.lock().await;
                    *state = fresh.clone();
                }
                self.inner.generation.fetch_add(1, Ordering::Release);
                self.notify_listeners(&fresh);
                fresh
            }
            Err(err) => {
                error!("counter refresh failed, keeping stale values: {err:#}");
                self.snapshot().await
            }
        }
    }

    async fn fetch_counters(&self) -> Result<CounterSet> {
        let store = &self.inner.store;
        let (water, website, cycle, dustbin) = tokio::try_join!(
            store.fetch_rows(WATER_SOURCE, IdFilter::In(SUMMED_IDS.to_vec())),
            store.fetch_rows(WEBSITE_SOURCE, IdFilter::Eq(VISITS_ROW_ID)),
            store.fetch_rows(CYCLE_SOURCE, IdFilter::In(SUMMED_IDS.to_vec())),
            store.fetch_rows(DUSTBIN_SOURCE, IdFilter::In(SUMMED_IDS.to_vec())),
        )?;

        Ok(CounterSet {
            water_refills: sum_rows(&water),
            user_count: first_row(&website),
            cycle_data: sum_rows(&cycle),
            dustbin_data: sum_rows(&dustbin),
            last_updated: Some(Utc::now()),
        })
    }

    fn notify_listeners(&self, set: &CounterSet) {
        let listeners = lock_listeners(&self.inner.listeners);
        for listener in listeners.values() {
            listener(set);
        }
    }

    /// Register a callback invoked after every successful refresh, and make
    /// sure the live-update channel is running. Must be called from within
    /// the runtime.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&CounterSet) + Send + Sync + 'static,
    {
        self.ensure_live_updates();
        let id = Uuid::new_v4();
        lock_listeners(&self.inner.listeners).insert(id, Box::new(listener));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.inner.listeners),
        }
    }

    /// Force one refresh and establish the live-update channel ahead of the
    /// first page render.
    pub async fn preload(&self) -> CounterSet {
        self.ensure_live_updates();
        self.refresh_all().await
    }

    /// Spawn the change-feed task. Established at most once per cache;
    /// removing every listener does not tear it down.
    fn ensure_live_updates(&self) {
        if self.inner.live_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let cache = self.clone();
        let mut changes = self.inner.store.changes();
        let cancel = self.inner.live_cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("live update listener shutting down");
                        break;
                    }
                    received = changes.recv() => match received {
                        Ok(change) => {
                            info!("source {} changed, refreshing counters", change.source);
                            cache.refresh_all().await;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("live update feed lagged, {skipped} notifications dropped");
                            cache.refresh_all().await;
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("live update feed closed");
                            break;
                        }
                    }
                }
            }
        });

        match self.inner.live_task.lock() {
            Ok(mut guard) => *guard = Some(handle),
            Err(poisoned) => *poisoned.into_inner() = Some(handle),
        }
    }

    /// Process-exit teardown of the live-update task. The cache itself
    /// remains usable for direct reads.
    pub async fn shutdown(&self) {
        self.inner.live_cancel.cancel();
        let handle = match self.inner.live_task.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!("live update listener failed to join: {err}");
            }
        }
    }
}

fn sum_rows(rows: &[CounterRow]) -> u64 {
    rows.iter().map(|row| row.data).sum()
}

fn first_row(rows: &[CounterRow]) -> u64 {
    rows.first().map(|row| row.data).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex as StdMutex;

    use anyhow::bail;

    use crate::data::store::SourceChange;

    use super::*;

    /// Store with a controllable failure switch, per-call delay, and a
    /// fetch counter, so tests can observe exactly how many queries a cache
    /// operation issued.
    #[derive(Clone)]
    struct TestStore {
        inner: Arc<TestStoreInner>,
    }

    struct TestStoreInner {
        tables: StdMutex<HashMap<String, Vec<CounterRow>>>,
        fetches: AtomicU64,
        fail: AtomicBool,
        delay: Duration,
        changes: broadcast::Sender<SourceChange>,
    }

    impl TestStore {
        fn new(delay: Duration) -> Self {
            let (changes, _) = broadcast::channel(16);
            let store = Self {
                inner: Arc::new(TestStoreInner {
                    tables: StdMutex::new(HashMap::new()),
                    fetches: AtomicU64::new(0),
                    fail: AtomicBool::new(false),
                    delay,
                    changes,
                }),
            };
            store.put(
                WATER_SOURCE,
                (1..=10).map(|id| CounterRow { id, data: 5 }).collect(),
            );
            store.put(
                WEBSITE_SOURCE,
                vec![
                    CounterRow { id: 1, data: 9 },
                    CounterRow { id: 2, data: 42 },
                ],
            );
            store.put(
                CYCLE_SOURCE,
                (1..=10).map(|id| CounterRow { id, data: 2 }).collect(),
            );
            store.put(
                DUSTBIN_SOURCE,
                (1..=10).map(|id| CounterRow { id, data: 3 }).collect(),
            );
            store
        }

        fn put(&self, source: &str, rows: Vec<CounterRow>) {
            self.inner
                .tables
                .lock()
                .unwrap()
                .insert(source.to_string(), rows);
        }

        fn fetches(&self) -> u64 {
            self.inner.fetches.load(Ordering::SeqCst)
        }

        fn set_failing(&self, failing: bool) {
            self.inner.fail.store(failing, Ordering::SeqCst);
        }

        fn publish_change(&self, source: &str) {
            let _ = self.inner.changes.send(SourceChange {
                source: source.to_string(),
            });
        }
    }

    impl CounterStore for TestStore {
        async fn fetch_rows(&self, source: &str, filter: IdFilter) -> Result<Vec<CounterRow>> {
            self.inner.fetches.fetch_add(1, Ordering::SeqCst);
            if !self.inner.delay.is_zero() {
                tokio::time::sleep(self.inner.delay).await;
            }
            if self.inner.fail.load(Ordering::SeqCst) {
                bail!("backend offline");
            }
            let tables = self.inner.tables.lock().unwrap();
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

    fn expected_counters() -> (u64, u64, u64, u64) {
        // water: 10 rows of 5; visits: row id 2; cycle: 10 of 2; dustbin: 10 of 3
        (50, 42, 20, 30)
    }

    #[tokio::test]
    async fn refresh_matches_freshly_computed_aggregates() {
        let store = TestStore::new(Duration::ZERO);
        let cache = DataCache::new(store.clone(), Duration::from_secs(300));

        let set = cache.refresh_all().await;
        let (water, visits, cycle, dustbin) = expected_counters();
        assert_eq!(set.water_refills, water);
        assert_eq!(set.user_count, visits);
        assert_eq!(set.cycle_data, cycle);
        assert_eq!(set.dustbin_data, dustbin);
        assert!(set.last_updated.is_some());
        assert_eq!(store.fetches(), 4);
        assert_eq!(cache.snapshot().await, set);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_values_and_stays_silent() {
        let store = TestStore::new(Duration::ZERO);
        let cache = DataCache::new(store.clone(), Duration::from_secs(300));
        let before = cache.refresh_all().await;

        let notified = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&notified);
        let subscription = cache.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.set_failing(true);
        let after = cache.refresh_all().await;

        assert_eq!(after, before);
        assert_eq!(cache.snapshot().await, before);
        assert_eq!(notified.load(Ordering::SeqCst), 0);
        subscription.unsubscribe();
    }

    #[tokio::test]
    async fn reads_within_ttl_issue_no_fetch() {
        let store = TestStore::new(Duration::ZERO);
        let cache = DataCache::new(store.clone(), Duration::from_secs(300));

        assert_eq!(cache.water_refills().await, 50);
        assert_eq!(store.fetches(), 4);

        // Served straight from the cache.
        assert_eq!(cache.user_count().await, 42);
        assert_eq!(cache.cycle_data().await, 20);
        assert_eq!(cache.dustbin_data().await, 30);
        assert_eq!(store.fetches(), 4);
    }

    #[tokio::test]
    async fn zero_ttl_refetches_on_every_read() {
        let store = TestStore::new(Duration::ZERO);
        let cache = DataCache::new(store.clone(), Duration::ZERO);

        cache.water_refills().await;
        let first_round = store.fetches();
        cache.water_refills().await;
        assert!(store.fetches() > first_round);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_refreshes_share_one_fetch_round() {
        let store = TestStore::new(Duration::from_millis(50));
        let cache = DataCache::new(store.clone(), Duration::from_secs(300));

        let (a, b) = tokio::join!(cache.refresh_all(), cache.refresh_all());
        assert_eq!(a, b);
        assert_eq!(store.fetches(), 4);
    }

    #[tokio::test]
    async fn listeners_fire_after_each_successful_refresh() {
        let store = TestStore::new(Duration::ZERO);
        let cache = DataCache::new(store.clone(), Duration::from_secs(300));

        let seen: Arc<StdMutex<Vec<CounterSet>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = cache.subscribe(move |set| {
            sink.lock().unwrap().push(set.clone());
        });

        let set = cache.refresh_all().await;
        {
            let seen = seen.lock().unwrap();
            assert_eq!(*seen, vec![set]);
        }

        subscription.unsubscribe();
        cache.refresh_all().await;
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn change_event_triggers_automatic_refresh() {
        let store = TestStore::new(Duration::ZERO);
        let cache = DataCache::new(store.clone(), Duration::from_secs(300));

        cache.preload().await;
        assert_eq!(store.fetches(), 4);

        store.put(
            WATER_SOURCE,
            (1..=10).map(|id| CounterRow { id, data: 6 }).collect(),
        );
        store.publish_change(WATER_SOURCE);

        // Give the live-update task a turn.
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.fetches(), 8);
        assert_eq!(cache.snapshot().await.water_refills, 60);

        cache.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn live_channel_is_established_at_most_once() {
        let store = TestStore::new(Duration::ZERO);
        let cache = DataCache::new(store.clone(), Duration::from_secs(300));

        cache.preload().await;
        cache.preload().await;
        assert_eq!(store.fetches(), 8);

        // Were a second live task running, one change would refresh twice.
        store.publish_change(CYCLE_SOURCE);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.fetches(), 12);

        cache.shutdown().await;
    }

    #[tokio::test]
    async fn empty_source_aggregates_to_zero() {
        let store = TestStore::new(Duration::ZERO);
        store.put(WATER_SOURCE, Vec::new());
        store.put(WEBSITE_SOURCE, vec![CounterRow { id: 1, data: 9 }]);
        let cache = DataCache::new(store, Duration::from_secs(300));

        let set = cache.refresh_all().await;
        assert_eq!(set.water_refills, 0);
        // No row with the visits id either.
        assert_eq!(set.user_count, 0);
        assert_eq!(set.cycle_data, 20);
    }
}

// ── Keyed query cache ──
//
// Each key owns a `watch` channel carrying its current `QueryState`.
// Fetches are tagged with a generation number; a newer fetch or an
// optimistic write bumps the generation so late responses are discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::time::Instant;

use super::query_key::QueryKey;
use crate::error::CoreError;

/// Observable state of a single cached query.
#[derive(Debug)]
pub struct QueryState<T> {
    /// Last successfully fetched (or optimistically written) value.
    pub data: Option<Arc<T>>,
    /// Error from the most recent failed fetch. Cleared on success.
    pub error: Option<Arc<CoreError>>,
    /// Wall-clock time of the last successful fetch.
    pub updated_at: Option<DateTime<Utc>>,
    pub fetched_at: Option<Instant>,
    pub invalidated: bool,
    pub fetching: bool,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            updated_at: None,
            fetched_at: None,
            invalidated: false,
            fetching: false,
        }
    }
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            updated_at: self.updated_at,
            fetched_at: self.fetched_at,
            invalidated: self.invalidated,
            fetching: self.fetching,
        }
    }
}

impl<T> QueryState<T> {
    /// Stale when invalidated, never fetched, or older than `stale_time`.
    pub fn is_stale(&self, stale_time: Duration) -> bool {
        self.invalidated
            || self
                .fetched_at
                .is_none_or(|at| at.elapsed() >= stale_time)
    }
}

struct QuerySlot<T> {
    state: watch::Sender<QueryState<T>>,
    generation: AtomicU64,
}

impl<T> QuerySlot<T> {
    fn new() -> Self {
        let (state, _) = watch::channel(QueryState::default());
        Self {
            state,
            generation: AtomicU64::new(0),
        }
    }
}

/// Ticket returned by [`QueryStore::begin_fetch`]; a completed fetch is
/// only applied if its ticket is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

/// All cached entries for a single value type.
pub struct QueryStore<T: Send + Sync + 'static> {
    slots: DashMap<QueryKey, Arc<QuerySlot<T>>>,
}

impl<T: Send + Sync + 'static> Default for QueryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> QueryStore<T> {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    fn slot(&self, key: &QueryKey) -> Arc<QuerySlot<T>> {
        Arc::clone(
            self.slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(QuerySlot::new()))
                .value(),
        )
    }

    /// Current state, or the empty default for unknown keys.
    pub fn state(&self, key: &QueryKey) -> QueryState<T> {
        self.slots
            .get(key)
            .map(|slot| slot.state.borrow().clone())
            .unwrap_or_default()
    }

    pub fn data(&self, key: &QueryKey) -> Option<Arc<T>> {
        self.slots
            .get(key)
            .and_then(|slot| slot.state.borrow().data.clone())
    }

    pub fn is_stale(&self, key: &QueryKey, stale_time: Duration) -> bool {
        self.slots
            .get(key)
            .is_none_or(|slot| slot.state.borrow().is_stale(stale_time))
    }

    pub fn subscribe(&self, key: &QueryKey) -> watch::Receiver<QueryState<T>> {
        self.slot(key).state.subscribe()
    }

    // ── Fetch lifecycle ──────────────────────────────────────────────

    /// Mark `key` as fetching and supersede any in-flight fetch.
    pub fn begin_fetch(&self, key: &QueryKey) -> FetchTicket {
        let slot = self.slot(key);
        let generation = slot.generation.fetch_add(1, Ordering::SeqCst) + 1;
        slot.state.send_if_modified(|state| {
            let changed = !state.fetching;
            state.fetching = true;
            changed
        });
        FetchTicket(generation)
    }

    /// Apply a fetch result if `ticket` is still current.
    ///
    /// `merge` receives the previous value and the fetched one, which may
    /// be a different shape than what the store holds. When it returns the
    /// previous `Arc` unchanged and there was no error to clear,
    /// subscribers are not woken. Returns `false` for a superseded ticket.
    pub fn finish_fetch<R, F>(
        &self,
        key: &QueryKey,
        ticket: FetchTicket,
        result: Result<R, CoreError>,
        merge: F,
    ) -> bool
    where
        F: FnOnce(Option<&Arc<T>>, R) -> Arc<T>,
    {
        let slot = self.slot(key);
        if slot.generation.load(Ordering::SeqCst) != ticket.0 {
            return false;
        }

        match result {
            Ok(fresh) => {
                slot.state.send_if_modified(|state| {
                    let merged = merge(state.data.as_ref(), fresh);
                    let unchanged = state
                        .data
                        .as_ref()
                        .is_some_and(|prev| Arc::ptr_eq(prev, &merged))
                        && state.error.is_none();
                    state.data = Some(merged);
                    state.error = None;
                    state.updated_at = Some(Utc::now());
                    state.fetched_at = Some(Instant::now());
                    state.invalidated = false;
                    state.fetching = false;
                    !unchanged
                });
            }
            Err(error) => {
                slot.state.send_modify(|state| {
                    state.error = Some(Arc::new(error));
                    state.fetching = false;
                });
            }
        }
        true
    }

    // ── Direct writes ────────────────────────────────────────────────

    /// Replace the cached value and supersede in-flight fetches.
    pub fn set_data(&self, key: &QueryKey, value: Arc<T>) {
        let slot = self.slot(key);
        slot.generation.fetch_add(1, Ordering::SeqCst);
        slot.state.send_modify(|state| {
            state.data = Some(value);
            state.fetching = false;
        });
    }

    /// Apply `f` to the cached value, if any. Returns whether it ran.
    pub fn update<F>(&self, key: &QueryKey, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let Some(current) = self.data(key) else {
            return false;
        };
        self.set_data(key, Arc::new(f(&current)));
        true
    }

    /// Capture the cached value for a later [`restore`](Self::restore).
    pub fn snapshot(&self, key: &QueryKey) -> Option<Arc<T>> {
        self.data(key)
    }

    /// Put back a snapshot; `None` clears the data.
    pub fn restore(&self, key: &QueryKey, snapshot: Option<Arc<T>>) {
        let slot = self.slot(key);
        slot.generation.fetch_add(1, Ordering::SeqCst);
        slot.state.send_modify(|state| {
            state.data = snapshot;
            state.fetching = false;
        });
    }

    // ── Invalidation ─────────────────────────────────────────────────

    /// Mark every key under `prefix` stale. Returns the matched count.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut count = 0;
        for slot in self.slots.iter().filter(|s| s.key().starts_with(prefix)) {
            slot.state.send_if_modified(|state| {
                state.invalidated = true;
                false
            });
            count += 1;
        }
        count
    }

    pub fn keys_with_prefix(&self, prefix: &QueryKey) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self
            .slots
            .iter()
            .filter(|s| s.key().starts_with(prefix))
            .map(|s| s.key().clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Replace-on-fetch merge used by every store without structural sharing.
pub fn replace<T>(_previous: Option<&Arc<T>>, fresh: T) -> Arc<T> {
    Arc::new(fresh)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(name: &str) -> QueryKey {
        QueryKey::new(["things", name])
    }

    #[tokio::test]
    async fn fetch_roundtrip_sets_data_and_clears_error() {
        let store: QueryStore<u32> = QueryStore::new();
        let k = key("a");

        let ticket = store.begin_fetch(&k);
        assert!(store.state(&k).fetching);
        store.finish_fetch(&k, ticket, Err(CoreError::Timeout), replace);
        let state = store.state(&k);
        assert!(state.error.is_some());
        assert!(state.data.is_none());

        let ticket = store.begin_fetch(&k);
        assert!(store.finish_fetch(&k, ticket, Ok(7), replace));
        let state = store.state(&k);
        assert_eq!(*state.data.unwrap(), 7);
        assert!(state.error.is_none());
        assert!(state.updated_at.is_some());
    }

    #[tokio::test]
    async fn failed_fetch_keeps_last_good_data() {
        let store: QueryStore<u32> = QueryStore::new();
        let k = key("a");
        let t = store.begin_fetch(&k);
        store.finish_fetch(&k, t, Ok(1), replace);
        let t = store.begin_fetch(&k);
        store.finish_fetch(&k, t, Err(CoreError::Timeout), replace);

        let state = store.state(&k);
        assert_eq!(*state.data.unwrap(), 1);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn newer_fetch_supersedes_older_one() {
        let store: QueryStore<u32> = QueryStore::new();
        let k = key("a");
        let old = store.begin_fetch(&k);
        let new = store.begin_fetch(&k);

        assert!(store.finish_fetch(&k, new, Ok(2), replace));
        assert!(!store.finish_fetch(&k, old, Ok(1), replace));
        assert_eq!(*store.data(&k).unwrap(), 2);
    }

    #[tokio::test]
    async fn optimistic_write_discards_inflight_fetch() {
        let store: QueryStore<u32> = QueryStore::new();
        let k = key("a");
        let ticket = store.begin_fetch(&k);
        store.set_data(&k, Arc::new(9));
        assert!(!store.finish_fetch(&k, ticket, Ok(1), replace));
        assert_eq!(*store.data(&k).unwrap(), 9);
    }

    #[tokio::test]
    async fn prefix_invalidation_marks_only_matching_keys() {
        let store: QueryStore<u32> = QueryStore::new();
        let inside = QueryKey::new(["devices", "list", "x"]);
        let outside = QueryKey::new(["automation", "x"]);
        for k in [&inside, &outside] {
            let t = store.begin_fetch(k);
            store.finish_fetch(k, t, Ok(1), replace);
        }
        let long = Duration::from_secs(3600);
        assert!(!store.is_stale(&inside, long));

        assert_eq!(store.invalidate(&QueryKey::devices()), 1);
        assert!(store.is_stale(&inside, long));
        assert!(!store.is_stale(&outside, long));
    }

    #[tokio::test]
    async fn unchanged_merge_does_not_wake_subscribers() {
        let store: QueryStore<u32> = QueryStore::new();
        let k = key("a");
        let t = store.begin_fetch(&k);
        store.finish_fetch(&k, t, Ok(1), replace);

        let mut rx = store.subscribe(&k);
        let t = store.begin_fetch(&k);
        rx.borrow_and_update();
        store.finish_fetch(&k, t, Ok(1), |prev, _| Arc::clone(prev.unwrap()));
        assert!(!rx.has_changed().unwrap());
        assert!(!rx.borrow().fetching);

        let t = store.begin_fetch(&k);
        store.finish_fetch(&k, t, Ok(2), replace);
        assert!(rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn merge_folds_fetched_shape_into_stored_one() {
        let store: QueryStore<u32> = QueryStore::new();
        let k = key("a");
        let t = store.begin_fetch(&k);
        assert!(store.finish_fetch(&k, t, Ok(vec![1_u32, 2, 3]), |_, parts: Vec<u32>| {
            Arc::new(parts.iter().sum())
        }));
        assert_eq!(*store.data(&k).unwrap(), 6);

        let t = store.begin_fetch(&k);
        store.finish_fetch(&k, t, Ok("4"), |prev, raw: &str| {
            Arc::new(prev.map_or(0, |p| **p) + raw.parse::<u32>().unwrap())
        });
        assert_eq!(*store.data(&k).unwrap(), 10);
    }

    #[tokio::test]
    async fn snapshot_and_restore() {
        let store: QueryStore<u32> = QueryStore::new();
        let k = key("a");
        store.set_data(&k, Arc::new(1));
        let snap = store.snapshot(&k);
        store.update(&k, |v| v + 10);
        assert_eq!(*store.data(&k).unwrap(), 11);
        store.restore(&k, snap);
        assert_eq!(*store.data(&k).unwrap(), 1);

        let missing = key("b");
        let snap = store.snapshot(&missing);
        store.set_data(&missing, Arc::new(5));
        store.restore(&missing, snap);
        assert!(store.data(&missing).is_none());
    }
}

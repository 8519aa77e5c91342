//! Keyed query cache with stale-while-revalidate reads and optimistic writes

use super::key::QueryKey;
use super::mutation::{AppliedWrite, MutateOptions, PendingMutation};
use crate::error::{StorefrontError, StorefrontResult};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// Async function performing the network call behind a cache entry
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, StorefrontResult<Value>> + Send + Sync>;

/// Wrap an async closure as a [`Fetcher`]
pub fn fetcher<F, Fut>(f: F) -> Fetcher
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StorefrontResult<Value>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Observable state of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Fresh,
    Stale,
    Fetching,
    Error,
}

/// Point-in-time view of an entry
#[derive(Debug, Clone)]
pub struct EntrySnapshot {
    pub data: Option<Value>,
    pub status: EntryStatus,
    pub fetched_at: Option<Instant>,
    pub error: Option<String>,
    pub pending_mutations: usize,
}

/// Change notification sent to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Updated(QueryKey),
    Invalidated(QueryKey),
    Failed(QueryKey),
    Cleared,
}

/// Per-read options
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Override of the cache's default staleness window
    pub stale_time: Option<Duration>,
    /// Fetch in the foreground even if data is cached
    pub force: bool,
}

impl ReadOptions {
    pub fn stale_time(stale_time: Duration) -> Self {
        Self {
            stale_time: Some(stale_time),
            force: false,
        }
    }

    pub fn forced() -> Self {
        Self {
            stale_time: None,
            force: true,
        }
    }
}

struct Entry {
    data: Option<Value>,
    fetched_at: Option<Instant>,
    stale_time: Duration,
    invalidated: bool,
    fetching: bool,
    error: Option<String>,
    // Bumped by every local write; fetches started under an older revision
    // are discarded when they land.
    revision: u64,
    pending: usize,
    // Optimistic writes still in flight, oldest first
    writes: Vec<AppliedWrite>,
}

impl Entry {
    fn new(stale_time: Duration) -> Self {
        Self {
            data: None,
            fetched_at: None,
            stale_time,
            invalidated: false,
            fetching: false,
            error: None,
            revision: 0,
            pending: 0,
            writes: Vec::new(),
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        !self.invalidated
            && self
                .fetched_at
                .is_some_and(|at| now.duration_since(at) < self.stale_time)
    }

    fn status(&self, now: Instant) -> EntryStatus {
        if self.fetching {
            EntryStatus::Fetching
        } else if self.error.is_some() {
            EntryStatus::Error
        } else if self.is_fresh(now) {
            EntryStatus::Fresh
        } else {
            EntryStatus::Stale
        }
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, Entry>,
    // Bumped by `clear`; work started in an older epoch never writes back
    epoch: u64,
}

#[derive(Debug, Clone, Copy)]
struct FetchTicket {
    epoch: u64,
    revision: u64,
}

enum Plan {
    Hit(Value),
    Revalidate(Value, FetchTicket),
    Fetch(FetchTicket),
}

struct Inner {
    state: Mutex<CacheState>,
    events: broadcast::Sender<CacheEvent>,
    default_stale_time: Duration,
}

/// Shared handle to one cache instance; clones refer to the same entries
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl QueryCache {
    pub fn new(default_stale_time: Duration) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(CacheState::default()),
                events,
                default_stale_time,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: CacheEvent) {
        // No receivers is fine: nobody is watching
        let _ = self.inner.events.send(event);
    }

    /// Receive change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    /// Read `key`, fetching with `fetcher` when needed.
    ///
    /// Fresh data is returned without I/O. Stale data is returned at once and
    /// revalidated in the background. Missing data, or `options.force`, is
    /// fetched before returning.
    pub async fn read(
        &self,
        key: &QueryKey,
        fetcher: Fetcher,
        options: ReadOptions,
    ) -> StorefrontResult<Value> {
        let stale_time = options.stale_time.unwrap_or(self.inner.default_stale_time);
        let now = Instant::now();

        let plan = {
            let mut state = self.state();
            let epoch = state.epoch;
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(stale_time));
            entry.stale_time = stale_time;

            match entry.data.clone() {
                Some(data) if !options.force => {
                    if entry.is_fresh(now) || entry.fetching {
                        Plan::Hit(data)
                    } else {
                        entry.fetching = true;
                        Plan::Revalidate(
                            data,
                            FetchTicket {
                                epoch,
                                revision: entry.revision,
                            },
                        )
                    }
                }
                _ => {
                    entry.fetching = true;
                    Plan::Fetch(FetchTicket {
                        epoch,
                        revision: entry.revision,
                    })
                }
            }
        };

        match plan {
            Plan::Hit(data) => {
                debug!("Cache hit for {}", key);
                Ok(data)
            }
            Plan::Revalidate(data, ticket) => {
                debug!("Serving stale {} while revalidating", key);
                self.spawn_fetch(key.clone(), fetcher, ticket);
                Ok(data)
            }
            Plan::Fetch(ticket) => {
                debug!("Fetching {}", key);
                let result = fetcher().await;
                self.settle_fetch(key, ticket, &result);
                result
            }
        }
    }

    /// Read and deserialize
    pub async fn read_as<T: DeserializeOwned>(
        &self,
        key: &QueryKey,
        fetcher: Fetcher,
        options: ReadOptions,
    ) -> StorefrontResult<T> {
        let value = self.read(key, fetcher, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch in the foreground regardless of cached data
    pub async fn refetch(&self, key: &QueryKey, fetcher: Fetcher) -> StorefrontResult<Value> {
        self.read(key, fetcher, ReadOptions::forced()).await
    }

    /// Warm `key` without blocking the caller
    pub fn prefetch(&self, key: QueryKey, fetcher: Fetcher, options: ReadOptions) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.read(&key, fetcher, options).await {
                debug!("Prefetch of {} failed: {}", key, e);
            }
        })
    }

    fn spawn_fetch(&self, key: QueryKey, fetcher: Fetcher, ticket: FetchTicket) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let result = fetcher().await;
            if let Err(ref e) = result {
                warn!("Background refresh of {} failed: {}", key, e);
            }
            cache.settle_fetch(&key, ticket, &result);
        })
    }

    fn settle_fetch(&self, key: &QueryKey, ticket: FetchTicket, result: &StorefrontResult<Value>) {
        let mut state = self.state();
        if state.epoch != ticket.epoch {
            debug!("Discarding {}: cache cleared while fetching", key);
            return;
        }
        let Some(entry) = state.entries.get_mut(key) else {
            return;
        };
        entry.fetching = false;
        if entry.revision != ticket.revision {
            debug!("Discarding {}: written locally while fetching", key);
            return;
        }

        let event = match result {
            Ok(value) => {
                entry.data = Some(value.clone());
                entry.fetched_at = Some(Instant::now());
                entry.invalidated = false;
                entry.error = None;
                CacheEvent::Updated(key.clone())
            }
            Err(e) => {
                entry.error = Some(e.to_string());
                CacheEvent::Failed(key.clone())
            }
        };
        drop(state);
        self.emit(event);
    }

    /// Run `mutation` against `key`.
    ///
    /// With an optimistic update the cached value changes immediately; a
    /// failure restores the value that preceded this mutation before the
    /// error is returned. Settlement then invalidates per `options`.
    pub async fn mutate<T, Fut>(
        &self,
        key: &QueryKey,
        mutation: Fut,
        options: MutateOptions,
    ) -> StorefrontResult<T>
    where
        Fut: Future<Output = StorefrontResult<T>>,
    {
        let MutateOptions {
            optimistic,
            invalidate,
            also_invalidate,
        } = options;

        let pending = self.begin_mutation(key, optimistic);
        let result = mutation.await;
        let succeeded = result.is_ok();
        self.settle_mutation(pending, succeeded);

        if invalidate.applies(succeeded) {
            self.invalidate(key);
            for prefix in &also_invalidate {
                self.invalidate(prefix);
            }
        }
        result
    }

    fn begin_mutation(
        &self,
        key: &QueryKey,
        optimistic: Option<super::mutation::OptimisticUpdate>,
    ) -> PendingMutation {
        let id = Uuid::new_v4();
        let mut state = self.state();
        let epoch = state.epoch;
        // Only entries that already exist are tracked; a write to an uncached
        // key leaves nothing behind
        let (tracked, applied) = match state.entries.get_mut(key) {
            Some(entry) => {
                entry.pending += 1;
                let applied = match (optimistic, entry.data.take()) {
                    (Some(update), Some(current)) => {
                        entry.data = Some(update(&current));
                        entry.revision += 1;
                        entry.writes.push(AppliedWrite::new(id, current));
                        true
                    }
                    (_, current) => {
                        entry.data = current;
                        false
                    }
                };
                (true, applied)
            }
            None => (false, false),
        };
        drop(state);

        let pending = PendingMutation {
            id,
            key: key.clone(),
            tracked,
            applied,
            epoch,
        };
        debug!(
            "Mutation {} on {} started (optimistic: {})",
            pending.id, pending.key, applied
        );
        if applied {
            self.emit(CacheEvent::Updated(key.clone()));
        }
        pending
    }

    /// Settle one mutation against the stack of optimistic writes on its key.
    ///
    /// A failed write that is still on top restores its snapshot. A failed
    /// write with later writes above it hands its snapshot to the next one up
    /// instead, so the later value stays visible. A success supersedes every
    /// write below it: their failures no longer restore anything.
    fn settle_mutation(&self, pending: PendingMutation, succeeded: bool) {
        let mut state = self.state();
        if state.epoch != pending.epoch {
            debug!("Mutation {} settled after clear", pending.id);
            return;
        }
        let Some(entry) = state.entries.get_mut(&pending.key) else {
            return;
        };
        if pending.tracked {
            entry.pending = entry.pending.saturating_sub(1);
        }

        let position = entry.writes.iter().position(|w| w.id == pending.id);
        let Some(index) = position.filter(|_| pending.applied) else {
            debug!("Mutation {} on {} settled", pending.id, pending.key);
            return;
        };
        let write = entry.writes.remove(index);

        if succeeded {
            for below in &mut entry.writes[..index] {
                below.superseded = true;
            }
            debug!("Mutation {} on {} settled", pending.id, pending.key);
            return;
        }
        if write.superseded {
            debug!(
                "Mutation {} on {} failed after a later write succeeded",
                pending.id, pending.key
            );
            return;
        }
        if let Some(above) = entry.writes.get_mut(index) {
            above.snapshot = write.snapshot;
            debug!(
                "Mutation {} on {} failed under a later write",
                pending.id, pending.key
            );
            return;
        }

        entry.data = Some(write.snapshot);
        entry.revision += 1;
        drop(state);
        debug!("Mutation {} on {} rolled back", pending.id, pending.key);
        self.emit(CacheEvent::Updated(pending.key));
    }

    /// Mark every entry under `prefix` stale. Returns how many matched.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut state = self.state();
        let mut matched = Vec::new();
        for (key, entry) in state.entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidated = true;
                entry.revision += 1;
                matched.push(key.clone());
            }
        }
        drop(state);

        let count = matched.len();
        for key in matched {
            self.emit(CacheEvent::Invalidated(key));
        }
        count
    }

    /// Drop every entry. Fetches and rollbacks already in flight are discarded.
    pub fn clear(&self) {
        let mut state = self.state();
        state.entries.clear();
        state.epoch += 1;
        drop(state);
        debug!("Query cache cleared");
        self.emit(CacheEvent::Cleared);
    }

    /// Cached value for `key`, fresh or not
    pub fn get_data(&self, key: &QueryKey) -> Option<Value> {
        self.state().entries.get(key).and_then(|e| e.data.clone())
    }

    /// Cached value deserialized; `Ok(None)` when nothing is cached
    pub fn get_as<T: DeserializeOwned>(&self, key: &QueryKey) -> StorefrontResult<Option<T>> {
        self.get_data(key)
            .map(serde_json::from_value)
            .transpose()
            .map_err(StorefrontError::from)
    }

    /// Replace the cached value as if it had just been fetched
    pub fn set_data(&self, key: &QueryKey, value: Value) {
        let default_stale = self.inner.default_stale_time;
        let mut state = self.state();
        let entry = state
            .entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(default_stale));
        entry.data = Some(value);
        entry.fetched_at = Some(Instant::now());
        entry.invalidated = false;
        entry.error = None;
        entry.revision += 1;
        drop(state);
        self.emit(CacheEvent::Updated(key.clone()));
    }

    /// Transform the cached value in place. Returns false if nothing is cached.
    pub fn update_data<F>(&self, key: &QueryKey, update: F) -> bool
    where
        F: FnOnce(&Value) -> Value,
    {
        let mut state = self.state();
        let Some(entry) = state.entries.get_mut(key) else {
            return false;
        };
        let Some(current) = entry.data.as_ref() else {
            return false;
        };
        entry.data = Some(update(current));
        entry.revision += 1;
        drop(state);
        self.emit(CacheEvent::Updated(key.clone()));
        true
    }

    /// Status view of one entry
    pub fn entry(&self, key: &QueryKey) -> Option<EntrySnapshot> {
        let now = Instant::now();
        self.state().entries.get(key).map(|e| EntrySnapshot {
            data: e.data.clone(),
            status: e.status(now),
            fetched_at: e.fetched_at,
            error: e.error.clone(),
            pending_mutations: e.pending,
        })
    }

    /// All keys currently held, sorted
    pub fn keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<_> = self.state().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

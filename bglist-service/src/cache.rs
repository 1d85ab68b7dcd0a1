//! In-memory result cache
//!
//! Maps a [`CacheKey`] to one materialised page of records. The cache is an
//! explicitly constructed component: the binary creates it at startup, hands
//! it to the listing service through [`AppState`](crate::state::AppState),
//! starts the background sweeper, and calls [`ResultCache::shutdown`] on the
//! way out.
//!
//! # Semantics
//!
//! - **Expiry** is absolute: an entry is valid for `ttl` after insertion,
//!   regardless of how often it is read.
//! - **At most one compute per key.** Concurrent misses on the same key queue
//!   on a per-key lock; the first caller computes and stores, the others
//!   re-check and read the stored page.
//! - **Failures are not cached.** A compute error is returned to its caller
//!   and nothing is stored.
//! - **Cancellation** of a caller mid-compute drops its lock without storing;
//!   the next waiter computes instead.
//! - **Capacity** is bounded by `max_entries`; the oldest insertions are
//!   evicted first.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::listing::CacheKey;

/// One cached page
///
/// Entries are replaced wholesale, never mutated.
#[derive(Debug)]
pub struct CacheEntry<R> {
    key: CacheKey,
    value: Arc<[R]>,
    inserted_at: Instant,
    ttl: Duration,
    seq: u64,
}

impl<R> CacheEntry<R> {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn value(&self) -> &Arc<[R]> {
        &self.value
    }

    pub fn inserted_at(&self) -> Instant {
        self.inserted_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= self.ttl
    }
}

/// Point-in-time cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub size: usize,
}

/// Per-key compute lock, removed from the in-flight map once unused
struct InflightSlot<'a> {
    map: &'a StdMutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
    key: &'a CacheKey,
    lock: Arc<Mutex<()>>,
}

impl Drop for InflightSlot<'_> {
    fn drop(&mut self) {
        let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here: nobody else is waiting
        if Arc::strong_count(&self.lock) == 2 {
            map.remove(self.key);
        }
    }
}

/// Time-bounded, concurrency-safe page cache
pub struct ResultCache<R> {
    entries: DashMap<CacheKey, CacheEntry<R>>,
    /// Insertion order as `(seq, key)`; items whose entry has since been
    /// replaced or removed are skipped on eviction and dropped by `sweep`
    order: StdMutex<VecDeque<(u64, CacheKey)>>,
    inflight: StdMutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
    max_entries: usize,
    next_seq: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    closed: AtomicBool,
    shutdown_token: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<R> std::fmt::Debug for ResultCache<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("size", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl<R> ResultCache<R> {
    /// Create an open, empty cache holding at most `max_entries` pages
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: StdMutex::new(VecDeque::new()),
            inflight: StdMutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
            next_seq: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            shutdown_token: CancellationToken::new(),
            sweeper: Mutex::new(None),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            size: self.entries.len(),
        }
    }
}

impl<R: Send + Sync + 'static> ResultCache<R> {
    /// Return the cached page for `key`, or run `compute` and cache its result
    ///
    /// `compute` runs at most once per key at a time; concurrent callers for
    /// the same key wait for it and then read the stored page. Returns
    /// [`Error::CacheUnavailable`] once the cache has been shut down.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<Arc<[R]>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<R>>>,
    {
        self.ensure_open()?;

        if let Some(value) = self.lookup(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(cache_key = %key, hit = true, "Result cache lookup");
            return Ok(value);
        }

        let slot = self.inflight_slot(key);
        let _guard = slot.lock.lock().await;

        self.ensure_open()?;
        if let Some(value) = self.lookup(key) {
            // Another caller computed it while we waited
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(cache_key = %key, hit = true, coalesced = true, "Result cache lookup");
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(cache_key = %key, hit = false, "Result cache lookup");

        let started = Instant::now();
        let value: Arc<[R]> = compute().await?.into();
        self.insert(key.clone(), Arc::clone(&value), ttl);

        tracing::debug!(
            cache_key = %key,
            records = value.len(),
            ttl_secs = ttl.as_secs(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cached result page"
        );
        Ok(value)
    }

    /// Unexpired value for `key`; an expired entry is removed on the way
    pub fn get(&self, key: &CacheKey) -> Option<Arc<[R]>> {
        if self.is_closed() {
            return None;
        }
        self.lookup(key)
    }

    fn lookup(&self, key: &CacheKey) -> Option<Arc<[R]>> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(Arc::clone(&entry.value)),
            Some(_) => true,
            None => false,
        };

        if expired && self.entries.remove_if(key, |_, e| e.is_expired(now)).is_some() {
            self.expirations.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(cache_key = %key, "Removed expired cache entry");
        }
        None
    }

    fn insert(&self, key: CacheKey, value: Arc<[R]>, ttl: Duration) {
        let entry = CacheEntry {
            key: key.clone(),
            value,
            inserted_at: Instant::now(),
            ttl,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        };
        let seq = entry.seq;
        self.entries.insert(key.clone(), entry);
        self.order
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back((seq, key));
        self.enforce_capacity();
    }

    fn enforce_capacity(&self) {
        if self.entries.len() <= self.max_entries {
            return;
        }

        let mut order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
        while self.entries.len() > self.max_entries {
            let Some((seq, key)) = order.pop_front() else {
                break;
            };
            if self.entries.remove_if(&key, |_, e| e.seq == seq).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(cache_key = %key, "Evicted cache entry over capacity");
            }
        }
    }

    fn inflight_slot<'a>(&'a self, key: &'a CacheKey) -> InflightSlot<'a> {
        let lock = {
            let mut map = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(
                map.entry(key.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        InflightSlot {
            map: &self.inflight,
            key,
            lock,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::CacheUnavailable)
        } else {
            Ok(())
        }
    }

    /// Drop every expired entry; returns how many were removed
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.expirations.fetch_add(removed as u64, Ordering::Relaxed);
        }

        self.order
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(seq, key)| self.entries.get(key).is_some_and(|e| e.seq == *seq));

        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, lock| Arc::strong_count(lock) > 1);

        removed
    }

    /// Remove every entry
    pub fn clear(&self) {
        let mut order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
        self.entries.clear();
        order.clear();
    }

    /// Start the periodic expiry sweep
    ///
    /// The task holds only a weak reference and stops on [`shutdown`](Self::shutdown)
    /// or when the cache is dropped. A zero `interval` is rejected.
    pub async fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(Error::InvalidConfig(
                "cache sweep interval must be positive".into(),
            ));
        }

        let cache: Weak<Self> = Arc::downgrade(self);
        let token = self.shutdown_token.child_token();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(cache) = cache.upgrade() else { break };
                        let removed = cache.sweep();
                        if removed > 0 {
                            tracing::debug!(removed, size = cache.len(), "Swept expired cache entries");
                        }
                    }
                }
            }
            tracing::debug!("Result cache sweeper stopped");
        });

        if let Some(previous) = self.sweeper.lock().await.replace(handle) {
            previous.abort();
        }
        tracing::info!(interval_secs = interval.as_secs(), "Result cache sweeper started");
        Ok(())
    }

    /// Close the cache: stop the sweeper and drop every entry
    ///
    /// Subsequent [`get_or_compute`](Self::get_or_compute) calls fail with
    /// [`Error::CacheUnavailable`].
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown_token.cancel();

        if let Some(handle) = self.sweeper.lock().await.take() {
            if tokio::time::timeout(Duration::from_secs(5), handle).await.is_err() {
                tracing::warn!("Result cache sweeper shutdown timed out");
            }
        }

        let stats = self.stats();
        self.clear();
        tracing::info!(
            hits = stats.hits,
            misses = stats.misses,
            evictions = stats.evictions,
            expirations = stats.expirations,
            dropped = stats.size,
            "Result cache closed"
        );
    }
}

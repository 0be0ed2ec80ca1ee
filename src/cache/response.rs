//! TTL-bounded response cache.
//!
//! [`ResponseCache`] maps a [`CacheKey`] to the decoded JSON payload of a
//! previously successful upstream response. Entries are never mutated in
//! place: a write replaces the whole [`CacheEntry`] and restamps it.
//!
//! # Expiry
//!
//! An entry set at `t` is returned for reads in `[t, t + ttl)` and treated
//! as absent from `t + ttl` on. Expiry is checked against
//! [`tokio::time::Instant`], so paused-clock tests can drive it with
//! `tokio::time::advance`. Stale entries are dropped lazily on read and in
//! bulk by [`ResponseCache::sweep`].
//!
//! # Storage
//!
//! Backed by moka's concurrent cache with no capacity bound. The key space
//! is bounded by coin × currency × period combinations, so TTL alone keeps
//! it small. moka's own TTL is set to the same duration and only reclaims
//! memory; the authoritative freshness check is the entry's `expires_at`.

use std::sync::Arc;
use std::time::Duration;

use moka::ops::compute::Op;
use moka::sync::Cache;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use super::CacheKey;
use crate::telemetry;

/// Lifetime of a cached response.
pub const DEFAULT_TTL: Duration = Duration::from_secs(120);

/// How often the background sweeper removes expired entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Decoded response body. Shared, so hits hand out the stored object itself.
pub type Payload = Arc<serde_json::Value>;

/// A stored response with its freshness window.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: Payload,
    pub stored_at: Instant,
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory TTL cache of upstream responses.
pub struct ResponseCache {
    entries: Cache<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl ResponseCache {
    /// Create a cache with the process-wide [`DEFAULT_TTL`].
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a cache with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        let entries = Cache::builder().time_to_live(ttl).build();
        Self { entries, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a fresh payload.
    ///
    /// Returns `None` on miss. A stale entry is removed and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<Payload> {
        let entry = self.entries.get(key)?;
        let now = Instant::now();
        if !entry.is_expired_at(now) {
            return Some(entry.payload);
        }
        self.remove_if_expired(key, now);
        None
    }

    /// Full entry lookup, including timestamps. Does not check freshness.
    pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.get(key)
    }

    /// Insert or replace the payload for `key`, stamping a fresh TTL window.
    pub fn set(&self, key: CacheKey, payload: Payload) {
        let stored_at = Instant::now();
        let entry = CacheEntry {
            payload,
            stored_at,
            expires_at: stored_at + self.ttl,
        };
        self.entries.insert(key, entry);
    }

    /// Remove every entry whose `expires_at` has passed.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| CacheKey::clone(&key))
            .collect();

        let removed = expired
            .iter()
            .filter(|key| self.remove_if_expired(key, now))
            .count();
        self.entries.run_pending_tasks();

        if removed > 0 {
            debug!(removed, remaining = self.len(), "swept expired cache entries");
        }
        removed
    }

    /// Spawn a task that calls [`sweep`](Self::sweep) every `interval`.
    ///
    /// The task runs until aborted through the returned handle.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                cache.sweep();
            }
        })
    }

    /// Number of stored entries, fresh or stale.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
    }

    /// Remove `key` only if it is still expired at `now`; a concurrent
    /// fresh write survives.
    fn remove_if_expired(&self, key: &CacheKey, now: Instant) -> bool {
        let result = self
            .entries
            .entry_by_ref(key)
            .and_compute_with(|current| match current {
                Some(entry) if entry.value().is_expired_at(now) => Op::Remove,
                _ => Op::Nop,
            });
        let removed = matches!(result, moka::ops::compute::CompResult::Removed(_));
        if removed {
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(1);
        }
        removed
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

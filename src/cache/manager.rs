// Response cache - bounded, TTL-aware lookup from normalized input to reply
// Author: kelexine (https://github.com/kelexine)

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::key::derive_key;
use crate::cache::models::{CacheEntry, CacheStats, PersistedConfig, Snapshot, TopEntry};
use crate::config::CacheConfig;
use crate::metrics;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Share of entries dropped when the entry cap is reached.
const COUNT_EVICTION_FRACTION: f64 = 0.1;

/// Memory eviction stops once the footprint is at or below this share of the cap.
const MEMORY_EVICTION_TARGET: f64 = 0.8;

/// Number of entries reported in `CacheStats::top_entries`.
const TOP_ENTRIES: usize = 10;

/// Bounded response cache.
///
/// Every operation takes the same lock for its whole duration, so a `get`
/// including its hit bookkeeping is atomic with respect to concurrent
/// writers and the background sweep. No method panics or
/// returns an error; `import` reports a rejected payload with `false`.
pub struct ResponseCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// Sum of `estimated_size` over `entries`
    memory_usage: u64,
}

impl ResponseCache {
    /// Create a cache reading time from the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit time source.
    pub fn with_clock(mut config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        config.max_entries = config.max_entries.max(1);
        Self {
            config,
            clock,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// True iff a live entry exists. Removes the entry if it has expired.
    pub fn has(&self, input: &str, context: Option<&Value>) -> bool {
        let key = derive_key(input, context);
        let now = self.clock.now();
        let mut state = self.state.lock();

        match state.entries.get(&key).map(|e| e.is_expired(now, self.config.ttl_ms)) {
            Some(true) => {
                state.remove(&key);
                metrics::record_cache_expired(1);
                self.publish_size(&state);
                false
            }
            Some(false) => true,
            None => false,
        }
    }

    /// Look up a live reply, recording the hit.
    pub fn get(&self, input: &str, context: Option<&Value>) -> Option<String> {
        let key = derive_key(input, context);
        let now = self.clock.now();
        let mut state = self.state.lock();

        let expired = match state.entries.get(&key) {
            Some(entry) => entry.is_expired(now, self.config.ttl_ms),
            None => {
                metrics::record_cache_miss();
                return None;
            }
        };

        if expired {
            debug!("Cache entry {} expired on read", key);
            state.remove(&key);
            metrics::record_cache_expired(1);
            metrics::record_cache_miss();
            self.publish_size(&state);
            return None;
        }

        let entry = state.entries.get_mut(&key)?;
        entry.hit_count = entry.hit_count.saturating_add(1);
        entry.last_accessed_at = now;
        metrics::record_cache_hit();
        Some(entry.value.clone())
    }

    /// Store a reply. Overwrites any entry under the same key with fresh
    /// bookkeeping (hit count zero, new creation time).
    pub fn set(
        &self,
        input: &str,
        response: impl Into<String>,
        context: Option<&Value>,
        metadata: Option<Value>,
    ) {
        let key = derive_key(input, context);
        let now = self.clock.now();
        let mut state = self.state.lock();

        if state.entries.len() >= self.config.max_entries {
            let batch = ((state.entries.len() as f64 * COUNT_EVICTION_FRACTION).ceil() as usize).max(1);
            let evicted = state.evict_least_valuable(batch);
            debug!("Entry cap {} reached, evicted {} entries", self.config.max_entries, evicted);
            metrics::record_cache_eviction("count", evicted);
        }

        state.insert(CacheEntry::new(key, response.into(), metadata, now));
        metrics::record_cache_set();

        self.enforce_memory_limit(&mut state);
        self.publish_size(&state);
    }

    /// Bulk-insert known replies through the normal `set` path. Preloaded
    /// entries expire and get evicted like any other.
    pub fn preload<I, S, R>(&self, pairs: I)
    where
        I: IntoIterator<Item = (S, R)>,
        S: AsRef<str>,
        R: Into<String>,
    {
        let mut count = 0usize;
        for (input, response) in pairs {
            self.set(input.as_ref(), response, None, None);
            count += 1;
        }
        debug!("Preloaded {} cache entries", count);
    }

    /// Snapshot of size, footprint and popularity.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();

        let total_hits = state
            .entries
            .values()
            .fold(0u64, |acc, e| acc.saturating_add(e.hit_count));
        let denominator = total_hits.saturating_add(state.entries.len() as u64);
        let hit_rate = if denominator == 0 {
            0.0
        } else {
            total_hits as f64 / denominator as f64
        };

        let mut ranked: Vec<&CacheEntry> = state.entries.values().collect();
        ranked.sort_by_key(|e| (Reverse(e.hit_count), Reverse(e.last_accessed_at), e.key.clone()));
        let top_entries = ranked
            .into_iter()
            .take(TOP_ENTRIES)
            .map(|e| TopEntry {
                key: e.key.clone(),
                hits: e.hit_count,
                last_access: e.last_accessed_at,
            })
            .collect();

        CacheStats {
            entries: state.entries.len(),
            memory_usage_estimate: state.memory_usage,
            hit_rate,
            top_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.memory_usage = 0;
        self.publish_size(&state);
        debug!("Cache cleared");
    }

    /// Remove all entries older than the TTL. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state.lock();

        let expired: Vec<String> = state
            .entries
            .values()
            .filter(|e| e.is_expired(now, self.config.ttl_ms))
            .map(|e| e.key.clone())
            .collect();

        for key in &expired {
            state.remove(key);
        }

        if !expired.is_empty() {
            debug!("TTL sweep removed {} entries", expired.len());
            metrics::record_cache_expired(expired.len());
            self.publish_size(&state);
        }
        expired.len()
    }

    /// Serialize every entry plus the active configuration.
    pub fn export(&self) -> String {
        let state = self.state.lock();

        let mut entries: Vec<(String, CacheEntry)> = state
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let snapshot = Snapshot {
            entries,
            timestamp: self.clock.now(),
            config: PersistedConfig::from(&self.config),
        };

        serde_json::to_string(&snapshot).unwrap_or_else(|e| {
            warn!("Failed to serialize cache snapshot: {}", e);
            String::new()
        })
    }

    /// Replace the entry set with the one in `serialized`.
    ///
    /// Returns `false` and leaves the cache untouched when the payload is not
    /// a snapshot document. Entries already expired now are dropped. The
    /// snapshot's own configuration is not adopted.
    pub fn import(&self, serialized: &str) -> bool {
        let snapshot: Snapshot = match serde_json::from_str(serialized) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Rejected cache snapshot: {}", e);
                return false;
            }
        };

        let now = self.clock.now();
        let offered = snapshot.entries.len();
        let mut fresh = CacheState::default();
        for (key, mut entry) in snapshot.entries {
            if entry.is_expired(now, self.config.ttl_ms) {
                continue;
            }
            entry.key = key;
            fresh.insert(entry);
        }

        let mut state = self.state.lock();
        *state = fresh;

        if state.entries.len() > self.config.max_entries {
            let excess = state.entries.len() - self.config.max_entries;
            let evicted = state.evict_least_valuable(excess);
            metrics::record_cache_eviction("count", evicted);
        }
        self.enforce_memory_limit(&mut state);
        self.publish_size(&state);

        info!(
            "Imported {} of {} cached entries (snapshot from {})",
            state.entries.len(),
            offered,
            snapshot.timestamp.to_rfc3339()
        );
        true
    }

    /// Evict the largest entries until the footprint is back under the target.
    fn enforce_memory_limit(&self, state: &mut CacheState) {
        let limit = self.config.max_memory_bytes();
        if state.memory_usage <= limit {
            return;
        }

        let target = (limit as f64 * MEMORY_EVICTION_TARGET) as u64;
        let evicted = state.evict_largest_until(target);
        debug!(
            "Memory estimate over {} bytes, evicted {} entries (now {} bytes)",
            limit, evicted, state.memory_usage
        );
        metrics::record_cache_eviction("memory", evicted);
    }

    fn publish_size(&self, state: &CacheState) {
        metrics::update_cache_size(state.entries.len(), state.memory_usage);
    }
}

impl CacheState {
    fn insert(&mut self, entry: CacheEntry) {
        let size = entry.estimated_size();
        if let Some(previous) = self.entries.insert(entry.key.clone(), entry) {
            self.memory_usage = self.memory_usage.saturating_sub(previous.estimated_size());
        }
        self.memory_usage += size;
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let removed = self.entries.remove(key)?;
        self.memory_usage = self.memory_usage.saturating_sub(removed.estimated_size());
        Some(removed)
    }

    /// Drop up to `count` entries, least hit first, then least recently used.
    fn evict_least_valuable(&mut self, count: usize) -> usize {
        let mut ranked: Vec<(u64, DateTime<Utc>, DateTime<Utc>, String)> = self
            .entries
            .values()
            .map(|e| (e.hit_count, e.last_accessed_at, e.created_at, e.key.clone()))
            .collect();
        ranked.sort();

        let mut evicted = 0;
        for (_, _, _, key) in ranked.into_iter().take(count) {
            if self.remove(&key).is_some() {
                evicted += 1;
            }
        }
        evicted
    }

    /// Drop the largest entries until the footprint is at or below `target`.
    fn evict_largest_until(&mut self, target: u64) -> usize {
        let mut ranked: Vec<(u64, String)> = self
            .entries
            .values()
            .map(|e| (e.estimated_size(), e.key.clone()))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let mut evicted = 0;
        for (_, key) in ranked {
            if self.memory_usage <= target {
                break;
            }
            if self.remove(&key).is_some() {
                evicted += 1;
            }
        }
        evicted
    }
}

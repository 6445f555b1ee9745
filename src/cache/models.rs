//! Cache entry, statistics and snapshot models.

// Author: kelexine (https://github.com/kelexine)

use crate::config::CacheConfig;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Fixed bookkeeping cost added to every entry's footprint estimate.
pub const ENTRY_OVERHEAD_BYTES: u64 = 128;

/// A single cached reply and its bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
    /// Insertion time. Entries older than the TTL are dead.
    #[serde(rename = "timestamp", deserialize_with = "flexible_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "hits")]
    pub hit_count: u64,
    #[serde(rename = "lastAccess", deserialize_with = "flexible_timestamp")]
    pub last_accessed_at: DateTime<Utc>,
    /// Opaque annotations, stored and returned untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl CacheEntry {
    pub fn new(key: String, value: String, metadata: Option<Value>, now: DateTime<Utc>) -> Self {
        Self {
            key,
            value,
            created_at: now,
            hit_count: 0,
            last_accessed_at: now,
            metadata,
        }
    }

    /// Estimated footprint: two bytes per UTF-16 unit of key and value plus
    /// a fixed overhead.
    pub fn estimated_size(&self) -> u64 {
        let units = self.key.encode_utf16().count() + self.value.encode_utf16().count();
        2 * units as u64 + ENTRY_OVERHEAD_BYTES
    }

    /// Age in milliseconds at `now`. Negative ages (clock moved back) count as zero.
    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_milliseconds().max(0)
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl_ms: u64) -> bool {
        self.age_ms(now) as u64 > ttl_ms
    }
}

/// Point-in-time view of the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of entries currently held (live or awaiting sweep).
    pub entries: usize,
    /// Estimated footprint in bytes.
    pub memory_usage_estimate: u64,
    /// `total_hits / (total_hits + entries)`. Misses are not tracked, so this
    /// is a rough popularity ratio rather than a request-level hit rate.
    pub hit_rate: f64,
    /// Most-hit entries, highest first.
    pub top_entries: Vec<TopEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopEntry {
    pub key: String,
    pub hits: u64,
    pub last_access: DateTime<Utc>,
}

/// Cache configuration as written into snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedConfig {
    pub max_entries: usize,
    pub ttl_ms: u64,
    #[serde(rename = "maxMemoryMB")]
    pub max_memory_mb: u64,
    pub enable_compression: bool,
}

impl From<&CacheConfig> for PersistedConfig {
    fn from(config: &CacheConfig) -> Self {
        Self {
            max_entries: config.max_entries,
            ttl_ms: config.ttl_ms,
            max_memory_mb: config.max_memory_mb,
            enable_compression: config.enable_compression,
        }
    }
}

/// The `export`/`import` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// `[key, entry]` pairs.
    pub entries: Vec<(String, CacheEntry)>,
    /// Export time.
    #[serde(deserialize_with = "flexible_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub config: PersistedConfig,
}

/// Accept either an ISO-8601 string or epoch milliseconds.
fn flexible_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Iso(DateTime<Utc>),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Iso(at) => Ok(at),
        Raw::Millis(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {}", ms))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_estimated_size_grows_with_value() {
        let now = Utc::now();
        let small = CacheEntry::new("k".into(), "v".into(), None, now);
        let large = CacheEntry::new("k".into(), "v".repeat(100), None, now);
        assert!(large.estimated_size() > small.estimated_size());
        assert_eq!(small.estimated_size(), 2 * 2 + ENTRY_OVERHEAD_BYTES);
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let entry = CacheEntry::new("k".into(), "v".into(), None, now);
        assert!(!entry.is_expired(now + chrono::Duration::milliseconds(100), 100));
        assert!(entry.is_expired(now + chrono::Duration::milliseconds(101), 100));
    }

    #[test]
    fn test_entry_wire_names() {
        let now = Utc::now();
        let entry = CacheEntry::new("k".into(), "v".into(), Some(json!({"tokens": 3})), now);
        let wire = serde_json::to_value(&entry).unwrap();
        for field in ["key", "value", "timestamp", "hits", "lastAccess", "metadata"] {
            assert!(wire.get(field).is_some(), "missing {}", field);
        }
    }

    #[test]
    fn test_entry_accepts_epoch_millis() {
        let entry: CacheEntry = serde_json::from_value(json!({
            "key": "abc",
            "value": "hello",
            "timestamp": 1_700_000_000_000i64,
            "hits": 2,
            "lastAccess": "2023-11-14T22:13:20Z"
        }))
        .unwrap();
        assert_eq!(entry.created_at, entry.last_accessed_at);
        assert_eq!(entry.hit_count, 2);
        assert!(entry.metadata.is_none());
    }

    #[test]
    fn test_persisted_config_names() {
        let wire = serde_json::to_value(PersistedConfig::from(&CacheConfig::default())).unwrap();
        assert_eq!(wire["maxEntries"], 1000);
        assert_eq!(wire["ttlMs"], 1_800_000);
        assert_eq!(wire["maxMemoryMB"], 50);
        assert_eq!(wire["enableCompression"], true);
    }
}

//! Snapshot persistence for the response cache.
//!
//! The cache only produces and consumes export strings; this module carries
//! them to and from a file so a restart does not start cold. Writes go to a
//! sibling temp file first and are renamed into place, so a crash mid-write
//! leaves the previous snapshot intact.

// Author: kelexine (https://github.com/kelexine)

use crate::cache::ResponseCache;
use crate::error::{Result, ServiceError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// File-backed home for cache snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restore `cache` from the snapshot file.
    ///
    /// Returns `Ok(false)` when there is no file or the file is not a valid
    /// snapshot; the cache is left untouched in both cases.
    pub async fn load(&self, cache: &ResponseCache) -> Result<bool> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No snapshot at {}", self.path.display());
                return Ok(false);
            }
            Err(e) => {
                return Err(ServiceError::Snapshot(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if cache.import(&contents) {
            info!("Restored cache snapshot from {}", self.path.display());
            Ok(true)
        } else {
            warn!("Ignoring unreadable snapshot at {}", self.path.display());
            Ok(false)
        }
    }

    /// Write the current cache contents to the snapshot file.
    pub async fn save(&self, cache: &ResponseCache) -> Result<()> {
        let payload = cache.export();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, payload.as_bytes()).await?;
        fs::rename(&tmp, &self.path).await.map_err(|e| {
            ServiceError::Snapshot(format!("Failed to move snapshot into place: {}", e))
        })?;

        info!(
            "Saved {} cache entries to {}",
            cache.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested").join("snapshot.json"));

        let cache = ResponseCache::new(CacheConfig::default());
        cache.set("Bonjour", "Salut !", None, None);
        store.save(&cache).await.unwrap();

        let restored = ResponseCache::new(CacheConfig::default());
        assert!(store.load(&restored).await.unwrap());
        assert_eq!(restored.get("bonjour", None), Some("Salut !".to_string()));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("absent.json"));
        let cache = ResponseCache::new(CacheConfig::default());
        assert!(!store.load(&cache).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_file_leaves_cache_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, "{ truncated").unwrap();

        let cache = ResponseCache::new(CacheConfig::default());
        cache.set("keep", "me", None, None);

        let store = SnapshotStore::new(&path);
        assert!(!store.load(&cache).await.unwrap());
        assert_eq!(cache.get("keep", None), Some("me".to_string()));
    }
}

//! Two-tier artifact cache: a fixed-capacity in-memory LRU in front of an
//! optional content-addressed persistent tier.
//!
//! Shaped after `infra::cache::image_store::ImageBlobStore` (a thin typed
//! wrapper over `cacache`) for the persistent tier, and after an
//! LRU-backed image loader pattern for the memory tier.

mod key;
mod memory;
mod persistent;

pub use key::ArtifactCacheKey;
pub use memory::MemoryArtifactCache;
pub use persistent::{CacheRoot, PersistentArtifactCache};

use catalog_model::{ArtifactKind, ArtifactUrl, AssetId, Result};
use tracing::{debug, trace, warn};

/// Outcome of a [`ArtifactCache::get`] lookup.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    Hit(ArtifactUrl),
    Miss,
}

/// Composed two-tier cache for one artifact kind (thumbnail or preview).
///
/// The memory tier is always present; the persistent tier is optional so
/// tests and ephemeral deployments can run memory-only.
pub struct ArtifactCache {
    kind: ArtifactKind,
    memory: MemoryArtifactCache,
    persistent: Option<PersistentArtifactCache>,
}

impl ArtifactCache {
    pub fn new(kind: ArtifactKind, memory_capacity: usize) -> Self {
        Self {
            kind,
            memory: MemoryArtifactCache::new(memory_capacity),
            persistent: None,
        }
    }

    pub fn with_persistent(mut self, persistent: PersistentArtifactCache) -> Self {
        self.persistent = Some(persistent);
        self
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Look up `id`. Checks memory first; on a memory miss with a
    /// persistent tier configured, reads through and promotes the blob
    /// back into memory (evicting the memory LRU as needed) before
    /// returning its url.
    pub async fn get(&self, id: AssetId) -> CacheLookup {
        let key = ArtifactCacheKey::new(self.kind, id);

        if let Some(url) = self.memory.get(&key) {
            trace!(%id, kind = ?self.kind, "artifact cache memory hit");
            return CacheLookup::Hit(url);
        }

        let Some(persistent) = &self.persistent else {
            return CacheLookup::Miss;
        };

        match persistent.read(&key).await {
            Ok(Some(bytes)) => {
                debug!(%id, kind = ?self.kind, "artifact cache persistent hit, promoting");
                let url = self.memory.insert(key, bytes);
                CacheLookup::Hit(url)
            }
            Ok(None) => CacheLookup::Miss,
            Err(err) => {
                warn!(%id, kind = ?self.kind, error = %err, "persistent cache read failed");
                CacheLookup::Miss
            }
        }
    }

    /// Write-through insert. Always updates memory; best-effort persists.
    /// Returns the freshly minted url.
    pub async fn set(&self, id: AssetId, blob: Vec<u8>) -> ArtifactUrl {
        let key = ArtifactCacheKey::new(self.kind, id);
        let url = self.memory.insert(key.clone(), blob.clone());

        if let Some(persistent) = &self.persistent {
            if let Err(err) = persistent.write(&key, &blob).await {
                warn!(%id, kind = ?self.kind, error = %err, "persistent cache write failed");
            }
        }

        url
    }

    /// Remove `id` from both tiers and revoke its url.
    pub async fn delete(&self, id: AssetId) -> Result<()> {
        let key = ArtifactCacheKey::new(self.kind, id);
        self.memory.remove(&key);
        if let Some(persistent) = &self.persistent {
            persistent.remove(&key).await?;
        }
        Ok(())
    }

    /// Drop all in-memory entries and release their urls. The persistent
    /// tier is untouched.
    pub fn clear_memory(&self) {
        self.memory.clear();
    }

    #[cfg(test)]
    pub(crate) fn memory_len(&self) -> usize {
        self.memory.len()
    }
}

impl std::fmt::Debug for ArtifactCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCache")
            .field("kind", &self.kind)
            .field("has_persistent", &self.persistent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_only_round_trip() {
        let cache = ArtifactCache::new(ArtifactKind::Thumbnail, 4);
        let id = AssetId::new();
        assert!(matches!(cache.get(id).await, CacheLookup::Miss));

        let url = cache.set(id, vec![1, 2, 3]).await;
        match cache.get(id).await {
            CacheLookup::Hit(u) => assert_eq!(u, url),
            CacheLookup::Miss => panic!("expected hit after set"),
        }
    }

    #[tokio::test]
    async fn delete_releases_the_url() {
        let cache = ArtifactCache::new(ArtifactKind::Thumbnail, 4);
        let id = AssetId::new();
        cache.set(id, vec![9]).await;
        cache.delete(id).await.unwrap();
        assert!(matches!(cache.get(id).await, CacheLookup::Miss));
    }

    #[tokio::test]
    async fn clear_memory_evicts_everything_but_leaves_persistent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::new(ArtifactKind::Thumbnail, 4)
            .with_persistent(PersistentArtifactCache::new(CacheRoot::new(
                dir.path().to_path_buf(),
            )));
        let id = AssetId::new();
        cache.set(id, vec![5, 6, 7]).await;
        assert_eq!(cache.memory_len(), 1);

        cache.clear_memory();
        assert_eq!(cache.memory_len(), 0);

        // still retrievable via the persistent tier
        match cache.get(id).await {
            CacheLookup::Hit(_) => {}
            CacheLookup::Miss => panic!("persistent tier should have survived clear_memory"),
        }
    }

    #[tokio::test]
    async fn memory_capacity_evicts_lru() {
        let cache = ArtifactCache::new(ArtifactKind::Thumbnail, 2);
        let a = AssetId::new();
        let b = AssetId::new();
        let c = AssetId::new();
        cache.set(a, vec![1]).await;
        cache.set(b, vec![2]).await;
        cache.set(c, vec![3]).await;

        assert!(matches!(cache.get(a).await, CacheLookup::Miss));
        assert!(matches!(cache.get(b).await, CacheLookup::Hit(_)));
        assert!(matches!(cache.get(c).await, CacheLookup::Hit(_)));
    }
}

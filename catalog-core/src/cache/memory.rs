use std::num::NonZeroUsize;

use catalog_model::ArtifactUrl;
use lru::LruCache;
use parking_lot::Mutex;

use super::key::ArtifactCacheKey;

/// Fixed-capacity in-memory LRU of artifact blobs.
///
/// Wrapped in a `parking_lot::Mutex` so the outer [`super::ArtifactCache`]
/// can expose `&self` methods without forcing callers through `&mut`.
pub struct MemoryArtifactCache {
    inner: Mutex<LruCache<ArtifactCacheKey, Vec<u8>>>,
}

impl MemoryArtifactCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &ArtifactCacheKey) -> Option<ArtifactUrl> {
        let mut inner = self.inner.lock();
        inner.get(key).map(|_| url_for(key))
    }

    /// Insert or replace `key`, evicting the LRU entry if the cache is at
    /// capacity. Returns the newly minted url.
    pub fn insert(&self, key: ArtifactCacheKey, bytes: Vec<u8>) -> ArtifactUrl {
        let url = url_for(&key);
        self.inner.lock().put(key, bytes);
        url
    }

    pub fn remove(&self, key: &ArtifactCacheKey) {
        self.inner.lock().pop(key);
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

impl std::fmt::Debug for MemoryArtifactCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryArtifactCache")
            .field("len", &self.inner.lock().len())
            .finish()
    }
}

fn url_for(key: &ArtifactCacheKey) -> ArtifactUrl {
    ArtifactUrl::from(format!("cache://{key}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_model::{ArtifactKind, AssetId};

    #[test]
    fn eviction_drops_the_least_recently_used() {
        let cache = MemoryArtifactCache::new(2);
        let a = ArtifactCacheKey::new(ArtifactKind::Thumbnail, AssetId::new());
        let b = ArtifactCacheKey::new(ArtifactKind::Thumbnail, AssetId::new());
        let c = ArtifactCacheKey::new(ArtifactKind::Thumbnail, AssetId::new());

        cache.insert(a.clone(), vec![1]);
        cache.insert(b.clone(), vec![2]);
        // touch a so b becomes the LRU entry
        cache.get(&a);
        cache.insert(c.clone(), vec![3]);

        assert!(cache.get(&a).is_some());
        assert!(cache.get(&b).is_none());
        assert!(cache.get(&c).is_some());
    }
}

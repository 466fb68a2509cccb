use std::fmt;
use std::path::{Path, PathBuf};

use catalog_model::CatalogError;
use tracing::debug;

use super::key::ArtifactCacheKey;

/// Root directory for the persistent artifact cache. `cacache` owns
/// everything under it (content-addressed blobs plus its own index).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheRoot(PathBuf);

impl CacheRoot {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Debug for CacheRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CacheRoot").field(&self.0).finish()
    }
}

/// A thin typed wrapper over `cacache` for the persistent artifact tier.
#[derive(Clone, Debug)]
pub struct PersistentArtifactCache {
    root: CacheRoot,
}

impl PersistentArtifactCache {
    pub fn new(root: CacheRoot) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &CacheRoot {
        &self.root
    }

    /// `None` means "not present"; integrity failures and other storage
    /// errors surface as [`CatalogError`].
    pub async fn read(&self, key: &ArtifactCacheKey) -> catalog_model::Result<Option<Vec<u8>>> {
        match cacache::read(self.root.as_path(), key.as_str()).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(cacache::Error::EntryNotFound(_, _)) => Ok(None),
            Err(err) => Err(storage_error(key, err)),
        }
    }

    pub async fn write(&self, key: &ArtifactCacheKey, bytes: &[u8]) -> catalog_model::Result<()> {
        cacache::write(self.root.as_path(), key.as_str(), bytes)
            .await
            .map_err(|err| storage_error(key, err))?;
        debug!(key = %key, bytes = bytes.len(), "wrote artifact to persistent cache");
        Ok(())
    }

    pub async fn remove(&self, key: &ArtifactCacheKey) -> catalog_model::Result<()> {
        let opts = cacache::index::RemoveOpts::new().remove_fully(true);
        opts.remove(self.root.as_path(), key.as_str())
            .await
            .map_err(|err| storage_error(key, err))
    }
}

fn storage_error(key: &ArtifactCacheKey, err: cacache::Error) -> CatalogError {
    match err {
        cacache::Error::SizeMismatch(wanted, actual) => CatalogError::ThumbnailError(format!(
            "persistent cache size mismatch for {key}: wanted {wanted}, got {actual}"
        )),
        cacache::Error::IntegrityError(e) => CatalogError::ThumbnailError(format!(
            "persistent cache integrity check failed for {key}: {e}"
        )),
        other => {
            CatalogError::StorageFull(format!("persistent cache I/O error for {key}: {other}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_model::{ArtifactKind, AssetId};

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistentArtifactCache::new(CacheRoot::new(dir.path().to_path_buf()));
        let key = ArtifactCacheKey::new(ArtifactKind::Thumbnail, AssetId::new());

        store.write(&key, b"hello").await.unwrap();
        let read = store.read(&key).await.unwrap();
        assert_eq!(read, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistentArtifactCache::new(CacheRoot::new(dir.path().to_path_buf()));
        let key = ArtifactCacheKey::new(ArtifactKind::Preview, AssetId::new());
        assert_eq!(store.read(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_drops_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistentArtifactCache::new(CacheRoot::new(dir.path().to_path_buf()));
        let key = ArtifactCacheKey::new(ArtifactKind::Thumbnail, AssetId::new());
        store.write(&key, b"data").await.unwrap();
        store.remove(&key).await.unwrap();
        assert_eq!(store.read(&key).await.unwrap(), None);
    }
}

use async_trait::async_trait;
use catalog_model::{HandleKey, Result};

/// Key-value map from a handle key to an opaque persisted directory handle.
#[async_trait]
pub trait HandleStore: Send + Sync {
    async fn put(&self, key: &HandleKey, handle: Vec<u8>) -> Result<()>;
    async fn get(&self, key: &HandleKey) -> Result<Option<Vec<u8>>>;
    async fn delete(&self, key: &HandleKey) -> Result<()>;
}

use async_trait::async_trait;
use catalog_model::{AssetId, EditState, Flag, Folder, FolderId, Photo, Result};

/// Persistence port for folders, photos, and per-asset edit records.
///
/// Mirrors the tables described in the external-interfaces contract:
/// `folders` (unique on path), `photos` (composite index on
/// `(folder_id, relative_path)`, unique on `id`), and an edit-record
/// table keyed by asset id.
#[async_trait]
pub trait CatalogDatabase: Send + Sync {
    async fn upsert_folder(&self, folder: &Folder) -> Result<()>;
    async fn get_folder(&self, id: FolderId) -> Result<Option<Folder>>;
    async fn find_folder_by_path(&self, path: &str) -> Result<Option<Folder>>;
    async fn list_folders(&self, limit: usize) -> Result<Vec<Folder>>;

    async fn upsert_photo(&self, photo: &Photo) -> Result<()>;
    async fn get_photo(&self, id: AssetId) -> Result<Option<Photo>>;
    async fn find_photo_by_path(
        &self,
        folder_id: FolderId,
        relative_path: &str,
    ) -> Result<Option<Photo>>;
    async fn list_photos_by_folder(&self, folder_id: FolderId) -> Result<Vec<Photo>>;
    async fn remove_photos(&self, ids: &[AssetId]) -> Result<()>;
    async fn set_flag(&self, id: AssetId, flag: Flag) -> Result<()>;
    async fn set_flag_batch(&self, ids: &[AssetId], flag: Flag) -> Result<()>;

    async fn get_edit_state(&self, id: AssetId) -> Result<Option<EditState>>;
    async fn put_edit_state(&self, id: AssetId, state: &EditState) -> Result<()>;
}

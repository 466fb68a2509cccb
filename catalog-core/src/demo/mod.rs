//! In-memory reference adapters used by this crate's own integration
//! tests. Compiled only under the `demo` feature, in the spirit of
//! always-compiled-for-tests adapter doubles elsewhere in this codebase
//! (e.g. `InMemoryBudget`): a tokio-mutex-guarded `HashMap` behind each
//! `catalog-contracts` trait, with no real filesystem or codec work.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use catalog_contracts::database::CatalogDatabase;
use catalog_contracts::decoder::{DecodeService, DecodedImage, ResizeFilter};
use catalog_contracts::handle_store::HandleStore;
use catalog_contracts::scanner::{scan_cancelled, ByteProvider, FolderScanner, ScannedFile};
use catalog_model::{AssetId, EditState, Flag, Folder, FolderId, HandleKey, Photo, Result};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// In-memory `CatalogDatabase`: one `Mutex`-guarded table per row type,
/// matching the persisted-state shape of the real database adapter
/// without any actual persistence.
#[derive(Default, Debug)]
pub struct InMemoryDatabase {
    folders: Mutex<HashMap<FolderId, Folder>>,
    photos: Mutex<HashMap<AssetId, Photo>>,
    edits: Mutex<HashMap<AssetId, EditState>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogDatabase for InMemoryDatabase {
    async fn upsert_folder(&self, folder: &Folder) -> Result<()> {
        self.folders.lock().await.insert(folder.id, folder.clone());
        Ok(())
    }

    async fn get_folder(&self, id: FolderId) -> Result<Option<Folder>> {
        Ok(self.folders.lock().await.get(&id).cloned())
    }

    async fn find_folder_by_path(&self, path: &str) -> Result<Option<Folder>> {
        Ok(self
            .folders
            .lock()
            .await
            .values()
            .find(|f| f.path == path)
            .cloned())
    }

    async fn list_folders(&self, limit: usize) -> Result<Vec<Folder>> {
        Ok(self
            .folders
            .lock()
            .await
            .values()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn upsert_photo(&self, photo: &Photo) -> Result<()> {
        self.photos.lock().await.insert(photo.id, photo.clone());
        Ok(())
    }

    async fn get_photo(&self, id: AssetId) -> Result<Option<Photo>> {
        Ok(self.photos.lock().await.get(&id).cloned())
    }

    async fn find_photo_by_path(
        &self,
        folder_id: FolderId,
        relative_path: &str,
    ) -> Result<Option<Photo>> {
        Ok(self
            .photos
            .lock()
            .await
            .values()
            .find(|p| p.folder_id == folder_id && p.relative_path == relative_path)
            .cloned())
    }

    async fn list_photos_by_folder(&self, folder_id: FolderId) -> Result<Vec<Photo>> {
        Ok(self
            .photos
            .lock()
            .await
            .values()
            .filter(|p| p.folder_id == folder_id)
            .cloned()
            .collect())
    }

    async fn remove_photos(&self, ids: &[AssetId]) -> Result<()> {
        let mut guard = self.photos.lock().await;
        for id in ids {
            guard.remove(id);
        }
        Ok(())
    }

    async fn set_flag(&self, id: AssetId, flag: Flag) -> Result<()> {
        if let Some(photo) = self.photos.lock().await.get_mut(&id) {
            photo.flag = flag;
        }
        Ok(())
    }

    async fn set_flag_batch(&self, ids: &[AssetId], flag: Flag) -> Result<()> {
        let mut guard = self.photos.lock().await;
        for id in ids {
            if let Some(photo) = guard.get_mut(id) {
                photo.flag = flag;
            }
        }
        Ok(())
    }

    async fn get_edit_state(&self, id: AssetId) -> Result<Option<EditState>> {
        Ok(self.edits.lock().await.get(&id).cloned())
    }

    async fn put_edit_state(&self, id: AssetId, state: &EditState) -> Result<()> {
        self.edits.lock().await.insert(id, state.clone());
        Ok(())
    }
}

/// In-memory `HandleStore` over a `Mutex<HashMap>`.
#[derive(Default, Debug)]
pub struct InMemoryHandleStore {
    entries: Mutex<HashMap<HandleKey, Vec<u8>>>,
}

impl InMemoryHandleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HandleStore for InMemoryHandleStore {
    async fn put(&self, key: &HandleKey, handle: Vec<u8>) -> Result<()> {
        self.entries.lock().await.insert(key.clone(), handle);
        Ok(())
    }

    async fn get(&self, key: &HandleKey) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn delete(&self, key: &HandleKey) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Scripted `FolderScanner`: replays a fixed file list regardless of the
/// folder or recursion flag passed in, honouring cancellation between
/// yielded entries. Tests seed it with [`InMemoryScanner::set_files`]
/// between scans to simulate scan/reconcile scenarios.
#[derive(Default, Debug)]
pub struct InMemoryScanner {
    files: Mutex<Vec<ScannedFile>>,
}

impl InMemoryScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_files(&self, files: Vec<ScannedFile>) {
        *self.files.lock().await = files;
    }
}

#[async_trait]
impl FolderScanner for InMemoryScanner {
    async fn scan<'a>(
        &'a self,
        folder: &'a Folder,
        _recursive: bool,
        cancel: CancellationToken,
    ) -> Result<futures::stream::BoxStream<'a, Result<ScannedFile>>> {
        let files = self.files.lock().await.clone();
        let path = folder.path.clone();
        let stream = stream::iter(files.into_iter()).then(move |file| {
            let cancel = cancel.clone();
            let path = path.clone();
            async move {
                if cancel.is_cancelled() {
                    Err(scan_cancelled(&path))
                } else {
                    Ok(file)
                }
            }
        });
        Ok(Box::pin(stream))
    }
}

/// Build a [`ScannedFile`] whose byte-provider always returns `bytes`.
pub fn scanned_file(
    relative_path: impl Into<String>,
    filename: impl Into<String>,
    extension: impl Into<String>,
    file_size: u64,
    modified_date: chrono::DateTime<Utc>,
    bytes: Vec<u8>,
) -> ScannedFile {
    let bytes = Arc::new(bytes);
    let get_file: ByteProvider = Arc::new(move || {
        let bytes = Arc::clone(&bytes);
        Box::pin(async move { Ok((*bytes).clone()) })
            as Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send>>
    });
    ScannedFile {
        relative_path: relative_path.into(),
        filename: filename.into(),
        extension: extension.into(),
        file_size,
        modified_date,
        get_file,
    }
}

/// Synthetic `DecodeService`: fabricates a deterministic flat-color RGB
/// buffer sized to the requested edge instead of running a real codec,
/// and counts calls so tests can assert on dedup/regeneration behavior.
pub struct FakeDecodeService {
    thumbnail_calls: AtomicU64,
    preview_calls: AtomicU64,
    edit_calls: AtomicU64,
}

impl std::fmt::Debug for FakeDecodeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeDecodeService")
            .field("thumbnail_calls", &self.thumbnail_calls())
            .field("preview_calls", &self.preview_calls())
            .finish()
    }
}

impl Default for FakeDecodeService {
    fn default() -> Self {
        Self {
            thumbnail_calls: AtomicU64::new(0),
            preview_calls: AtomicU64::new(0),
            edit_calls: AtomicU64::new(0),
        }
    }
}

impl FakeDecodeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thumbnail_calls(&self) -> u64 {
        self.thumbnail_calls.load(Ordering::SeqCst)
    }

    pub fn preview_calls(&self) -> u64 {
        self.preview_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecodeService for FakeDecodeService {
    async fn decode_thumbnail(&self, bytes: &[u8], size: u32) -> Result<DecodedImage> {
        self.thumbnail_calls.fetch_add(1, Ordering::SeqCst);
        Ok(flat_image(size.max(1), bytes))
    }

    async fn decode_preview(
        &self,
        bytes: &[u8],
        _min_edge: u32,
        max_edge: u32,
        _filter: ResizeFilter,
    ) -> Result<DecodedImage> {
        self.preview_calls.fetch_add(1, Ordering::SeqCst);
        Ok(flat_image(max_edge.max(1), bytes))
    }

    async fn encode_edited_thumbnail(
        &self,
        bytes: &[u8],
        size: u32,
        edit: &EditState,
    ) -> Result<Vec<u8>> {
        self.edit_calls.fetch_add(1, Ordering::SeqCst);
        let mut blob = format!("edited:{size}:{}:", edit.0).into_bytes();
        blob.extend_from_slice(bytes);
        Ok(blob)
    }
}

fn flat_image(edge: u32, seed_bytes: &[u8]) -> DecodedImage {
    let side = edge.clamp(1, 32);
    let fill = seed_bytes.first().copied().unwrap_or(128);
    DecodedImage {
        width: side,
        height: side,
        rgb: vec![fill; (side * side * 3) as usize],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_model::Flag;

    #[tokio::test]
    async fn in_memory_database_round_trips_photos_and_folders() {
        let db = InMemoryDatabase::new();
        let folder = Folder::new("/photos", "Photos", HandleKey::new(b"/photos".to_vec()));
        db.upsert_folder(&folder).await.unwrap();
        assert_eq!(
            db.find_folder_by_path("/photos").await.unwrap().unwrap().id,
            folder.id
        );

        let photo = Photo::new(folder.id, "a.jpg", "a.jpg", "jpg", 10, Utc::now());
        db.upsert_photo(&photo).await.unwrap();
        db.set_flag(photo.id, Flag::Pick).await.unwrap();
        let stored = db.get_photo(photo.id).await.unwrap().unwrap();
        assert_eq!(stored.flag, Flag::Pick);

        db.remove_photos(&[photo.id]).await.unwrap();
        assert!(db.get_photo(photo.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scanner_replays_seeded_files_and_respects_cancellation() {
        let scanner = InMemoryScanner::new();
        let folder = Folder::new("/photos", "Photos", HandleKey::new(b"/photos".to_vec()));
        scanner
            .set_files(vec![scanned_file(
                "a.jpg",
                "a.jpg",
                "jpg",
                10,
                Utc::now(),
                vec![1, 2, 3],
            )])
            .await;

        let token = CancellationToken::new();
        let mut stream = scanner.scan(&folder, true, token.clone()).await.unwrap();
        let first = stream.next().await.unwrap();
        assert!(first.is_ok());

        token.cancel();
        scanner
            .set_files(vec![scanned_file(
                "b.jpg",
                "b.jpg",
                "jpg",
                10,
                Utc::now(),
                vec![4],
            )])
            .await;
        let mut stream = scanner.scan(&folder, true, token.clone()).await.unwrap();
        let next = stream.next().await.unwrap();
        assert!(next.is_err());
    }
}

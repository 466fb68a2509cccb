//! Catalog orchestrator (C6): owns folder/photo lifecycle, reconciles
//! folder scans with the database, and multiplexes [`crate::artifact`]
//! and [`crate::photo_processor`] completions into the typed
//! [`CatalogEvents`] sinks.
//!
//! Shaped after `scan::orchestration::runtime::supervisor` for the
//! single-scan-in-flight + `CancellationToken` shape, and after the
//! library/session managers elsewhere in this codebase for "owns a
//! `DashMap` of domain records, wires worker completions back into it" —
//! generalized here from library-session bookkeeping to photo/artifact
//! bookkeeping.
//!
//! Unlike a mutable-callback-property design, every callback here is a
//! fixed, optional, typed sink on [`CatalogEvents`], registered once at
//! construction.

use std::sync::Arc;

use catalog_contracts::database::CatalogDatabase;
use catalog_contracts::decoder::DecodeService;
use catalog_contracts::handle_store::HandleStore;
use catalog_contracts::scanner::{ByteProvider, FolderScanner, ScannedFile};
use catalog_model::photo::is_supported_extension;
use catalog_model::{
    ArtifactKind, ArtifactState, AssetId, CatalogError, EditState, Flag, Folder, FolderId,
    Photo, Priority, Result,
};
use chrono::Utc;
use dashmap::DashMap;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::artifact::{ArtifactService, ErrorSink as ArtifactErrorSink, ReadySink};
use crate::cache::ArtifactCache;
use crate::config::ArtifactServiceConfig;
use crate::events::CatalogEvents;
use crate::photo_processor::{PhotoErrorSink, PhotoProcessedSink, PhotoProcessor};

/// Coarse orchestrator status, surfaced via [`CatalogOrchestrator::state`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogState {
    /// No scan in progress; ready to accept requests.
    Idle,
    /// A `scan_folder` call is currently running.
    Scanning,
    /// The last scan (or another propagating operation) failed.
    Error(String),
}

/// Ties the scheduler/cache core to a folder scan, a metadata database,
/// and the external callbacks a viewer UI observes.
pub struct CatalogOrchestrator {
    db: Arc<dyn CatalogDatabase>,
    handle_store: Arc<dyn HandleStore>,
    scanner: Arc<dyn FolderScanner>,
    artifact_service: Arc<ArtifactService>,
    photo_processor: Arc<PhotoProcessor>,
    events: Arc<CatalogEvents>,
    photos: Arc<DashMap<AssetId, Photo>>,
    /// Byte-providers captured at scan time, keyed by asset id, so a
    /// later `request_thumbnail`/`request_preview`/`regenerate_thumbnail`
    /// call can re-read the same source file without a generic
    /// path-walk-by-id contract (not part of the external adapters).
    byte_providers: Arc<DashMap<AssetId, ByteProvider>>,
    current_folder: Mutex<Option<Folder>>,
    scan_cancel: Mutex<Option<CancellationToken>>,
    state: Mutex<CatalogState>,
}

impl CatalogOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<dyn CatalogDatabase>,
        handle_store: Arc<dyn HandleStore>,
        scanner: Arc<dyn FolderScanner>,
        decoder: Arc<dyn DecodeService>,
        config: ArtifactServiceConfig,
        events: CatalogEvents,
    ) -> Arc<Self> {
        let photos: Arc<DashMap<AssetId, Photo>> = Arc::new(DashMap::new());
        let events = Arc::new(events);

        let thumbnail_cache = Arc::new(ArtifactCache::new(
            ArtifactKind::Thumbnail,
            config.max_memory_cache_size,
        ));
        let preview_cache = Arc::new(ArtifactCache::new(
            ArtifactKind::Preview,
            config.max_preview_memory_cache_size,
        ));

        let artifact_service = {
            let photos = Arc::clone(&photos);
            let events = Arc::clone(&events);
            let on_ready: ReadySink = Arc::new(move |kind, id, url| {
                if let Some(mut photo) = photos.get_mut(&id) {
                    *photo.artifact_mut(kind) = ArtifactState::Ready { url: url.clone() };
                }
                match kind {
                    ArtifactKind::Thumbnail => events.fire_thumbnail_ready(id, url),
                    ArtifactKind::Preview => events.fire_preview_ready(id, url),
                }
            });

            let photos = Arc::clone(&photos);
            let events = Arc::clone(&events);
            let on_error: ArtifactErrorSink = Arc::new(move |kind, id, err| {
                warn!(%id, kind = ?kind, error = %err, "artifact pipeline failure");
                let message = err.to_string();
                if let Some(mut photo) = photos.get_mut(&id) {
                    *photo.artifact_mut(kind) = ArtifactState::Error { message };
                    events.fire_asset_updated(photo.clone());
                }
            });

            ArtifactService::new(
                config.clone(),
                Arc::clone(&decoder),
                Arc::clone(&thumbnail_cache),
                Arc::clone(&preview_cache),
                on_ready,
                on_error,
            )
        };

        let photo_processor = {
            let photos = Arc::clone(&photos);
            let events = Arc::clone(&events);
            let on_processed: PhotoProcessedSink = Arc::new(move |id, thumbnail_url, preview_url| {
                if let Some(mut photo) = photos.get_mut(&id) {
                    photo.thumbnail = ArtifactState::Ready { url: thumbnail_url };
                    photo.preview = ArtifactState::Ready { url: preview_url };
                }
                events.fire_photo_ready(id);
            });

            let photos = Arc::clone(&photos);
            let events = Arc::clone(&events);
            let on_error: PhotoErrorSink = Arc::new(move |id, err| {
                warn!(%id, error = %err, "photo processor failure");
                let message = err.to_string();
                if let Some(mut photo) = photos.get_mut(&id) {
                    photo.thumbnail = ArtifactState::Error {
                        message: message.clone(),
                    };
                    photo.preview = ArtifactState::Error { message };
                }
                events.fire_photo_error(id, err);
            });

            PhotoProcessor::new(
                &config,
                decoder,
                thumbnail_cache,
                preview_cache,
                on_processed,
                on_error,
            )
        };

        Arc::new(Self {
            db,
            handle_store,
            scanner,
            artifact_service,
            photo_processor,
            events,
            photos,
            byte_providers: Arc::new(DashMap::new()),
            current_folder: Mutex::new(None),
            scan_cancel: Mutex::new(None),
            state: Mutex::new(CatalogState::Idle),
        })
    }

    pub async fn state(&self) -> CatalogState {
        self.state.lock().await.clone()
    }

    pub async fn is_ready(&self) -> bool {
        matches!(*self.state.lock().await, CatalogState::Idle) && self.current_folder().await.is_some()
    }

    pub async fn current_folder(&self) -> Option<Folder> {
        self.current_folder.lock().await.clone()
    }

    /// Record a user-selected folder: persist its handle, create-or-update
    /// the folder row, and reset all per-folder in-memory state.
    pub async fn select_folder(
        &self,
        path: impl Into<String>,
        display_name: impl Into<String>,
        handle: Vec<u8>,
    ) -> Result<Folder> {
        let path = path.into();
        let handle_key = catalog_model::HandleKey::new(handle.clone());
        self.handle_store.put(&handle_key, handle).await?;

        let folder = match self.db.find_folder_by_path(&path).await? {
            Some(mut existing) => {
                existing.handle_key = handle_key;
                existing
            }
            None => Folder::new(path, display_name, handle_key),
        };
        self.db.upsert_folder(&folder).await?;

        self.reset_folder_state().await;
        *self.current_folder.lock().await = Some(folder.clone());
        Ok(folder)
    }

    pub async fn list_folders(&self, limit: usize) -> Result<Vec<Folder>> {
        self.db.list_folders(limit).await
    }

    pub async fn load_folder_by_id(&self, id: FolderId) -> Result<Option<Folder>> {
        let Some(folder) = self.db.get_folder(id).await? else {
            return Ok(None);
        };
        self.reacquire_folder(folder.clone()).await?;
        Ok(Some(folder))
    }

    /// Restore the most recently selected folder (if any) and repopulate
    /// the in-memory photo map from the database.
    pub async fn load_from_database(&self) -> Result<()> {
        if let Some(folder) = self.db.list_folders(1).await?.into_iter().next() {
            self.reacquire_folder(folder).await?;
        }
        Ok(())
    }

    async fn reacquire_folder(&self, folder: Folder) -> Result<()> {
        if self.handle_store.get(&folder.handle_key).await?.is_none() {
            return Err(CatalogError::PermissionDenied(format!(
                "no persisted handle for folder '{}'; re-selection required",
                folder.path
            )));
        }

        self.reset_folder_state().await;
        for photo in self.db.list_photos_by_folder(folder.id).await? {
            self.photos.insert(photo.id, photo);
        }
        *self.current_folder.lock().await = Some(folder);
        Ok(())
    }

    async fn reset_folder_state(&self) {
        self.cancel_scan().await;
        self.artifact_service.cancel_all();
        self.photo_processor.cancel_all();
        self.photos.clear();
        self.byte_providers.clear();
    }

    pub async fn scan_folder(&self, recursive: bool) -> Result<()> {
        let folder = self
            .current_folder()
            .await
            .ok_or_else(|| CatalogError::FolderNotFound("no folder selected".into()))?;

        {
            let mut state = self.state.lock().await;
            if matches!(*state, CatalogState::Scanning) {
                return Err(already_scanning());
            }
            *state = CatalogState::Scanning;
        }

        let cancel = CancellationToken::new();
        *self.scan_cancel.lock().await = Some(cancel.clone());

        let result = self.run_scan(&folder, recursive, cancel).await;
        self.scan_cancel.lock().await.take();

        match result {
            Ok(()) => {
                let mut folder = folder;
                folder.last_scan_date = Some(Utc::now());
                self.db.upsert_folder(&folder).await?;
                *self.current_folder.lock().await = Some(folder);
                *self.state.lock().await = CatalogState::Idle;
                Ok(())
            }
            Err(err) if err.is_soft_cancellation() => {
                info!("scan cancelled, returning to ready state");
                *self.state.lock().await = CatalogState::Idle;
                Ok(())
            }
            Err(err) => {
                *self.state.lock().await = CatalogState::Error(err.to_string());
                Err(err)
            }
        }
    }

    /// Replay the last scan against the current folder, recursively.
    pub async fn rescan_folder(&self) -> Result<()> {
        self.scan_folder(true).await
    }

    pub async fn cancel_scan(&self) {
        if let Some(token) = self.scan_cancel.lock().await.take() {
            token.cancel();
        }
    }

    async fn run_scan(
        &self,
        folder: &Folder,
        recursive: bool,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut stream = self.scanner.scan(folder, recursive, cancel).await?;
        while let Some(scanned) = stream.next().await {
            let scanned = scanned?;
            if !is_supported_extension(&scanned.extension) {
                continue;
            }
            self.reconcile_file(folder.id, scanned).await?;
        }
        Ok(())
    }

    async fn reconcile_file(&self, folder_id: FolderId, file: ScannedFile) -> Result<()> {
        match self
            .db
            .find_photo_by_path(folder_id, &file.relative_path)
            .await?
        {
            None => {
                let photo = Photo::new(
                    folder_id,
                    file.relative_path.clone(),
                    file.filename.clone(),
                    file.extension.clone(),
                    file.file_size,
                    file.modified_date,
                );
                self.db.upsert_photo(&photo).await?;
                self.byte_providers.insert(photo.id, Arc::clone(&file.get_file));
                self.photos.insert(photo.id, photo.clone());
                self.events.fire_assets_added(vec![photo.clone()]);
                self.photo_processor.enqueue(photo.id, file.get_file);
            }
            Some(mut existing) => {
                if file.modified_date > existing.modified_date {
                    existing.modified_date = file.modified_date;
                    existing.file_size = file.file_size;
                    existing.thumbnail = ArtifactState::Pending;
                    existing.preview = ArtifactState::Pending;
                    self.db.upsert_photo(&existing).await?;
                    self.byte_providers
                        .insert(existing.id, Arc::clone(&file.get_file));
                    self.photos.insert(existing.id, existing.clone());
                    self.photo_processor.enqueue(existing.id, file.get_file);
                }
                // unmodified hit: leave the database row and in-memory
                // photo state (including any live artifact urls) alone
            }
        }
        Ok(())
    }

    pub fn get_asset(&self, id: AssetId) -> Option<Photo> {
        self.photos.get(&id).map(|entry| entry.clone())
    }

    pub fn get_assets(&self) -> Vec<Photo> {
        self.photos.iter().map(|entry| entry.clone()).collect()
    }

    pub async fn set_flag(&self, id: AssetId, flag: Flag) -> Result<()> {
        self.db.set_flag(id, flag).await?;
        if let Some(mut photo) = self.photos.get_mut(&id) {
            photo.flag = flag;
            self.events.fire_asset_updated(photo.clone());
        }
        Ok(())
    }

    pub async fn set_flag_batch(&self, ids: &[AssetId], flag: Flag) -> Result<()> {
        self.db.set_flag_batch(ids, flag).await?;
        for id in ids {
            if let Some(mut photo) = self.photos.get_mut(id) {
                photo.flag = flag;
                self.events.fire_asset_updated(photo.clone());
            }
        }
        Ok(())
    }

    pub async fn remove_assets(&self, ids: &[AssetId]) -> Result<()> {
        self.db.remove_photos(ids).await?;
        for id in ids {
            self.photos.remove(id);
            self.byte_providers.remove(id);
        }
        Ok(())
    }

    pub async fn request_thumbnail(&self, id: AssetId, priority: Priority) -> Result<()> {
        let bytes = self.byte_provider_for(id)?;
        self.mark_loading(id, ArtifactKind::Thumbnail);
        self.artifact_service.request_thumbnail(id, bytes, priority).await;
        Ok(())
    }

    pub async fn request_preview(&self, id: AssetId, priority: Priority) -> Result<()> {
        let bytes = self.byte_provider_for(id)?;
        self.mark_loading(id, ArtifactKind::Preview);
        self.artifact_service.request_preview(id, bytes, priority).await;
        Ok(())
    }

    pub fn update_thumbnail_priority(&self, id: AssetId, priority: Priority) -> bool {
        self.artifact_service.update_thumbnail_priority(id, priority)
    }

    pub fn update_preview_priority(&self, id: AssetId, priority: Priority) -> bool {
        self.artifact_service.update_preview_priority(id, priority)
    }

    pub fn cancel_background_requests(&self) -> usize {
        self.artifact_service.cancel_background_requests()
    }

    pub async fn regenerate_thumbnail(&self, id: AssetId, edit: EditState) -> Result<()> {
        let bytes = self.byte_provider_for(id)?;
        self.mark_loading(id, ArtifactKind::Thumbnail);
        self.artifact_service
            .regenerate_thumbnail(id, bytes, edit, Priority::Background)
            .await;
        Ok(())
    }

    fn byte_provider_for(&self, id: AssetId) -> Result<ByteProvider> {
        self.byte_providers
            .get(&id)
            .map(|entry| Arc::clone(&entry))
            .ok_or_else(|| {
                CatalogError::FolderNotFound(format!("no source bytes recorded for asset {id}"))
            })
    }

    fn mark_loading(&self, id: AssetId, kind: ArtifactKind) {
        if let Some(mut photo) = self.photos.get_mut(&id) {
            if photo.artifact(kind).is_pending() {
                *photo.artifact_mut(kind) = ArtifactState::Loading;
            }
        }
    }

    pub async fn destroy(&self) {
        self.reset_folder_state().await;
        *self.current_folder.lock().await = None;
        *self.state.lock().await = CatalogState::Idle;
    }
}

impl std::fmt::Debug for CatalogOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogOrchestrator")
            .field("photos_tracked", &self.photos.len())
            .finish_non_exhaustive()
    }
}

fn already_scanning() -> CatalogError {
    CatalogError::unknown(std::io::Error::new(
        std::io::ErrorKind::Other,
        "a scan is already running",
    ))
}

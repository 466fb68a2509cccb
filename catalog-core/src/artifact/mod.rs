//! Artifact service (C4): two independent queue processors — thumbnail
//! and preview — each paired with its own two-tier cache, plus
//! generation-based staleness enforcement for edited re-encodes.
//!
//! Shaped after `infra::media::image_service::ImageService` (decode/encode
//! adapter behind a cache, fronted by request dedup), generalized from a
//! TMDB image downloader to a RAW decode + resize pipeline running
//! against the contracts in [`catalog_contracts`].

pub(crate) mod encode;

use std::sync::Arc;

use catalog_contracts::decoder::{DecodeService, ResizeFilter};
use catalog_contracts::scanner::ByteProvider;
use catalog_model::{ArtifactKind, ArtifactUrl, AssetId, CatalogError, EditState, Generation, Result};
use dashmap::DashMap;
use tracing::warn;

use crate::cache::{ArtifactCache, CacheLookup};
use crate::config::ArtifactServiceConfig;
use crate::processor::{JobHandle, QueueProcessor, RequestDecision, RunFn};

/// Fired when a worker finishes a job whose generation is still current.
pub type ReadySink = Arc<dyn Fn(ArtifactKind, AssetId, ArtifactUrl) + Send + Sync>;
/// Fired when a worker's task body returns an error.
pub type ErrorSink = Arc<dyn Fn(ArtifactKind, AssetId, CatalogError) + Send + Sync>;

struct ThumbnailJob {
    bytes: ByteProvider,
    edit: Option<EditState>,
    generation: Generation,
}

struct PreviewJob {
    bytes: ByteProvider,
    generation: Generation,
}

/// Wraps the thumbnail and preview scheduling lanes behind one external
/// contract. See spec §4.4 for the operation table this mirrors.
pub struct ArtifactService {
    config: ArtifactServiceConfig,
    thumbnail_processor: Arc<QueueProcessor<ThumbnailJob>>,
    preview_processor: Arc<QueueProcessor<PreviewJob>>,
    thumbnail_cache: Arc<ArtifactCache>,
    preview_cache: Arc<ArtifactCache>,
    generations: Arc<DashMap<AssetId, Generation>>,
    on_ready: ReadySink,
}

impl ArtifactService {
    pub fn new(
        config: ArtifactServiceConfig,
        decoder: Arc<dyn DecodeService>,
        thumbnail_cache: Arc<ArtifactCache>,
        preview_cache: Arc<ArtifactCache>,
        on_ready: ReadySink,
        on_error: ErrorSink,
    ) -> Arc<Self> {
        let generations = Arc::new(DashMap::new());

        let thumbnail_processor = {
            let decoder = Arc::clone(&decoder);
            let cache = Arc::clone(&thumbnail_cache);
            let generations = Arc::clone(&generations);
            let on_ready = Arc::clone(&on_ready);
            let on_error = Arc::clone(&on_error);
            let size = config.thumbnail_size;

            let run: RunFn<ThumbnailJob> = Arc::new(move |id, job, handle| {
                let decoder = Arc::clone(&decoder);
                let cache = Arc::clone(&cache);
                let generations = Arc::clone(&generations);
                let on_ready = Arc::clone(&on_ready);
                let on_error = Arc::clone(&on_error);
                Box::pin(async move {
                    run_thumbnail_job(
                        id, job, size, &*decoder, &cache, &generations, handle, &on_ready,
                        &on_error,
                    )
                    .await
                })
            });
            QueueProcessor::new(config.max_queue_size, config.concurrency, run)
        };

        let preview_processor = {
            let decoder = Arc::clone(&decoder);
            let cache = Arc::clone(&preview_cache);
            let generations = Arc::clone(&generations);
            let on_ready = Arc::clone(&on_ready);
            let on_error = Arc::clone(&on_error);
            let (min_edge, max_edge) = config.preview_size;

            let run: RunFn<PreviewJob> = Arc::new(move |id, job, handle| {
                let decoder = Arc::clone(&decoder);
                let cache = Arc::clone(&cache);
                let generations = Arc::clone(&generations);
                let on_ready = Arc::clone(&on_ready);
                let on_error = Arc::clone(&on_error);
                Box::pin(async move {
                    run_preview_job(
                        id, job, min_edge, max_edge, &*decoder, &cache, &generations, handle,
                        &on_ready, &on_error,
                    )
                    .await
                })
            });
            QueueProcessor::new(config.max_queue_size, config.concurrency, run)
        };

        Arc::new(Self {
            config,
            thumbnail_processor,
            preview_processor,
            thumbnail_cache,
            preview_cache,
            generations,
            on_ready,
        })
    }

    fn generation_for(&self, id: AssetId) -> Generation {
        self.generations
            .get(&id)
            .map(|g| *g)
            .unwrap_or_else(Generation::initial)
    }

    pub async fn request_thumbnail(&self, id: AssetId, bytes: ByteProvider, priority: catalog_model::Priority) {
        if self.thumbnail_processor.request(id, priority) == RequestDecision::AlreadyActive {
            return;
        }
        if let CacheLookup::Hit(url) = self.thumbnail_cache.get(id).await {
            // Cache hit short-circuit (spec §8 S4): no enqueue, and the
            // ready callback fires synchronously from the probe itself.
            (self.on_ready)(ArtifactKind::Thumbnail, id, url);
            return;
        }
        let generation = self.generation_for(id);
        self.thumbnail_processor.enqueue(
            id,
            priority,
            ThumbnailJob {
                bytes,
                edit: None,
                generation,
            },
        );
    }

    pub async fn request_preview(&self, id: AssetId, bytes: ByteProvider, priority: catalog_model::Priority) {
        if self.preview_processor.request(id, priority) == RequestDecision::AlreadyActive {
            return;
        }
        if let CacheLookup::Hit(url) = self.preview_cache.get(id).await {
            (self.on_ready)(ArtifactKind::Preview, id, url);
            return;
        }
        let generation = self.generation_for(id);
        self.preview_processor
            .enqueue(id, priority, PreviewJob { bytes, generation });
    }

    pub fn update_thumbnail_priority(&self, id: AssetId, priority: catalog_model::Priority) -> bool {
        self.thumbnail_processor.update_priority(id, priority)
    }

    pub fn update_preview_priority(&self, id: AssetId, priority: catalog_model::Priority) -> bool {
        self.preview_processor.update_priority(id, priority)
    }

    pub fn cancel(&self, id: AssetId) -> bool {
        self.thumbnail_processor.cancel(id)
    }

    pub fn cancel_preview(&self, id: AssetId) -> bool {
        self.preview_processor.cancel(id)
    }

    pub fn cancel_all_thumbnails(&self) {
        self.thumbnail_processor.cancel_all();
    }

    pub fn cancel_all_previews(&self) {
        self.preview_processor.cancel_all();
    }

    pub fn cancel_all(&self) {
        self.cancel_all_thumbnails();
        self.cancel_all_previews();
    }

    /// Cancel every queued BACKGROUND job across both lanes. Returns the
    /// combined count removed.
    pub fn cancel_background_requests(&self) -> usize {
        self.thumbnail_processor.cancel_background_requests()
            + self.preview_processor.cancel_background_requests()
    }

    /// Bump `id`'s generation, cancel any pending thumbnail work, and
    /// best-effort delete its cached thumbnail. Cache-tier errors are
    /// swallowed per the propagation policy.
    pub async fn invalidate_thumbnail(&self, id: AssetId) {
        self.generations
            .entry(id)
            .and_modify(|g| *g = g.next())
            .or_insert_with(|| Generation::initial().next());
        self.thumbnail_processor.cancel(id);
        if let Err(err) = self.thumbnail_cache.delete(id).await {
            warn!(%id, error = %err, "failed to delete invalidated thumbnail from cache");
        }
    }

    /// Invalidate, then enqueue a regenerate job stamped with the fresh
    /// generation and the supplied edit state, bypassing the normal
    /// dedup/cache-probe path since this is a forced re-render.
    pub async fn regenerate_thumbnail(
        &self,
        id: AssetId,
        bytes: ByteProvider,
        edit: EditState,
        priority: catalog_model::Priority,
    ) {
        self.invalidate_thumbnail(id).await;
        let generation = self.generation_for(id);
        self.thumbnail_processor.enqueue(
            id,
            priority,
            ThumbnailJob {
                bytes,
                edit: Some(edit),
                generation,
            },
        );
    }

    pub fn config(&self) -> &ArtifactServiceConfig {
        &self.config
    }
}

impl std::fmt::Debug for ArtifactService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactService")
            .field("config", &self.config)
            .field("thumbnail_queue_size", &self.thumbnail_processor.size())
            .field("preview_queue_size", &self.preview_processor.size())
            .field("generations_tracked", &self.generations.len())
            .finish()
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_thumbnail_job(
    id: AssetId,
    job: ThumbnailJob,
    size: u32,
    decoder: &dyn DecodeService,
    cache: &ArtifactCache,
    generations: &DashMap<AssetId, Generation>,
    handle: JobHandle,
    on_ready: &ReadySink,
    on_error: &ErrorSink,
) -> Result<()> {
    let ThumbnailJob {
        bytes,
        edit,
        generation,
    } = job;

    let outcome = decode_and_encode_thumbnail(decoder, &bytes, edit.as_ref(), size).await;

    let current = generations
        .get(&id)
        .map(|g| *g)
        .unwrap_or_else(Generation::initial);
    if current != generation {
        // superseded by a newer edit or invalidation; discard silently
        handle.mark_idle();
        return Ok(());
    }

    match outcome {
        Ok(blob) => {
            let url = cache.set(id, blob).await;
            handle.mark_idle();
            on_ready(ArtifactKind::Thumbnail, id, url);
        }
        Err(err) => {
            handle.mark_idle();
            on_error(ArtifactKind::Thumbnail, id, err);
        }
    }
    Ok(())
}

async fn decode_and_encode_thumbnail(
    decoder: &dyn DecodeService,
    bytes: &ByteProvider,
    edit: Option<&EditState>,
    size: u32,
) -> Result<Vec<u8>> {
    let raw = bytes().await?;
    if let Some(edit) = edit {
        decoder.encode_edited_thumbnail(&raw, size, edit).await
    } else {
        let decoded = decoder.decode_thumbnail(&raw, size).await?;
        encode::encode_rgb_jpeg(decoded.width, decoded.height, &decoded.rgb, 85)
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_preview_job(
    id: AssetId,
    job: PreviewJob,
    min_edge: u32,
    max_edge: u32,
    decoder: &dyn DecodeService,
    cache: &ArtifactCache,
    generations: &DashMap<AssetId, Generation>,
    handle: JobHandle,
    on_ready: &ReadySink,
    on_error: &ErrorSink,
) -> Result<()> {
    let PreviewJob { bytes, generation } = job;

    let outcome = decode_and_encode_preview(decoder, &bytes, min_edge, max_edge).await;

    let current = generations
        .get(&id)
        .map(|g| *g)
        .unwrap_or_else(Generation::initial);
    if current != generation {
        handle.mark_idle();
        return Ok(());
    }

    match outcome {
        Ok(blob) => {
            let url = cache.set(id, blob).await;
            handle.mark_idle();
            on_ready(ArtifactKind::Preview, id, url);
        }
        Err(err) => {
            handle.mark_idle();
            on_error(ArtifactKind::Preview, id, err);
        }
    }
    Ok(())
}

async fn decode_and_encode_preview(
    decoder: &dyn DecodeService,
    bytes: &ByteProvider,
    min_edge: u32,
    max_edge: u32,
) -> Result<Vec<u8>> {
    let raw = bytes().await?;
    let decoded = decoder
        .decode_preview(&raw, min_edge, max_edge, ResizeFilter::Lanczos3)
        .await?;
    encode::encode_rgb_jpeg(decoded.width, decoded.height, &decoded.rgb, 90)
}

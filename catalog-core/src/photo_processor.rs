//! Photo processor (C5): a FIFO, bounded-concurrency alternative to the
//! artifact service, used during bulk ingest before the UI has a
//! viewport signal to prioritise against.
//!
//! Shaped after the `scan::orchestration::actors::pipeline::tmdb`
//! concurrent-fetch pattern (`tokio::join!` over independent calls for one
//! subject) for "decode once, produce both artifacts concurrently", and
//! after [`crate::processor::QueueProcessor`] for the admission/active-set/
//! semaphore plumbing — simplified to a single FIFO lane since priority
//! ordering is meaningless without a viewport.

use std::collections::VecDeque;
use std::sync::Arc;

use catalog_contracts::decoder::{DecodeService, ResizeFilter};
use catalog_contracts::scanner::ByteProvider;
use catalog_model::{ArtifactUrl, AssetId, CatalogError, Result};
use dashmap::DashSet;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::artifact::encode::encode_rgb_jpeg;
use crate::cache::ArtifactCache;
use crate::config::ArtifactServiceConfig;

/// One ingest job: decode `bytes` once and produce both artifacts.
struct Job {
    asset_id: AssetId,
    bytes: ByteProvider,
}

/// Fired once per job, on success, with both finished urls already
/// written to their respective caches (the `onPhotoProcessed` event).
pub type PhotoProcessedSink = Arc<dyn Fn(AssetId, ArtifactUrl, ArtifactUrl) + Send + Sync>;
/// Fired once per job on failure; the job is consumed either way.
pub type PhotoErrorSink = Arc<dyn Fn(AssetId, CatalogError) + Send + Sync>;

/// Bounded FIFO pipeline that decodes each photo exactly once and emits
/// both its thumbnail and preview from that single decode pass.
pub struct PhotoProcessor {
    queue: Mutex<VecDeque<Job>>,
    active: Arc<DashSet<AssetId>>,
    semaphore: Arc<Semaphore>,
    decoder: Arc<dyn DecodeService>,
    thumbnail_cache: Arc<ArtifactCache>,
    preview_cache: Arc<ArtifactCache>,
    thumbnail_size: u32,
    preview_size: (u32, u32),
    on_processed: PhotoProcessedSink,
    on_error: PhotoErrorSink,
}

impl PhotoProcessor {
    pub fn new(
        config: &ArtifactServiceConfig,
        decoder: Arc<dyn DecodeService>,
        thumbnail_cache: Arc<ArtifactCache>,
        preview_cache: Arc<ArtifactCache>,
        on_processed: PhotoProcessedSink,
        on_error: PhotoErrorSink,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            active: Arc::new(DashSet::new()),
            semaphore: Arc::new(Semaphore::new(config.concurrency.max(1))),
            decoder,
            thumbnail_cache,
            preview_cache,
            thumbnail_size: config.thumbnail_size,
            preview_size: config.preview_size,
            on_processed,
            on_error,
        })
    }

    pub fn is_active(&self, id: AssetId) -> bool {
        self.active.contains(&id)
    }

    pub fn size(&self) -> usize {
        self.queue.lock().len()
    }

    /// Admit a job. Returns `false` without enqueuing if `id` is already
    /// queued or executing.
    pub fn enqueue(self: &Arc<Self>, asset_id: AssetId, bytes: ByteProvider) -> bool {
        if !self.active.insert(asset_id) {
            return false;
        }
        self.queue.lock().push_back(Job { asset_id, bytes });
        self.dispatch();
        true
    }

    /// Empty the queue. Does not abort jobs already executing.
    pub fn cancel_all(&self) {
        let mut queue = self.queue.lock();
        for job in queue.drain(..) {
            self.active.remove(&job.asset_id);
        }
    }

    fn dispatch(self: &Arc<Self>) {
        loop {
            let permit = match Arc::clone(&self.semaphore).try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let job = self.queue.lock().pop_front();
            let Some(job) = job else {
                return;
            };

            let this = Arc::clone(self);
            tokio::spawn(async move {
                let id = job.asset_id;
                match this.run(job).await {
                    Ok(()) => {}
                    Err(err) => {
                        warn!(%id, error = %err, "photo processor job failed");
                        (this.on_error)(id, err);
                    }
                }
                this.active.remove(&id);
                drop(permit);
                this.dispatch();
            });
        }
    }

    async fn run(&self, job: Job) -> Result<()> {
        let Job { asset_id, bytes } = job;
        let raw = bytes().await?;

        let (thumbnail_res, preview_res) = tokio::join!(
            self.decode_thumbnail(&raw),
            self.decode_preview(&raw),
        );
        let thumbnail_blob = thumbnail_res?;
        let preview_blob = preview_res?;

        let (thumbnail_url, preview_url) = tokio::join!(
            self.thumbnail_cache.set(asset_id, thumbnail_blob),
            self.preview_cache.set(asset_id, preview_blob),
        );

        (self.on_processed)(asset_id, thumbnail_url, preview_url);
        Ok(())
    }

    async fn decode_thumbnail(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let decoded = self.decoder.decode_thumbnail(raw, self.thumbnail_size).await?;
        encode_rgb_jpeg(decoded.width, decoded.height, &decoded.rgb, 85)
    }

    async fn decode_preview(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let (min_edge, max_edge) = self.preview_size;
        let decoded = self
            .decoder
            .decode_preview(raw, min_edge, max_edge, ResizeFilter::Lanczos3)
            .await?;
        encode_rgb_jpeg(decoded.width, decoded.height, &decoded.rgb, 90)
    }
}

impl std::fmt::Debug for PhotoProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoProcessor")
            .field("queued", &self.size())
            .field("active", &self.active.len())
            .field("thumbnail_size", &self.thumbnail_size)
            .field("preview_size", &self.preview_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ArtifactCache;
    use catalog_contracts::decoder::DecodedImage;
    use catalog_model::ArtifactKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedDecoder {
        width: u32,
        height: u32,
    }

    #[async_trait::async_trait]
    impl DecodeService for FixedDecoder {
        async fn decode_thumbnail(&self, _bytes: &[u8], _size: u32) -> Result<DecodedImage> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(DecodedImage {
                width: self.width,
                height: self.height,
                rgb: vec![128u8; (self.width * self.height * 3) as usize],
            })
        }

        async fn decode_preview(
            &self,
            _bytes: &[u8],
            _min_edge: u32,
            _max_edge: u32,
            _filter: ResizeFilter,
        ) -> Result<DecodedImage> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(DecodedImage {
                width: self.width,
                height: self.height,
                rgb: vec![64u8; (self.width * self.height * 3) as usize],
            })
        }

        async fn encode_edited_thumbnail(
            &self,
            _bytes: &[u8],
            _size: u32,
            _edit: &catalog_model::EditState,
        ) -> Result<Vec<u8>> {
            unimplemented!("photo processor never takes the edit path")
        }
    }

    fn bytes_provider() -> ByteProvider {
        Arc::new(|| Box::pin(async { Ok(vec![0u8; 16]) }))
    }

    #[tokio::test]
    async fn scenario_s5_fifo_with_bounded_concurrency() {
        let decoder: Arc<dyn DecodeService> = Arc::new(FixedDecoder { width: 4, height: 4 });
        let thumbnail_cache = Arc::new(ArtifactCache::new(ArtifactKind::Thumbnail, 10));
        let preview_cache = Arc::new(ArtifactCache::new(ArtifactKind::Preview, 10));
        let processed = Arc::new(AtomicUsize::new(0));
        let processed2 = Arc::clone(&processed);
        let errors = Arc::new(AtomicUsize::new(0));

        let config = ArtifactServiceConfig {
            concurrency: 2,
            ..Default::default()
        };
        let processor = PhotoProcessor::new(
            &config,
            decoder,
            thumbnail_cache,
            preview_cache,
            Arc::new(move |_id, _thumb_url, _preview_url| {
                processed2.fetch_add(1, Ordering::SeqCst);
            }),
            Arc::new(move |_id, _err| {
                errors.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let j1 = AssetId::new();
        let j2 = AssetId::new();
        let j3 = AssetId::new();
        assert!(processor.enqueue(j1, bytes_provider()));
        assert!(processor.enqueue(j2, bytes_provider()));
        assert!(processor.enqueue(j3, bytes_provider()));
        assert_eq!(processor.size(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        // each job emits exactly one combined `onPhotoProcessed` event
        assert_eq!(processed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn duplicate_enqueue_is_rejected_while_active() {
        let decoder: Arc<dyn DecodeService> = Arc::new(FixedDecoder { width: 2, height: 2 });
        let thumbnail_cache = Arc::new(ArtifactCache::new(ArtifactKind::Thumbnail, 10));
        let preview_cache = Arc::new(ArtifactCache::new(ArtifactKind::Preview, 10));
        let config = ArtifactServiceConfig {
            concurrency: 1,
            ..Default::default()
        };
        let processor = PhotoProcessor::new(
            &config,
            decoder,
            thumbnail_cache,
            preview_cache,
            Arc::new(|_, _, _| {}),
            Arc::new(|_, _| {}),
        );

        let id = AssetId::new();
        assert!(processor.enqueue(id, bytes_provider()));
        assert!(!processor.enqueue(id, bytes_provider()));
    }

    #[tokio::test]
    async fn cancel_all_empties_queue_without_aborting_inflight() {
        let decoder: Arc<dyn DecodeService> = Arc::new(FixedDecoder { width: 2, height: 2 });
        let thumbnail_cache = Arc::new(ArtifactCache::new(ArtifactKind::Thumbnail, 10));
        let preview_cache = Arc::new(ArtifactCache::new(ArtifactKind::Preview, 10));
        let processed = Arc::new(AtomicUsize::new(0));
        let processed2 = Arc::clone(&processed);
        let config = ArtifactServiceConfig {
            concurrency: 1,
            ..Default::default()
        };
        let processor = PhotoProcessor::new(
            &config,
            decoder,
            thumbnail_cache,
            preview_cache,
            Arc::new(move |_, _, _| {
                processed2.fetch_add(1, Ordering::SeqCst);
            }),
            Arc::new(|_, _| {}),
        );

        let inflight = AssetId::new();
        processor.enqueue(inflight, bytes_provider());
        for _ in 0..3 {
            processor.enqueue(AssetId::new(), bytes_provider());
        }
        processor.cancel_all();
        assert_eq!(processor.size(), 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        // the in-flight job still ran to completion
        assert_eq!(processed.load(Ordering::SeqCst), 1);
    }
}

//! Tunables for the artifact service, in the style of the
//! `scan::orchestration::config` structs: a plain serde-derived struct
//! with a `Default` impl carrying the documented defaults.

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::artifact::ArtifactService`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactServiceConfig {
    /// Square edge length, in pixels, for generated thumbnails.
    pub thumbnail_size: u32,
    /// `(min_edge, max_edge)` bounds for generated previews.
    pub preview_size: (u32, u32),
    /// Capacity of each priority queue (thumbnail and preview are
    /// tracked independently).
    pub max_queue_size: usize,
    /// In-memory LRU capacity for the thumbnail cache.
    pub max_memory_cache_size: usize,
    /// In-memory LRU capacity for the preview cache (smaller, since
    /// previews are much larger blobs).
    pub max_preview_memory_cache_size: usize,
    /// Worker pool size for both the thumbnail and preview queue
    /// processors. Defaults to host hardware parallelism, clamped to
    /// `[1, 8]`.
    pub concurrency: usize,
}

impl Default for ArtifactServiceConfig {
    fn default() -> Self {
        Self {
            thumbnail_size: 256,
            preview_size: (1280, 2560),
            max_queue_size: 200,
            max_memory_cache_size: 150,
            max_preview_memory_cache_size: 20,
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    num_cpus::get().clamp(1, 8)
}

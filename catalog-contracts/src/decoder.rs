use async_trait::async_trait;
use catalog_model::{EditState, Result};

/// Decoded pixel buffer: top-down, 3 bytes per pixel (RGB).
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// Resampling filter used when producing a preview's longest edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    Lanczos3,
}

impl Default for ResizeFilter {
    fn default() -> Self {
        Self::Lanczos3
    }
}

/// Decode and resize entry points used by the artifact pipelines.
///
/// Implementations are expected to run CPU-bound decode/resize work on a
/// dedicated pool and simply return the finished buffer here; the
/// scheduler keeps up to `concurrency` outstanding calls in flight per
/// processor but does not itself spawn decode threads.
#[async_trait]
pub trait DecodeService: Send + Sync {
    /// Decode `bytes` and resize so the longest edge is `size` pixels.
    async fn decode_thumbnail(&self, bytes: &[u8], size: u32) -> Result<DecodedImage>;

    /// Decode `bytes` and resize so the longest edge is within
    /// `[min_edge, max_edge]`.
    async fn decode_preview(
        &self,
        bytes: &[u8],
        min_edge: u32,
        max_edge: u32,
        filter: ResizeFilter,
    ) -> Result<DecodedImage>;

    /// Apply `edit` to the source bytes and return an already-encoded
    /// thumbnail blob (the edited-thumbnail path skips the plain decode).
    async fn encode_edited_thumbnail(
        &self,
        bytes: &[u8],
        size: u32,
        edit: &EditState,
    ) -> Result<Vec<u8>>;
}

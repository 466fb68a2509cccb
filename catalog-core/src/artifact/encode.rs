//! RGB8 -> JPEG encoding for decoded artifact pixels.
//!
//! Shaped after `encode_thumbnail_jpeg_rgb24` (episode thumbnail
//! generation): a plain `image::codecs::jpeg::JpegEncoder` write into an
//! in-memory buffer. Unlike that version this does no cropping or
//! resizing — the decode adapter is responsible for delivering pixels
//! already at the requested dimensions.

use std::io::Cursor;

use catalog_model::{CatalogError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;

pub fn encode_rgb_jpeg(width: u32, height: u32, rgb: &[u8], quality: u8) -> Result<Vec<u8>> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(3))
        .ok_or_else(|| {
            CatalogError::ThumbnailError("RGB buffer size overflow while encoding".into())
        })?;

    if rgb.len() != expected {
        return Err(CatalogError::ThumbnailError(format!(
            "invalid RGB8 buffer length: got {}, expected {} ({width}x{height}x3)",
            rgb.len(),
            expected
        )));
    }

    let mut out = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder
        .encode(rgb, width, height, ColorType::Rgb8.into())
        .map_err(|err| CatalogError::ThumbnailError(format!("jpeg encode failed: {err}")))?;

    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_a_valid_jpeg() {
        let width = 16;
        let height = 8;
        let rgb = vec![128u8; (width * height * 3) as usize];
        let encoded = encode_rgb_jpeg(width, height, &rgb, 85).unwrap();
        assert!(encoded.starts_with(&[0xFF, 0xD8, 0xFF]));
    }

    #[test]
    fn rejects_mismatched_buffer_length() {
        let err = encode_rgb_jpeg(16, 8, &[0u8; 10], 85).unwrap_err();
        assert!(matches!(err, CatalogError::ThumbnailError(_)));
    }
}

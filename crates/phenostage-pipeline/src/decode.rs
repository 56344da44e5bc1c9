//! Image decoding and canonical resizing.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces a
//! 512x512 RGB image. Resizing is exact (not aspect-preserving, not
//! cropped) with bilinear filtering, so every downstream threshold
//! sees the same resolution regardless of the source photo's size.
//!
//! This is the first step in the pipeline: raw bytes in, `RgbImage` out.

use image::RgbImage;
use image::imageops::FilterType;

use crate::types::{CANONICAL_SIZE, PipelineError};

/// Decode raw image bytes and resize to the canonical 512x512 grid.
///
/// Supports whatever formats the `image` crate is compiled with
/// (PNG, JPEG, BMP, WebP here). The resize stretches to exactly
/// 512x512 using bilinear (triangle) interpolation; aspect ratio is
/// deliberately not preserved, since coverage bands are calibrated per
/// canonical frame, not per source geometry.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
#[must_use = "returns the decoded canonical image"]
pub fn decode_and_resize(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    let resized = img.resize_exact(CANONICAL_SIZE, CANONICAL_SIZE, FilterType::Triangle);
    Ok(resized.to_rgb8())
}

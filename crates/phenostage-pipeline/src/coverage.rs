//! Coverage calculation: reduce image + mask to one scalar.
//!
//! The ratio measures how much of the frame the plant *occupies* —
//! plant-marked pixels over total pixels. It is explicitly not a
//! measure of how green the masked pixels are: the stage bands in the
//! crop profiles are calibrated against occupied area, and conflating
//! area with greenness was an early failure mode of this heuristic.
//!
//! This is step 4 in the pipeline.

use image::RgbImage;

use crate::mask::PlantMask;

/// Plant coverage ratio in `[0, 1]`: plant pixels over total pixels.
///
/// Pure function of its inputs; computing it twice on the same image
/// and mask yields the identical value. A zero-pixel image yields 0.0
/// (unreachable after the canonical resize, but never divides by zero).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn coverage_ratio(image: &RgbImage, mask: &PlantMask) -> f64 {
    let total = u64::from(image.width()) * u64::from(image.height());
    if total == 0 {
        return 0.0;
    }
    mask.plant_pixels() as f64 / total as f64
}

//! Confidence estimation: three independent quality signals averaged
//! into one bounded score.
//!
//! - **Stage certainty** — how centered the coverage ratio sits within
//!   its matched band; peaks at the band midpoint, zero at the edges.
//! - **Plant visibility** — how trustworthy the mask is at this
//!   coverage level; moderate coverage measures most reliably, very
//!   sparse or near-total coverage less so.
//! - **Image sharpness** — Laplacian variance of the grayscale image;
//!   blurry photos segment poorly.
//!
//! Each signal is on a 0-100 scale. The final confidence is their
//! unweighted average, floored to an integer and hard-capped at
//! [`MAX_CONFIDENCE`] — this estimator never claims full certainty.
//! The bucketed signals are plain ordered `(upper bound, score)`
//! tables so the cutoffs stay independently testable and tunable.
//!
//! This is step 6, the last stage of the pipeline.

use image::GrayImage;

use crate::mask::PlantMask;
use crate::profile::Band;

/// Hard cap on the combined confidence score.
pub const MAX_CONFIDENCE: u8 = 95;

/// Visibility score per mask-fraction range: first entry whose upper
/// bound exceeds the fraction wins; beyond the table, the fallback.
const VISIBILITY_BUCKETS: [(f64, f64); 4] =
    [(0.05, 40.0), (0.15, 70.0), (0.60, 90.0), (0.85, 70.0)];
const VISIBILITY_FALLBACK: f64 = 50.0;

/// Sharpness score per Laplacian-variance range.
const SHARPNESS_BUCKETS: [(f64, f64); 3] = [(50.0, 40.0), (100.0, 65.0), (200.0, 80.0)];
const SHARPNESS_FALLBACK: f64 = 95.0;

/// How centered the coverage ratio is within its matched band, 0-100.
///
/// 100 exactly at the band midpoint, decaying linearly to 0 at both
/// edges. A degenerate zero-width band (the unknown-crop case) scores
/// 0, so confidence for unknown crops rests entirely on visibility
/// and sharpness.
#[must_use]
pub fn stage_certainty(ratio: f64, band: Band) -> f64 {
    let half_width = band.half_width();
    if half_width <= 0.0 {
        return 0.0;
    }
    let offset = (ratio - band.midpoint()).abs();
    (1.0 - offset / half_width).max(0.0) * 100.0
}

/// Visibility score for a plant mask, 0-100.
#[must_use]
pub fn plant_visibility(mask: &PlantMask) -> f64 {
    visibility_score(mask.plant_fraction())
}

/// Bucketed visibility score for a plant fraction.
#[must_use]
pub fn visibility_score(fraction: f64) -> f64 {
    bucket_score(fraction, &VISIBILITY_BUCKETS, VISIBILITY_FALLBACK)
}

/// Bucketed sharpness score for a Laplacian variance.
#[must_use]
pub fn sharpness_score(variance: f64) -> f64 {
    bucket_score(variance, &SHARPNESS_BUCKETS, SHARPNESS_FALLBACK)
}

/// First bucket whose upper bound exceeds `value`, else the fallback.
fn bucket_score(value: f64, buckets: &[(f64, f64)], fallback: f64) -> f64 {
    buckets
        .iter()
        .find(|&&(upper, _)| value < upper)
        .map_or(fallback, |&(_, score)| score)
}

/// Variance of the 3x3 Laplacian response over the interior of a gray
/// image.
///
/// The standard blur metric: second-derivative edge response collapses
/// on defocused images, so low variance means a soft photo. Uses the
/// 4-neighbor kernel `[0,1,0; 1,-4,1; 0,1,0]`; images smaller than 3x3
/// have no interior and score 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn laplacian_variance(image: &GrayImage) -> f64 {
    let (w, h) = image.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }

    let mut sum = 0.0_f64;
    let mut sum_sq = 0.0_f64;
    let mut count = 0_u64;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let at = |dx: u32, dy: u32| f64::from(image.get_pixel(x + dx - 1, y + dy - 1).0[0]);
            let response = at(1, 0) + at(1, 2) + at(0, 1) + at(2, 1) - 4.0 * at(1, 1);
            sum += response;
            sum_sq += response * response;
            count += 1;
        }
    }

    let mean = sum / count as f64;
    let variance = sum_sq / count as f64 - mean * mean;
    variance.max(0.0)
}

/// Combine the three signals into the final confidence score.
///
/// Unweighted average, floored to an integer and capped at
/// [`MAX_CONFIDENCE`]. Always lands in `[0, 95]`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn combine(stage_certainty: f64, visibility: f64, sharpness: f64) -> u8 {
    let average = (stage_certainty + visibility + sharpness) / 3.0;
    average.clamp(0.0, f64::from(MAX_CONFIDENCE)).floor() as u8
}

//! Plant mask extraction: color-range segmentation plus morphological
//! cleanup.
//!
//! A pixel counts as "plant" when its hue sits in a fixed green band
//! (yellow-green through cyan-green) with saturation and value floors
//! that exclude near-black shadow and near-gray soil. The raw mask is
//! then cleaned with a morphological opening (drops speckle noise)
//! followed by a closing (fills small holes in foliage), both with a
//! fixed 5x5 square structuring element.
//!
//! The parameters are deliberately crop-agnostic: foliage color is
//! close enough across the supported crops at the canonical resolution
//! that one band serves them all.
//!
//! This is step 3 in the pipeline, applied to the normalized image.

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Inclusive lower hue bound of the foliage band, degrees.
const HUE_MIN: f32 = 70.0;

/// Exclusive upper hue bound of the foliage band, degrees.
const HUE_MAX: f32 = 170.0;

/// Saturation floor; below this, soil and gray shadow dominate.
const SAT_MIN: u8 = 40;

/// Value floor; below this, pixels are too dark to attribute a color.
const VAL_MIN: u8 = 40;

/// Structuring-element radius: 2 gives the 5x5 square used by both
/// morphological passes.
const KERNEL_RADIUS: u8 = 2;

/// Binary plant/background classification of one image.
///
/// Wraps a single-channel grid where plant pixels are 255 and
/// background pixels are 0. Owned by the pipeline invocation that
/// produced it and dropped once coverage and visibility are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlantMask(GrayImage);

impl PlantMask {
    /// Number of pixels marked as plant.
    #[must_use]
    pub fn plant_pixels(&self) -> u64 {
        self.0.pixels().filter(|p| p.0[0] > 0).count() as u64
    }

    /// Total number of pixels in the mask.
    #[must_use]
    pub fn total_pixels(&self) -> u64 {
        u64::from(self.0.width()) * u64::from(self.0.height())
    }

    /// Fraction of mask pixels marked as plant, in `[0, 1]`.
    /// Zero for an empty mask.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn plant_fraction(&self) -> f64 {
        let total = self.total_pixels();
        if total == 0 {
            return 0.0;
        }
        self.plant_pixels() as f64 / total as f64
    }

    /// Whether the pixel at `(x, y)` is marked as plant.
    #[must_use]
    pub fn is_plant(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y).0[0] > 0
    }

    /// The underlying single-channel image (0 = background,
    /// 255 = plant), e.g. for writing debug artifacts.
    #[must_use]
    pub fn as_image(&self) -> &GrayImage {
        &self.0
    }
}

/// Segment plant-colored pixels from the background.
///
/// Fixed-parameter heuristic: HSV green-band test, then opening and
/// closing with a 5x5 square element. Output dimensions equal input
/// dimensions.
#[must_use = "returns the plant mask"]
pub fn extract_plant_mask(image: &RgbImage) -> PlantMask {
    let raw = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        if is_plant_color(r, g, b) {
            Luma([255])
        } else {
            Luma([0])
        }
    });

    let opened = morphology::open(&raw, Norm::LInf, KERNEL_RADIUS);
    let closed = morphology::close(&opened, Norm::LInf, KERNEL_RADIUS);
    PlantMask(closed)
}

/// Color-range test for a single pixel: hue in `[HUE_MIN, HUE_MAX)`
/// with saturation and value at or above their floors.
fn is_plant_color(r: u8, g: u8, b: u8) -> bool {
    let (hue, sat, val) = rgb_to_hsv(r, g, b);
    (HUE_MIN..HUE_MAX).contains(&hue) && sat >= SAT_MIN && val >= VAL_MIN
}

/// RGB to HSV: hue in degrees `[0, 360)`, saturation and value on the
/// 8-bit scale.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, u8, u8) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = f32::from(max - min);

    let sat = if max == 0 {
        0
    } else {
        (255.0 * delta / f32::from(max)).round() as u8
    };

    if delta == 0.0 {
        return (0.0, sat, max);
    }

    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let mut hue = if max == r {
        60.0 * ((gf - bf) / delta)
    } else if max == g {
        60.0 * ((bf - rf) / delta) + 120.0
    } else {
        60.0 * ((rf - gf) / delta) + 240.0
    };
    if hue < 0.0 {
        hue += 360.0;
    }

    (hue, sat, max)
}

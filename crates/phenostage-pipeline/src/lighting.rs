//! Lighting normalization via contrast-limited adaptive histogram
//! equalization (CLAHE).
//!
//! Field photos arrive with vignetting, hard shadows, and uneven sun
//! exposure that shift brightness without shifting hue. To keep the
//! downstream color segmentation robust, the image is split into a
//! luminance/chrominance representation (BT.601 YCbCr), the luma plane
//! is equalized tile-by-tile with a fixed clip limit, and the chroma
//! planes pass through untouched before conversion back to RGB.
//!
//! Raising or lowering luma shifts all three RGB channels by the same
//! amount, so channel *differences* — and therefore hue — survive the
//! round trip exactly (up to rounding at the 8-bit boundary).
//!
//! This is step 2 in the pipeline, between decoding and mask extraction.

use image::{GrayImage, Luma, Rgb, RgbImage};

/// Number of equalization tiles per image side.
const TILE_GRID: u32 = 8;

/// Histogram clip limit, as a multiple of the uniform bin height.
const CLIP_LIMIT: f32 = 2.0;

/// Extract the BT.601 luma plane of an RGB image.
///
/// Shared by the normalizer (equalization input) and the sharpness
/// estimator (Laplacian input), so both see the same grayscale.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn luma_plane(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let luma = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Normalize lighting without disturbing hue.
///
/// Applies CLAHE (8x8 tile grid, clip limit 2.0, bilinear blending
/// between neighboring tile mappings) to the luma channel only, then
/// reconstructs RGB from the equalized luma and the original chroma.
/// Output dimensions always equal input dimensions.
#[must_use = "returns the normalized image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn normalize_lighting(image: &RgbImage) -> RgbImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }

    // Chroma is kept in floating point so the round trip does not
    // quantize hue.
    let mut cb = vec![0.0_f32; (w as usize) * (h as usize)];
    let mut cr = vec![0.0_f32; (w as usize) * (h as usize)];
    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
        let idx = y as usize * w as usize + x as usize;
        cb[idx] = -0.168_736 * rf - 0.331_264 * gf + 0.5 * bf;
        cr[idx] = 0.5 * rf - 0.418_688 * gf - 0.081_312 * bf;
    }

    let equalized = clahe(&luma_plane(image), TILE_GRID, CLIP_LIMIT);

    RgbImage::from_fn(w, h, |x, y| {
        let idx = y as usize * w as usize + x as usize;
        let luma = f32::from(equalized.get_pixel(x, y).0[0]);
        let r = 1.402_f32.mul_add(cr[idx], luma);
        let g = luma - 0.344_136 * cb[idx] - 0.714_136 * cr[idx];
        let b = 1.772_f32.mul_add(cb[idx], luma);
        Rgb([
            r.round().clamp(0.0, 255.0) as u8,
            g.round().clamp(0.0, 255.0) as u8,
            b.round().clamp(0.0, 255.0) as u8,
        ])
    })
}

/// Contrast-limited adaptive histogram equalization of a gray plane.
///
/// The image is divided into a `grid` x `grid` tile lattice (the last
/// tile per row/column absorbs any remainder pixels). Each tile gets a
/// clipped-histogram remapping table; each pixel is remapped by
/// bilinearly blending the tables of the four tiles whose centers
/// surround it, which avoids visible tile seams.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clahe(luma: &GrayImage, grid: u32, clip_limit: f32) -> GrayImage {
    let (w, h) = luma.dimensions();
    let grid_x = grid.clamp(1, w.max(1));
    let grid_y = grid.clamp(1, h.max(1));
    let tile_w = w / grid_x;
    let tile_h = h / grid_y;

    let mut luts = vec![[0_u8; 256]; (grid_x as usize) * (grid_y as usize)];
    for ty in 0..grid_y {
        for tx in 0..grid_x {
            let x0 = tx * tile_w;
            let x1 = if tx + 1 == grid_x { w } else { x0 + tile_w };
            let y0 = ty * tile_h;
            let y1 = if ty + 1 == grid_y { h } else { y0 + tile_h };
            luts[(ty * grid_x + tx) as usize] = tile_lut(luma, (x0, x1), (y0, y1), clip_limit);
        }
    }

    GrayImage::from_fn(w, h, |x, y| {
        let gx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
        let gy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let (tx0, tx1, fx) = interp_nodes(gx, grid_x);
        let (ty0, ty1, fy) = interp_nodes(gy, grid_y);

        let v = luma.get_pixel(x, y).0[0] as usize;
        let at = |tx: u32, ty: u32| f32::from(luts[(ty * grid_x + tx) as usize][v]);

        let top = lerp(at(tx0, ty0), at(tx1, ty0), fx);
        let bottom = lerp(at(tx0, ty1), at(tx1, ty1), fx);
        Luma([lerp(top, bottom, fy).round().clamp(0.0, 255.0) as u8])
    })
}

/// Interpolation nodes along one axis: the two tile indices bracketing
/// grid coordinate `g` and the blend weight toward the second. Pixels
/// beyond the outermost tile centers clamp to the border tile.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn interp_nodes(g: f32, tiles: u32) -> (u32, u32, f32) {
    let max = tiles - 1;
    if g <= 0.0 {
        return (0, 0, 0.0);
    }
    if g >= max as f32 {
        return (max, max, 0.0);
    }
    let i0 = g.floor() as u32;
    (i0, i0 + 1, g - g.floor())
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    (b - a).mul_add(t, a)
}

/// Build the clipped-histogram remapping table for one tile.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn tile_lut(luma: &GrayImage, (x0, x1): (u32, u32), (y0, y1): (u32, u32), clip_limit: f32) -> [u8; 256] {
    let mut hist = [0_u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[luma.get_pixel(x, y).0[0] as usize] += 1;
        }
    }

    let npix = (x1 - x0) * (y1 - y0);
    if npix == 0 {
        return std::array::from_fn(|i| i as u8);
    }

    // Clip each bin at `clip_limit` times the uniform bin height and
    // redistribute the excess evenly (remainder goes one per bin from
    // the bottom).
    let limit = (clip_limit * npix as f32 / 256.0).max(1.0) as u32;
    let mut excess = 0_u32;
    for count in &mut hist {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }
    let per_bin = excess / 256;
    let leftover = (excess % 256) as usize;
    for (i, count) in hist.iter_mut().enumerate() {
        *count += per_bin + u32::from(i < leftover);
    }

    // Cumulative mapping scaled to the full 8-bit range.
    let mut lut = [0_u8; 256];
    let mut cdf = 0_u32;
    let scale = 255.0 / npix as f32;
    for (i, &count) in hist.iter().enumerate() {
        cdf += count;
        lut[i] = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

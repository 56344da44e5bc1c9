//! phenostage-pipeline: Pure growth-stage estimation pipeline (sans-IO).
//!
//! Estimates a plant's growth stage from a single photo and a declared
//! crop type through:
//! decode/resize -> lighting normalization -> plant mask extraction ->
//! coverage calculation -> stage classification -> confidence estimation.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. File and terminal
//! interaction lives in `phenostage-cli`.
//!
//! The pipeline is a deterministic, rule-based heuristic with fixed
//! numeric thresholds per crop — not a trained classifier. Every
//! invocation is an independent, synchronous function composition with
//! no shared mutable state, so concurrent predictions need no locking.

pub mod confidence;
pub mod coverage;
pub mod decode;
pub mod lighting;
pub mod mask;
pub mod profile;
pub mod types;

pub use mask::PlantMask;
pub use profile::{BUILTIN_PROFILES, Band, CropProfile, Stage, StageMatch};
pub use types::{CANONICAL_SIZE, PipelineError, PredictionResult, PredictionTrace};

/// Run the full growth-stage estimation pipeline.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and a crop name, and
/// produces a [`PredictionResult`] with the stage label, the coverage
/// ratio rounded to 3 decimals, and a confidence score in `[0, 95]`.
///
/// An unknown crop name is not an error: coverage is still computed
/// and reported, the stage is [`Stage::Unknown`], and confidence rests
/// on the visibility and sharpness signals alone.
///
/// # Pipeline steps
///
/// 1. Decode and resize to the canonical 512x512 grid
/// 2. Lighting normalization (tiled CLAHE on luma only)
/// 3. Plant mask extraction (HSV green band + morphological cleanup)
/// 4. Coverage ratio (plant pixels / total pixels)
/// 5. Stage classification against the crop's ordered bands
/// 6. Confidence estimation (certainty + visibility + sharpness)
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the bytes are not a
/// decodable image. Decode failure short-circuits: no later stage runs.
pub fn predict(image_bytes: &[u8], crop: &str) -> Result<PredictionResult, PipelineError> {
    Ok(predict_staged(image_bytes, crop)?.result)
}

/// Run the pipeline and keep intermediate stage outputs.
///
/// Same computation as [`predict`], but the returned
/// [`PredictionTrace`] also carries the normalized image, the plant
/// mask, the matched band, and the individual confidence sub-scores,
/// for debug tooling.
///
/// # Errors
///
/// Same as [`predict`].
pub fn predict_staged(image_bytes: &[u8], crop: &str) -> Result<PredictionTrace, PipelineError> {
    // 1. Decode and resize to the canonical grid.
    let decoded = decode::decode_and_resize(image_bytes)?;

    // 2. Lighting normalization.
    let normalized = lighting::normalize_lighting(&decoded);

    // 3. Plant mask extraction.
    let mask = mask::extract_plant_mask(&normalized);

    // 4. Coverage ratio.
    let ratio = coverage::coverage_ratio(&normalized, &mask);

    // 5. Stage classification.
    let matched = profile::classify(ratio, crop);

    // 6. Confidence estimation.
    let stage_certainty = confidence::stage_certainty(ratio, matched.band);
    let visibility = confidence::plant_visibility(&mask);
    let sharpness_variance = confidence::laplacian_variance(&lighting::luma_plane(&normalized));
    let sharpness = confidence::sharpness_score(sharpness_variance);
    let conf = confidence::combine(stage_certainty, visibility, sharpness);

    let result = PredictionResult {
        crop: crop.to_owned(),
        growth_stage: matched.stage,
        green_ratio: round3(ratio),
        confidence: conf,
    };

    Ok(PredictionTrace {
        normalized,
        mask,
        band: matched.band,
        stage_certainty,
        visibility,
        sharpness_variance,
        sharpness,
        result,
    })
}

/// Round a ratio to 3 decimals for reporting.
fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// Helper: encode an RGB image as a PNG byte buffer.
    fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    /// Synthetic field photo: a centered green square covering roughly
    /// `fraction` of the frame, on a brown soil background.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn green_square_png(fraction: f64) -> Vec<u8> {
        let size = 512_u32;
        let side = (f64::from(size * size) * fraction).sqrt().floor() as u32;
        let start = (size - side) / 2;
        let end = start + side;
        let img = RgbImage::from_fn(size, size, |x, y| {
            if (start..end).contains(&x) && (start..end).contains(&y) {
                Rgb([20, 200, 20])
            } else {
                Rgb([60, 30, 30])
            }
        });
        encode_png(&img)
    }

    #[test]
    fn empty_input_is_invalid_image() {
        let result = predict(&[], "Tomato");
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_input_is_invalid_image() {
        let result = predict(&[0xDE, 0xAD, 0xBE, 0xEF], "Tomato");
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn all_background_scene_is_seedling() {
        // No green anywhere: coverage 0.0 lands in the lowest band.
        let img = RgbImage::from_pixel(512, 512, Rgb([60, 30, 30]));
        let result = predict(&encode_png(&img), "Tomato").unwrap();
        assert_eq!(result.growth_stage, Stage::Seedling);
        assert!(result.green_ratio.abs() < f64::EPSILON);
        assert!(result.confidence <= confidence::MAX_CONFIDENCE);
    }

    #[test]
    fn half_covered_tomato_is_flowering() {
        let result = predict(&green_square_png(0.50), "Tomato").unwrap();
        assert_eq!(result.growth_stage, Stage::Flowering);
        assert!(
            (0.45..0.60).contains(&result.green_ratio),
            "coverage {} outside the Flowering band",
            result.green_ratio,
        );
    }

    #[test]
    fn stage_tracks_coverage_across_bands() {
        for (fraction, expected) in [
            (0.10, Stage::Seedling),
            (0.35, Stage::Vegetative),
            (0.52, Stage::Flowering),
            (0.67, Stage::Fruiting),
            (0.90, Stage::Maturity),
        ] {
            let result = predict(&green_square_png(fraction), "Tomato").unwrap();
            assert_eq!(
                result.growth_stage, expected,
                "fraction {fraction} gave ratio {} and stage {}",
                result.green_ratio, result.growth_stage,
            );
        }
    }

    #[test]
    fn fully_green_scene_is_maturity() {
        // Coverage 1.0 lies outside every half-open band; the closed
        // top boundary folds it into Maturity for any known crop.
        let img = RgbImage::from_pixel(512, 512, Rgb([20, 200, 20]));
        let bytes = encode_png(&img);
        for crop in ["Tomato", "Wheat", "Rice"] {
            let result = predict(&bytes, crop).unwrap();
            assert_eq!(result.growth_stage, Stage::Maturity, "crop {crop}");
            assert!((result.green_ratio - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn unknown_crop_reports_unknown_stage_not_error() {
        let trace = predict_staged(&green_square_png(0.50), "Onion").unwrap();
        assert_eq!(trace.result.growth_stage, Stage::Unknown);
        assert_eq!(trace.band, Band::EMPTY);
        // Certainty is degenerate; confidence rests on the other two
        // signals, still capped.
        assert!(trace.stage_certainty.abs() < f64::EPSILON);
        assert!(trace.result.confidence <= confidence::MAX_CONFIDENCE);
        let expected = confidence::combine(0.0, trace.visibility, trace.sharpness);
        assert_eq!(trace.result.confidence, expected);
    }

    #[test]
    fn prediction_is_deterministic() {
        let bytes = green_square_png(0.35);
        let first = predict(&bytes, "Rice").unwrap();
        let second = predict(&bytes, "Rice").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn trace_exposes_intermediate_stages() {
        let trace = predict_staged(&green_square_png(0.50), "Tomato").unwrap();
        assert_eq!(trace.normalized.dimensions(), (CANONICAL_SIZE, CANONICAL_SIZE));
        assert_eq!(
            trace.mask.as_image().dimensions(),
            (CANONICAL_SIZE, CANONICAL_SIZE),
        );
        assert!(trace.mask.plant_pixels() > 0);
        assert_eq!(trace.band, Band::new(0.45, 0.60));
        assert!(trace.sharpness_variance >= 0.0);
    }

    #[test]
    fn reported_ratio_is_rounded_to_three_decimals() {
        let result = predict(&green_square_png(0.50), "Tomato").unwrap();
        let rescaled = result.green_ratio * 1000.0;
        assert!(
            (rescaled - rescaled.round()).abs() < 1e-9,
            "ratio {} not rounded to 3 decimals",
            result.green_ratio,
        );
    }

    #[test]
    fn confidence_peaks_when_ratio_sits_mid_band() {
        // 0.52 sits near the Flowering midpoint (0.525); 0.46 hugs the
        // band edge. Same scene quality otherwise, so the mid-band shot
        // must be at least as confident.
        let centered = predict(&green_square_png(0.52), "Tomato").unwrap();
        let edge = predict(&green_square_png(0.46), "Tomato").unwrap();
        assert!(
            centered.confidence >= edge.confidence,
            "mid-band {} < edge {}",
            centered.confidence,
            edge.confidence,
        );
    }
}

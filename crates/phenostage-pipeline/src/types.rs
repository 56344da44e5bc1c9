//! Shared types for the phenostage estimation pipeline.

use serde::{Deserialize, Serialize};

use crate::mask::PlantMask;
use crate::profile::{Band, Stage};

/// Re-export `RgbImage` so downstream crates can reference decoded
/// pixel data without depending on `image` directly.
pub use image::RgbImage;

/// Re-export `GrayImage` for mask and luma plane access.
pub use image::GrayImage;

/// Canonical post-decode resolution (pixels per side).
///
/// Every stage after the decoder operates on this fixed square
/// resolution; all color thresholds and coverage bands are calibrated
/// against it.
pub const CANONICAL_SIZE: u32 = 512;

/// Result of a single growth-stage prediction.
///
/// Created once per request and immutable after construction. The
/// serialized field names are the wire shape consumed by front ends:
/// `crop`, `growth_stage`, `green_ratio`, `confidence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Crop name, echoed from the request.
    pub crop: String,

    /// Estimated growth stage (`Unknown` when the crop is not in the
    /// profile table or the ratio matched no band).
    pub growth_stage: Stage,

    /// Plant coverage ratio, rounded to 3 decimals.
    pub green_ratio: f64,

    /// Confidence score, an integer in `[0, 95]`. The estimator never
    /// claims full certainty.
    pub confidence: u8,
}

/// Result of running the pipeline with intermediate stage outputs
/// preserved.
///
/// Debug surface for CLI tooling: lets callers save the normalized
/// image and plant mask and inspect the individual confidence signals
/// without re-running any stage.
///
/// Not serializable: raster buffers stay in memory and are dropped
/// with the trace; persisting debug artifacts is the caller's concern.
#[derive(Debug, Clone)]
pub struct PredictionTrace {
    /// Stage 2 output: lighting-normalized 512x512 image.
    pub normalized: RgbImage,
    /// Stage 3 output: binary plant mask.
    pub mask: PlantMask,
    /// Band the coverage ratio was matched against.
    pub band: Band,
    /// Stage-certainty sub-score (0-100).
    pub stage_certainty: f64,
    /// Plant-visibility sub-score (0-100).
    pub visibility: f64,
    /// Raw Laplacian variance behind the sharpness sub-score.
    pub sharpness_variance: f64,
    /// Image-sharpness sub-score (0-100).
    pub sharpness: f64,
    /// The final prediction.
    pub result: PredictionResult,
}

/// Errors that can occur during pipeline processing.
///
/// Both variants mean the input bytes could not be turned into a
/// usable image; they are terminal for the request and are detected
/// immediately after decode, before any later stage runs.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image (corrupt data or unsupported
    /// format).
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn error_empty_input_display() {
        let err = PipelineError::EmptyInput;
        assert_eq!(err.to_string(), "input image data is empty");
    }

    #[test]
    fn prediction_result_serializes_to_wire_shape() {
        let result = PredictionResult {
            crop: "Tomato".to_owned(),
            growth_stage: Stage::Flowering,
            green_ratio: 0.512,
            confidence: 83,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["crop"], "Tomato");
        assert_eq!(json["growth_stage"], "Flowering");
        assert!((json["green_ratio"].as_f64().unwrap() - 0.512).abs() < 1e-12);
        assert_eq!(json["confidence"], 83);
    }

    #[test]
    fn prediction_result_serde_round_trip() {
        let result = PredictionResult {
            crop: "Rice".to_owned(),
            growth_stage: Stage::Unknown,
            green_ratio: 0.0,
            confidence: 36,
        };
        let json = serde_json::to_string(&result).unwrap();
        let deserialized: PredictionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, deserialized);
    }
}

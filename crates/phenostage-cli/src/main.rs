//! Run the growth-stage pipeline on a photo and print the result as
//! JSON, with optional debug artifacts.
//!
//! The pipeline itself is pure and lives in `phenostage-pipeline`;
//! this binary is the thin I/O wrapper around it: file reading,
//! artifact writing, logging, and serialization.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::info;
use phenostage_pipeline::{PredictionTrace, predict_staged, profile};

/// Estimate a plant's growth stage from a single photo.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Input photo (PNG, JPEG, BMP, or WebP).
    input: PathBuf,

    /// Declared crop type (e.g. "Tomato", "Wheat", "Rice").
    #[arg(short, long)]
    crop: String,

    /// Write debug artifacts (mask.png, normalized.png) into this
    /// directory.
    #[arg(long, value_name = "DIR")]
    debug_dir: Option<PathBuf>,

    /// Log the per-band range check and the confidence sub-scores.
    #[arg(long)]
    staged: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(&args.input)?;
    info!("read {} bytes from {}", bytes.len(), args.input.display());

    let trace = predict_staged(&bytes, &args.crop)?;

    if args.staged {
        log_stage_breakdown(&args.crop, &trace);
    }

    if let Some(dir) = &args.debug_dir {
        write_debug_artifacts(dir, &trace)?;
    }

    println!("{}", serde_json::to_string_pretty(&trace.result)?);
    Ok(())
}

/// Log which band the coverage ratio fell into and how each confidence
/// signal contributed.
fn log_stage_breakdown(crop: &str, trace: &PredictionTrace) {
    let ratio = trace.result.green_ratio;
    match profile::find_profile(crop) {
        Some(profile) => {
            for &(stage, band) in profile.stages {
                info!(
                    "band check {stage}: [{}, {}) -> {}",
                    band.low,
                    band.high,
                    band.contains(ratio),
                );
            }
        }
        None => info!("crop {crop} not in the profile table"),
    }
    info!(
        "confidence signals: certainty {:.1}, visibility {:.1}, sharpness {:.1} \
         (laplacian variance {:.1})",
        trace.stage_certainty, trace.visibility, trace.sharpness, trace.sharpness_variance,
    );
}

/// Save the plant mask and the lighting-normalized image for visual
/// inspection.
fn write_debug_artifacts(
    dir: &Path,
    trace: &PredictionTrace,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;

    let mask_path = dir.join("mask.png");
    trace.mask.as_image().save(&mask_path)?;
    info!("wrote {}", mask_path.display());

    let normalized_path = dir.join("normalized.png");
    trace.normalized.save(&normalized_path)?;
    info!("wrote {}", normalized_path.display());

    Ok(())
}

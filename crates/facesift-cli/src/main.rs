use anyhow::{bail, Context, Result};
use clap::Parser;
use facesift_core::{ArcFaceEncoder, ScrfdDetector};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod runner;

#[derive(Parser)]
#[command(
    name = "facesift",
    about = "Batch face detection and target-face matching over a directory of images"
)]
struct Cli {
    /// Directory of images to process (.png, .jpg, .jpeg)
    #[arg(long)]
    input_dir: PathBuf,
    /// Directory annotated copies are written into (created if missing)
    #[arg(long)]
    export_dir: PathBuf,
    /// Reference face image; detected faces are flagged when they match it
    #[arg(long)]
    target_face: Option<PathBuf>,
    /// Detect and annotate only, skipping identity matching
    #[arg(long)]
    no_target_match: bool,
    /// Directory holding det_10g.onnx and w600k_r50.onnx
    /// (default: $FACESIFT_MODEL_DIR, then ~/.local/share/facesift/models)
    #[arg(long)]
    model_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if cli.target_face.is_none() && !cli.no_target_match {
        bail!("--target-face is required unless --no-target-match is set");
    }
    let target = if cli.no_target_match {
        None
    } else {
        cli.target_face.as_deref()
    };

    // Both models load fail-fast at startup, before any image is touched.
    let models = config::ModelConfig::resolve(cli.model_dir);
    let detector =
        ScrfdDetector::load(&models.scrfd_model_path()).context("loading SCRFD detector")?;
    let encoder =
        ArcFaceEncoder::load(&models.arcface_model_path()).context("loading ArcFace encoder")?;

    let reports = runner::run(&cli.input_dir, &cli.export_dir, target, &detector, &encoder)?;

    let summary = runner::RunSummary::from_reports(&reports);
    tracing::info!(
        saved = summary.saved,
        matched = summary.matched,
        no_faces = summary.no_faces,
        errors = summary.errors,
        "run complete"
    );

    Ok(())
}

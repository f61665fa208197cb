//! Batch orchestration: enumerate → load target → dispatch → collect → drain.
//!
//! Every enumerated file gets exactly one [`FileReport`]; a task captures its
//! own failure into its report and never disturbs sibling tasks.

use facesift_core::pipeline::{process_image, Outcome, PipelineContext, PipelineError};
use facesift_core::types::{CapabilityError, DetectFaces, EncodeFace, Encoding};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extensions accepted from the input directory (case-insensitive).
const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Errors that abort the whole run before any image is dispatched.
#[derive(Error, Debug)]
pub enum FatalError {
    #[error("cannot read input directory {path}: {source}")]
    InputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot create export directory {path}: {source}")]
    ExportDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read target face image {path}: {source}")]
    TargetUnreadable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("target face processing failed: {0}")]
    TargetCapability(#[from] CapabilityError),
    #[error("no usable face found in target image {path}")]
    TargetHasNoFace { path: PathBuf },
    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}

/// One per enumerated input file, success or failure.
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub result: Result<Outcome, PipelineError>,
}

/// End-of-run counters derived from the collected reports.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub saved: usize,
    pub matched: usize,
    pub no_faces: usize,
    pub errors: usize,
}

impl RunSummary {
    pub fn from_reports(reports: &[FileReport]) -> Self {
        let mut summary = RunSummary::default();
        for report in reports {
            match &report.result {
                Ok(Outcome::Saved { any_match, .. }) => {
                    summary.saved += 1;
                    if *any_match {
                        summary.matched += 1;
                    }
                }
                Ok(Outcome::NoFaces) => summary.no_faces += 1,
                Err(_) => summary.errors += 1,
            }
        }
        summary
    }
}

/// Process every supported image in `input_dir`, writing annotated copies to
/// `export_dir`. `target_face` enables identity matching; `None` disables it.
///
/// Returns after every dispatched task has finished. Only target loading and
/// directory access can fail here; per-image failures live in the reports.
pub fn run<D: DetectFaces, E: EncodeFace>(
    input_dir: &Path,
    export_dir: &Path,
    target_face: Option<&Path>,
    detector: &D,
    encoder: &E,
) -> Result<Vec<FileReport>, FatalError> {
    std::fs::create_dir_all(export_dir).map_err(|source| FatalError::ExportDir {
        path: export_dir.to_path_buf(),
        source,
    })?;

    // Computed once, shared read-only by every worker.
    let target = match target_face {
        Some(path) => Some(load_target_encoding(path, detector, encoder)?),
        None => None,
    };

    let paths = enumerate_images(input_dir)?;
    let threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    tracing::info!(
        files = paths.len(),
        workers = threads,
        matching = target.is_some(),
        "dispatching batch"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| FatalError::WorkerPool(e.to_string()))?;

    let ctx = PipelineContext {
        detector,
        encoder,
        target: target.as_ref(),
        export_dir,
    };

    // collect() drains every task before returning; completion order is
    // irrelevant, the report set is what matters.
    let reports: Vec<FileReport> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                tracing::info!(file = %path.display(), "processing");
                let result = process_image(path, &ctx);
                match &result {
                    Ok(Outcome::Saved { path: out, any_match, faces }) => {
                        tracing::info!(output = %out.display(), faces, any_match, "saved");
                    }
                    Ok(Outcome::NoFaces) => {
                        tracing::info!(file = %path.display(), "no faces detected");
                    }
                    Err(e) => {
                        tracing::warn!(file = %path.display(), error = %e, "processing failed");
                    }
                }
                FileReport { path: path.clone(), result }
            })
            .collect()
    });

    Ok(reports)
}

/// Load the target image and extract the reference encoding from its first
/// encodable face. Zero usable faces is fatal: there is nothing to match.
fn load_target_encoding<D: DetectFaces, E: EncodeFace>(
    path: &Path,
    detector: &D,
    encoder: &E,
) -> Result<Encoding, FatalError> {
    let image = image::open(path)
        .map_err(|source| FatalError::TargetUnreadable { path: path.to_path_buf(), source })?
        .to_rgb8();

    let faces = detector.detect(&image)?;
    for face in faces {
        if let Some(encoding) = encoder.encode(&image, face)? {
            tracing::info!(target = %path.display(), "target encoding loaded");
            return Ok(encoding);
        }
    }

    Err(FatalError::TargetHasNoFace { path: path.to_path_buf() })
}

fn enumerate_images(input_dir: &Path) -> Result<Vec<PathBuf>, FatalError> {
    let entries = std::fs::read_dir(input_dir).map_err(|source| FatalError::InputDir {
        path: input_dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_supported_extension(p))
        .collect();
    // Stable dispatch order keeps the logs readable; completion order is
    // still up to the scheduler.
    paths.sort();
    Ok(paths)
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

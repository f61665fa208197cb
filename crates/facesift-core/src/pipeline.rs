//! Per-image pipeline: decode → normalize → detect → match → annotate → export.
//!
//! Each invocation owns every buffer it creates (original image, normalized
//! variant, encodings); everything drops when the call returns, before the
//! worker takes its next image.

use crate::annotate;
use crate::normalize::equalize_luminance;
use crate::types::{CapabilityError, DetectFaces, EncodeFace, Encoding};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to read or decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("face detection failed: {0}")]
    Detect(#[source] CapabilityError),
    #[error("face encoding failed: {0}")]
    Encode(#[source] CapabilityError),
    #[error("failed to write {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Terminal state of one image's pipeline run. Failures are the error channel;
/// zero faces is a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Annotated copy written to `path`.
    Saved {
        path: PathBuf,
        any_match: bool,
        faces: usize,
    },
    /// Nothing detected; no file produced.
    NoFaces,
}

/// Everything a pipeline run borrows from the orchestrator. The target
/// encoding is the only cross-task shared state and is read-only.
pub struct PipelineContext<'a, D: DetectFaces, E: EncodeFace> {
    pub detector: &'a D,
    pub encoder: &'a E,
    /// `None` disables identity matching; every face is then a non-match.
    pub target: Option<&'a Encoding>,
    pub export_dir: &'a Path,
}

/// Run the whole pipeline for one image file.
pub fn process_image<D: DetectFaces, E: EncodeFace>(
    path: &Path,
    ctx: &PipelineContext<'_, D, E>,
) -> Result<Outcome, PipelineError> {
    let mut original = image::open(path)
        .map_err(|source| PipelineError::Decode { path: path.to_path_buf(), source })?
        .to_rgb8();

    let faces = ctx.detector.detect(&original).map_err(PipelineError::Detect)?;
    if faces.is_empty() {
        return Ok(Outcome::NoFaces);
    }

    // Match flags, one per face. Encoding runs against the luminance-equalized
    // variant; the original stays untouched until annotation.
    let flags: Vec<bool> = match ctx.target {
        Some(target) => {
            let normalized = equalize_luminance(&original);
            let mut flags = Vec::with_capacity(faces.len());
            for &face in &faces {
                let encoding = ctx
                    .encoder
                    .encode(&normalized, face)
                    .map_err(PipelineError::Encode)?;
                // Unencodable region = non-match, never an error.
                flags.push(encoding.map(|e| e.matches(target)).unwrap_or(false));
            }
            flags
        }
        None => vec![false; faces.len()],
    };

    let any_match = flags.iter().any(|&m| m);
    let annotated: Vec<_> = faces.iter().copied().zip(flags).collect();
    annotate::draw_face_boxes(&mut original, &annotated);

    let out_path = ctx.export_dir.join(annotate::output_file_name(path, any_match));
    original
        .save(&out_path)
        .map_err(|source| PipelineError::Export { path: out_path.clone(), source })?;

    tracing::debug!(
        source = %path.display(),
        output = %out_path.display(),
        faces = faces.len(),
        any_match,
        "image processed"
    );

    Ok(Outcome::Saved { path: out_path, any_match, faces: faces.len() })
}

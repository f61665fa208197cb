//! facesift-core — per-image face pipeline.
//!
//! Face detection (SCRFD) and identity encoding (ArcFace) via ONNX Runtime,
//! plus the luminance normalizer, annotator and pipeline glue that turn one
//! source image into one annotated output.

pub mod annotate;
pub mod detector;
pub mod encoder;
pub mod normalize;
pub mod pipeline;
pub mod types;

pub use detector::ScrfdDetector;
pub use encoder::ArcFaceEncoder;
pub use pipeline::{process_image, Outcome, PipelineContext, PipelineError};
pub use types::{CapabilityError, DetectFaces, EncodeFace, Encoding, FaceBox, MATCH_TOLERANCE};

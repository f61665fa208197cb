//! ArcFace face encoder via ONNX Runtime.
//!
//! Extracts 512-dimensional L2-normalized identity vectors from a face region
//! of an image. The caller decides which image variant to encode from; the
//! batch pipeline always passes the luminance-equalized one.

use crate::types::{CapabilityError, EncodeFace, Encoding, FaceBox};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

const ARCFACE_INPUT_SIZE: u32 = 112;
const ARCFACE_MEAN: f32 = 127.5;
const ARCFACE_STD: f32 = 127.5; // NOT 128.0 — ArcFace uses symmetric normalization
const ARCFACE_EMBEDDING_DIM: usize = 512;

/// Regions with a side below this are unencodable; they yield no encoding
/// rather than an error.
const MIN_REGION_SIDE: u32 = 16;

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("model file not found: {0} — download from insightface and place in the model dir")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// ArcFace-based face encoder. Session is interior-locked for shared use
/// across a worker pool.
pub struct ArcFaceEncoder {
    session: Mutex<Session>,
}

impl ArcFaceEncoder {
    /// Load the ArcFace ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, EncoderError> {
        if !model_path.exists() {
            return Err(EncoderError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)
            .map_err(ort::Error::from)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = %model_path.display(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded ArcFace model"
        );

        Ok(Self { session: Mutex::new(session) })
    }

    /// Encode the face inside `region`, cropped from `image`.
    ///
    /// Returns `Ok(None)` for regions too small to carry identity signal.
    pub fn encode_region(
        &self,
        image: &RgbImage,
        region: FaceBox,
    ) -> Result<Option<Encoding>, EncoderError> {
        if region_too_small(region) {
            tracing::debug!(?region, "face region too small to encode");
            return Ok(None);
        }

        let crop = imageops::crop_imm(
            image,
            region.x_min,
            region.y_min,
            region.width(),
            region.height(),
        )
        .to_image();
        let aligned = imageops::resize(
            &crop,
            ARCFACE_INPUT_SIZE,
            ARCFACE_INPUT_SIZE,
            FilterType::Triangle,
        );

        let input = preprocess(&aligned);

        let raw: Vec<f32> = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| EncoderError::InferenceFailed("session lock poisoned".into()))?;
            let outputs =
                session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
            let (_, raw_data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| EncoderError::InferenceFailed(format!("embedding extraction: {e}")))?;
            raw_data.to_vec()
        };

        if raw.len() != ARCFACE_EMBEDDING_DIM {
            return Err(EncoderError::InferenceFailed(format!(
                "expected {ARCFACE_EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        // L2-normalize; a degenerate all-zero output carries no identity.
        let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            tracing::debug!(?region, "zero-norm embedding, treating region as unencodable");
            return Ok(None);
        }

        Ok(Some(Encoding { values: raw.iter().map(|x| x / norm).collect() }))
    }
}

impl EncodeFace for ArcFaceEncoder {
    fn encode(
        &self,
        image: &RgbImage,
        region: FaceBox,
    ) -> Result<Option<Encoding>, CapabilityError> {
        self.encode_region(image, region).map_err(|e| CapabilityError(e.to_string()))
    }
}

fn region_too_small(region: FaceBox) -> bool {
    region.width() < MIN_REGION_SIDE || region.height() < MIN_REGION_SIDE
}

/// Preprocess a 112x112 RGB face crop into a NCHW float tensor.
fn preprocess(aligned: &RgbImage) -> Array4<f32> {
    let size = ARCFACE_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, px) in aligned.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (px.0[c] as f32 - ARCFACE_MEAN) / ARCFACE_STD;
        }
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_preprocess_output_shape() {
        let size = ARCFACE_INPUT_SIZE;
        let aligned = RgbImage::from_pixel(size, size, Rgb([128, 128, 128]));
        let tensor = preprocess(&aligned);
        assert_eq!(tensor.shape(), &[1, 3, size as usize, size as usize]);
    }

    #[test]
    fn test_preprocess_normalization() {
        let size = ARCFACE_INPUT_SIZE;
        let aligned = RgbImage::from_pixel(size, size, Rgb([128, 128, 128]));
        let tensor = preprocess(&aligned);
        let expected = (128.0 - ARCFACE_MEAN) / ARCFACE_STD;
        let val = tensor[[0, 0, 0, 0]];
        assert!((val - expected).abs() < 1e-6, "got {val}, expected {expected}");
    }

    #[test]
    fn test_preprocess_channel_order() {
        let size = ARCFACE_INPUT_SIZE;
        let aligned = RgbImage::from_pixel(size, size, Rgb([255, 128, 0]));
        let tensor = preprocess(&aligned);
        let r = tensor[[0, 0, 5, 5]];
        let g = tensor[[0, 1, 5, 5]];
        let b = tensor[[0, 2, 5, 5]];
        assert!(r > g && g > b, "channel planes must follow RGB order: {r} {g} {b}");
    }

    #[test]
    fn test_region_too_small() {
        let tiny = FaceBox { x_min: 0, y_min: 0, x_max: MIN_REGION_SIDE - 1, y_max: 100 };
        let ok = FaceBox { x_min: 0, y_min: 0, x_max: MIN_REGION_SIDE, y_max: MIN_REGION_SIDE };
        assert!(region_too_small(tiny));
        assert!(!region_too_small(ok));
    }
}

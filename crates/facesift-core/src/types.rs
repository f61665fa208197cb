use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum embedding distance for two encodings to count as the same identity.
/// A distance exactly equal to the tolerance is a match (inclusive rule).
pub const MATCH_TOLERANCE: f32 = 0.6;

/// Canonical face region in pixel coordinates.
///
/// Half-open on neither side: `x_min`/`y_min` and `x_max`/`y_max` are corner
/// coordinates clamped inside the source image, with `x_min < x_max` and
/// `y_min < y_max` guaranteed by construction. Upstream detectors use two
/// different native layouts; both are translated here and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaceBox {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl FaceBox {
    /// Build from an absolute corner pair `(x1, y1, x2, y2)` — the RetinaFace
    /// `facial_area` layout. Corners may arrive unordered or outside the
    /// image; they are reordered and clamped. Returns `None` if the clamped
    /// region is empty.
    pub fn from_corners(
        x1: i64,
        y1: i64,
        x2: i64,
        y2: i64,
        image_width: u32,
        image_height: u32,
    ) -> Option<FaceBox> {
        let (lo_x, hi_x) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let (lo_y, hi_y) = if y1 <= y2 { (y1, y2) } else { (y2, y1) };

        let x_min = lo_x.clamp(0, image_width as i64) as u32;
        let x_max = hi_x.clamp(0, image_width as i64) as u32;
        let y_min = lo_y.clamp(0, image_height as i64) as u32;
        let y_max = hi_y.clamp(0, image_height as i64) as u32;

        if x_min < x_max && y_min < y_max {
            Some(FaceBox { x_min, y_min, x_max, y_max })
        } else {
            None
        }
    }

    /// Build from the dlib/face_recognition `(top, right, bottom, left)`
    /// layout. Same clamping and degeneracy rules as [`from_corners`].
    ///
    /// [`from_corners`]: Self::from_corners
    pub fn from_top_right_bottom_left(
        top: i64,
        right: i64,
        bottom: i64,
        left: i64,
        image_width: u32,
        image_height: u32,
    ) -> Option<FaceBox> {
        Self::from_corners(left, top, right, bottom, image_width, image_height)
    }

    pub fn width(&self) -> u32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> u32 {
        self.y_max - self.y_min
    }
}

/// Face identity vector (512-dimensional for ArcFace, L2-normalized by the
/// encoder that produced it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encoding {
    pub values: Vec<f32>,
}

impl Encoding {
    /// Euclidean distance to another encoding. Lower = more similar.
    pub fn distance(&self, other: &Encoding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// Whether this encoding is the same identity as `target` under the fixed
    /// tolerance. Inclusive: a distance of exactly [`MATCH_TOLERANCE`] matches.
    pub fn matches(&self, target: &Encoding) -> bool {
        self.distance(target) <= MATCH_TOLERANCE
    }
}

/// Error surfaced across a capability boundary. Backend-specific detail is
/// flattened to a message; callers only route these, they never branch on them.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct CapabilityError(pub String);

/// Face-locating capability: find all faces in an image.
///
/// An empty result is a normal outcome, not an error.
pub trait DetectFaces: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Result<Vec<FaceBox>, CapabilityError>;
}

/// Face-encoding capability: extract an identity vector from one region of an
/// image. `Ok(None)` means the region could not be encoded (too small, too
/// low-quality) and must be treated as a non-match, never as a failure.
pub trait EncodeFace: Send + Sync {
    fn encode(&self, image: &RgbImage, region: FaceBox)
        -> Result<Option<Encoding>, CapabilityError>;
}

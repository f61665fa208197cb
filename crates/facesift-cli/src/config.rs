use std::path::PathBuf;

/// Model file locations, resolved from the `--model-dir` flag, then the
/// `FACESIFT_MODEL_DIR` environment variable, then the XDG data default.
pub struct ModelConfig {
    pub model_dir: PathBuf,
}

impl ModelConfig {
    pub fn resolve(flag: Option<PathBuf>) -> Self {
        let model_dir = flag
            .or_else(|| std::env::var("FACESIFT_MODEL_DIR").ok().map(PathBuf::from))
            .unwrap_or_else(default_model_dir);
        Self { model_dir }
    }

    /// Path to the SCRFD detection model.
    pub fn scrfd_model_path(&self) -> PathBuf {
        self.model_dir.join("det_10g.onnx")
    }

    /// Path to the ArcFace encoding model.
    pub fn arcface_model_path(&self) -> PathBuf {
        self.model_dir.join("w600k_r50.onnx")
    }
}

fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facesift/models")
}

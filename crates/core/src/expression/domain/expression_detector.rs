use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use super::expression_vector::ExpressionVector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// One face found in a frame, with its expression scores.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceDetection {
    pub bounding_box: BoundingBox,
    pub expressions: ExpressionVector,
}

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("model resource not found: {0}")]
    MissingResource(PathBuf),
    #[error("failed to load {path}: {message}")]
    Runtime { path: PathBuf, message: String },
}

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("models are not loaded")]
    NotLoaded,
    #[error("unusable frame: {0}")]
    Frame(String),
    #[error("inference failed: {0}")]
    Runtime(String),
}

/// Face detection plus expression inference.
///
/// `load_models` must succeed once before `detect_faces` can return
/// anything other than [`InferenceError::NotLoaded`].
#[async_trait]
pub trait ExpressionDetector: Send {
    async fn load_models(&mut self, source: &Path) -> Result<(), ModelLoadError>;

    /// Faces in `frame`, in the detector's own ranking order.
    async fn detect_faces(&mut self, frame: &Frame) -> Result<Vec<FaceDetection>, InferenceError>;
}

use std::path::PathBuf;

use thiserror::Error;

/// Failures inside the inference path.
///
/// None of these escape to the HTTP layer: the classifier folds them into
/// [`crate::ClassificationOutcome::Failed`].
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load model from {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Model produced an invalid score: {0}")]
    InvalidScore(String),

    #[error("No inference backend compiled in (enable the `onnx` feature)")]
    BackendUnavailable,
}

#[cfg(feature = "onnx")]
impl From<ort::Error> for InferenceError {
    fn from(err: ort::Error) -> Self {
        InferenceError::Inference(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, InferenceError>;

use std::sync::Arc;

use ndarray::Array4;

use crate::error::Result;

/// A binary classifier producing a single tumor probability per image.
pub trait ScoreModel: Send + Sync {
    /// Run one forward pass over a `[1, 150, 150, 3]` tensor and return the
    /// raw score. Range checking is the caller's job.
    fn score(&self, input: &Array4<f32>) -> Result<f32>;

    /// Short name used in log lines.
    fn name(&self) -> &str {
        "model"
    }
}

/// Process-wide handle to a loaded model.
pub type SharedModel = Arc<dyn ScoreModel>;

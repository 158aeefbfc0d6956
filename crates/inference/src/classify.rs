//! Single-image classification.

use std::path::Path;

use scan_common::Diagnosis;
use tracing::{debug, error};

use crate::error::{InferenceError, Result};
use crate::interpret::interpret;
use crate::loader::ModelLoader;
use crate::model::ScoreModel;
use crate::preprocess::load_tensor;

/// Result of running the classifier on one image.
#[derive(Debug)]
pub enum ClassificationOutcome {
    /// No model was loaded; nothing was attempted.
    ModelNotFound,
    /// Preprocessing or inference failed.
    Failed(InferenceError),
    /// Tumor probability in [0, 1].
    Scored(f32),
}

/// Classify the image at `image_path`.
///
/// Never fails: every error is logged and returned as
/// [`ClassificationOutcome::Failed`].
pub fn classify(model: Option<&dyn ScoreModel>, image_path: &Path) -> ClassificationOutcome {
    let Some(model) = model else {
        return ClassificationOutcome::ModelNotFound;
    };

    match score_image(model, image_path) {
        Ok(score) => {
            debug!(path = %image_path.display(), score, "classified scan");
            ClassificationOutcome::Scored(score)
        }
        Err(e) => {
            error!(path = %image_path.display(), "Error during prediction: {}", e);
            ClassificationOutcome::Failed(e)
        }
    }
}

/// Full pipeline: fetch the shared model, classify, interpret.
pub fn predict_tumor(loader: &ModelLoader, image_path: &Path) -> Diagnosis {
    let model = loader.get();
    let outcome = classify(model.as_deref(), image_path);
    interpret(&outcome)
}

fn score_image(model: &dyn ScoreModel, image_path: &Path) -> Result<f32> {
    let tensor = load_tensor(image_path)?;
    let score = model.score(&tensor)?;
    check_score(score)
}

/// Reject scores a sigmoid head cannot produce.
fn check_score(score: f32) -> Result<f32> {
    if score.is_finite() && (0.0..=1.0).contains(&score) {
        Ok(score)
    } else {
        Err(InferenceError::InvalidScore(score.to_string()))
    }
}

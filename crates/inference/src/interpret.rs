use scan_common::{Diagnosis, Label};

use crate::classify::ClassificationOutcome;

/// Scores strictly above this are reported as a detected tumor.
pub const TUMOR_THRESHOLD: f32 = 0.5;

/// Map a classification outcome to the stored label and confidence.
pub fn interpret(outcome: &ClassificationOutcome) -> Diagnosis {
    match outcome {
        ClassificationOutcome::ModelNotFound => Diagnosis::model_not_found(),
        ClassificationOutcome::Failed(_) => Diagnosis::prediction_error(),
        ClassificationOutcome::Scored(score) => interpret_score(*score),
    }
}

/// Threshold a raw score. Confidence is the probability of the reported label.
pub fn interpret_score(score: f32) -> Diagnosis {
    if score > TUMOR_THRESHOLD {
        Diagnosis::new(Label::TumorDetected, score)
    } else {
        Diagnosis::new(Label::NoTumor, 1.0 - score)
    }
}

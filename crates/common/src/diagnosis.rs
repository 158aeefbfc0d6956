//! Classification labels and the label/confidence pair stored per scan.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Outcome label attached to a scan once classification has run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "Tumor Detected")]
    TumorDetected,

    #[serde(rename = "No Tumor")]
    NoTumor,

    /// No model was available when the scan was classified
    #[serde(rename = "Model Not Found")]
    ModelNotFound,

    /// Preprocessing or inference failed
    #[serde(rename = "Prediction Error")]
    PredictionError,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TumorDetected => "Tumor Detected",
            Self::NoTumor => "No Tumor",
            Self::ModelNotFound => "Model Not Found",
            Self::PredictionError => "Prediction Error",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Tumor Detected" => Ok(Self::TumorDetected),
            "No Tumor" => Ok(Self::NoTumor),
            "Model Not Found" => Ok(Self::ModelNotFound),
            "Prediction Error" => Ok(Self::PredictionError),
            other => Err(Error::UnknownLabel(other.to_string())),
        }
    }
}

/// Label plus confidence in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub label: Label,
    pub confidence: f32,
}

impl Diagnosis {
    pub fn new(label: Label, confidence: f32) -> Self {
        Self { label, confidence }
    }

    pub fn model_not_found() -> Self {
        Self::new(Label::ModelNotFound, 0.0)
    }

    pub fn prediction_error() -> Self {
        Self::new(Label::PredictionError, 0.0)
    }

    /// Confidence as a percentage string, e.g. `"80.00%"`.
    pub fn percentage(&self) -> String {
        format_percentage(self.confidence)
    }
}

/// Formats a [0, 1] confidence as a percentage with two decimals.
pub fn format_percentage(confidence: f32) -> String {
    format!("{:.2}%", confidence * 100.0)
}

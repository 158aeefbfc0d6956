//! Tumor classification for uploaded MRI scans.
//!
//! The pipeline is: [`ModelLoader`] hands out a lazily loaded model,
//! [`preprocess`] turns an image file into a `[1, 150, 150, 3]` tensor,
//! [`classify`] runs one forward pass, and [`interpret`] maps the outcome to a
//! [`Diagnosis`]. [`predict_tumor`] strings them together.
//!
//! The ONNX Runtime backend is behind the `onnx` feature.

pub mod classify;
pub mod error;
pub mod interpret;
pub mod loader;
pub mod model;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod preprocess;

pub use classify::{classify, predict_tumor, ClassificationOutcome};
pub use error::{InferenceError, Result};
pub use interpret::{interpret, interpret_score, TUMOR_THRESHOLD};
pub use loader::{ModelLoader, DEFAULT_MODEL_PATH};
pub use model::{ScoreModel, SharedModel};
#[cfg(feature = "onnx")]
pub use onnx::OnnxModel;
pub use scan_common::{Diagnosis, Label};

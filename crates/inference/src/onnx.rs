//! ONNX Runtime backend.
//!
//! Expects a model exported from the Keras classifier: one NHWC float input
//! and a `[1, 1]` sigmoid output.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::value::Tensor;
use tracing::info;

use crate::error::{InferenceError, Result};
use crate::model::ScoreModel;

pub struct OnnxModel {
    // `Session::run` takes `&mut self`.
    session: Mutex<Session>,
    input_name: String,
}

impl OnnxModel {
    pub fn load(path: &Path) -> Result<Self> {
        let load_error = |message: String| InferenceError::ModelLoad {
            path: path.to_path_buf(),
            message,
        };

        let session = Session::builder()
            .map_err(|e| load_error(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| load_error(e.to_string()))?;

        let input_name = session
            .inputs()
            .first()
            .map(|input| input.name().to_string())
            .ok_or_else(|| load_error("model declares no inputs".to_string()))?;

        info!(model = %path.display(), input = %input_name, "loaded ONNX classifier");

        Ok(Self {
            session: Mutex::new(session),
            input_name,
        })
    }
}

impl ScoreModel for OnnxModel {
    fn score(&self, input: &Array4<f32>) -> Result<f32> {
        let dims: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let data = input
            .as_slice()
            .ok_or_else(|| InferenceError::Inference("input tensor is not contiguous".to_string()))?
            .to_vec();
        let tensor = Tensor::from_array((dims, data.into_boxed_slice()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| InferenceError::Inference("session lock poisoned".to_string()))?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => tensor])?;

        let (_, values) = outputs[0].try_extract_tensor::<f32>()?;
        let score = values
            .first()
            .copied()
            .ok_or_else(|| InferenceError::InvalidScore("empty output tensor".to_string()))?;

        Ok(score)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

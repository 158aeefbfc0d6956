//! Lazy, process-wide model loading.
//!
//! The model file is looked up on first use rather than at startup so the
//! service can boot without it. Once a load succeeds the handle is cached for
//! the rest of the process; a missing or broken file is logged and re-checked
//! on the next request.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::{error, info, warn};

use crate::error::Result;
use crate::model::SharedModel;

/// Default model location, relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "models/brain_tumor_model.onnx";

type LoadFn = dyn Fn(&Path) -> Result<SharedModel> + Send + Sync;

pub struct ModelLoader {
    path: PathBuf,
    load: Box<LoadFn>,
    model: OnceLock<SharedModel>,
    // Serializes first-time loads so concurrent callers never double-load.
    init: Mutex<()>,
}

impl ModelLoader {
    /// Loader backed by the compiled-in inference backend.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_loader(path, load_default)
    }

    /// Loader with a custom deserializer, used for alternative backends and tests.
    pub fn with_loader<F>(path: impl Into<PathBuf>, load: F) -> Self
    where
        F: Fn(&Path) -> Result<SharedModel> + Send + Sync + 'static,
    {
        Self {
            path: path.into(),
            load: Box::new(load),
            model: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    /// Return the cached model, loading it on first call.
    ///
    /// `None` means the model file is absent or could not be deserialized;
    /// the reason has already been logged.
    pub fn get(&self) -> Option<SharedModel> {
        if let Some(model) = self.model.get() {
            return Some(Arc::clone(model));
        }

        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);

        // Another caller may have finished loading while we waited.
        if let Some(model) = self.model.get() {
            return Some(Arc::clone(model));
        }

        if !self.path.exists() {
            warn!(path = %self.path.display(), "Model not found");
            return None;
        }

        match (self.load)(&self.path) {
            Ok(model) => {
                info!(path = %self.path.display(), backend = model.name(), "Model loaded");
                let _ = self.model.set(Arc::clone(&model));
                Some(model)
            }
            Err(e) => {
                error!(path = %self.path.display(), "Failed to load model: {}", e);
                None
            }
        }
    }
}

impl fmt::Debug for ModelLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelLoader")
            .field("path", &self.path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(feature = "onnx")]
fn load_default(path: &Path) -> Result<SharedModel> {
    Ok(Arc::new(crate::onnx::OnnxModel::load(path)?))
}

#[cfg(not(feature = "onnx"))]
fn load_default(_path: &Path) -> Result<SharedModel> {
    Err(crate::error::InferenceError::BackendUnavailable)
}

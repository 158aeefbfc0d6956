//! Storage for uploaded scan images

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Upload subdirectory under the media root
pub const UPLOAD_DIR: &str = "mri_scans";

/// URL prefix the media root is served under
pub const MEDIA_URL: &str = "/media";

/// Files written under a media root directory
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an upload and return its reference relative to the media root.
    ///
    /// The stored name is a fresh UUID; only the (sanitized) extension of the
    /// client-supplied name is kept.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String> {
        let dir = self.root.join(UPLOAD_DIR);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory: {}", dir.display()))?;

        let file_name = stored_file_name(original_name);
        let path = dir.join(&file_name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write upload: {}", path.display()))?;

        debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(format!("{}/{}", UPLOAD_DIR, file_name))
    }

    /// Filesystem path of a stored image reference
    pub fn path_of(&self, image: &str) -> PathBuf {
        self.root.join(image)
    }

    /// Public URL of a stored image reference
    pub fn url_of(image: &str) -> String {
        format!("{}/{}", MEDIA_URL, image)
    }
}

fn stored_file_name(original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase());

    let stem = Uuid::new_v4().simple().to_string();
    match extension {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

//! Configuration management for the scan service
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Default session lifetime: two weeks
pub const DEFAULT_SESSION_TTL_SECS: u64 = 14 * 24 * 60 * 60;

/// Default request body limit for uploads
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Which storage backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Redis,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("Unknown STORAGE_BACKEND: {}", other),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,

    /// Storage backend
    pub storage: StorageBackend,

    /// Redis URL, used when `storage` is `Redis`
    pub redis_url: String,

    /// Serialized classification model
    pub model_path: PathBuf,

    /// Directory uploaded scans are written under
    pub media_root: PathBuf,

    /// Session lifetime in seconds
    pub session_ttl_secs: u64,

    /// Largest accepted request body
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let config = Config {
            host: env::var("SCAN_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("SCAN_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .context("Invalid SCAN_PORT")?,

            storage: env::var("STORAGE_BACKEND")
                .unwrap_or_else(|_| "redis".to_string())
                .parse()?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),

            model_path: env::var("MODEL_PATH")
                .unwrap_or_else(|_| scan_inference::DEFAULT_MODEL_PATH.to_string())
                .into(),

            media_root: env::var("MEDIA_ROOT")
                .unwrap_or_else(|_| "media".to_string())
                .into(),

            session_ttl_secs: match env::var("SESSION_TTL_SECS") {
                Ok(v) => v.parse().context("Invalid SESSION_TTL_SECS")?,
                Err(_) => DEFAULT_SESSION_TTL_SECS,
            },

            max_upload_bytes: match env::var("MAX_UPLOAD_BYTES") {
                Ok(v) => v.parse().context("Invalid MAX_UPLOAD_BYTES")?,
                Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
            },
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("SCAN_PORT must be greater than 0");
        }
        if self.session_ttl_secs == 0 {
            anyhow::bail!("SESSION_TTL_SECS must be greater than 0");
        }
        if self.max_upload_bytes == 0 {
            anyhow::bail!("MAX_UPLOAD_BYTES must be greater than 0");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Ensure the media directory exists
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.media_root).with_context(|| {
            format!(
                "Failed to create media directory: {}",
                self.media_root.display()
            )
        })?;

        // The model is loaded lazily, so a missing file is not fatal here
        if !self.model_path.exists() {
            tracing::warn!(
                "Model file does not exist yet: {}",
                self.model_path.display()
            );
        }

        Ok(())
    }
}

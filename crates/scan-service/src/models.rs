//! Data models for the scan service

use chrono::{DateTime, Utc};
use scan_common::{Diagnosis, Error, Label};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::media::MediaStore;

/// An uploaded MRI scan and, once classified, its diagnosis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Sequential identifier assigned by the store
    pub id: u64,

    /// Stored image path, relative to the media root
    pub image: String,

    /// Classification label, `None` until classification completes
    pub prediction: Option<Label>,

    /// Confidence in [0, 1], `None` until classification completes
    pub probability: Option<f32>,

    /// When the scan was uploaded
    pub uploaded_at: DateTime<Utc>,
}

impl ScanRecord {
    /// Create a new, unclassified record
    pub fn new(id: u64, image: String) -> Self {
        Self {
            id,
            image,
            prediction: None,
            probability: None,
            uploaded_at: Utc::now(),
        }
    }

    pub fn is_classified(&self) -> bool {
        self.prediction.is_some()
    }

    pub fn diagnosis(&self) -> Option<Diagnosis> {
        Some(Diagnosis::new(self.prediction?, self.probability?))
    }

    /// Write the classification result. A record is classified at most once.
    pub fn apply_diagnosis(&mut self, diagnosis: &Diagnosis) -> Result<(), Error> {
        if self.is_classified() {
            return Err(Error::AlreadyClassified(self.id));
        }
        self.prediction = Some(diagnosis.label);
        self.probability = Some(diagnosis.confidence);
        Ok(())
    }
}

impl fmt::Display for ScanRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prediction {
            Some(label) => write!(f, "MRI Scan {} - {}", self.id, label),
            None => write!(f, "MRI Scan {} - None", self.id),
        }
    }
}

/// Registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,

    /// `pbkdf2_sha256$<iterations>$<salt hex>$<hash hex>`
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

/// Record as returned by the API
#[derive(Debug, Serialize)]
pub struct RecordView {
    pub id: u64,
    pub image: String,
    pub image_url: String,
    pub prediction: Option<Label>,
    pub probability: Option<f32>,

    /// `probability` formatted as e.g. `"80.00%"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability_display: Option<String>,

    pub uploaded_at: DateTime<Utc>,
}

impl From<&ScanRecord> for RecordView {
    fn from(record: &ScanRecord) -> Self {
        Self {
            id: record.id,
            image: record.image.clone(),
            image_url: MediaStore::url_of(&record.image),
            prediction: record.prediction,
            probability: record.probability,
            probability_display: record.probability.map(scan_common::format_percentage),
            uploaded_at: record.uploaded_at,
        }
    }
}

/// Recent scans
#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub images: Vec<RecordView>,
}

/// Result of an upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub prediction: Label,

    /// Confidence as a percentage string
    pub probability: String,

    pub image_url: String,
    pub record: RecordView,
}

/// Single record lookup
#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub record: RecordView,
}

/// Signup form
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub password1: String,
    pub password2: String,
}

/// Login form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

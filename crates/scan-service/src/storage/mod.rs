//! Persistence for scan records, users and sessions

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use anyhow::Result;
use async_trait::async_trait;
use scan_common::{Diagnosis, SessionToken};

use crate::models::{ScanRecord, User};

/// Storage backend used by the HTTP handlers
#[async_trait]
pub trait Store: Send + Sync {
    /// Create an unclassified record for a stored image
    async fn create_record(&self, image: &str) -> Result<ScanRecord>;

    /// Write the classification result for a record.
    /// Returns Ok(None) if the record does not exist; errors with
    /// `scan_common::Error::AlreadyClassified` on a second write.
    async fn record_diagnosis(&self, id: u64, diagnosis: &Diagnosis) -> Result<Option<ScanRecord>>;

    async fn get_record(&self, id: u64) -> Result<Option<ScanRecord>>;

    /// Up to `limit` records, newest first
    async fn list_recent(&self, limit: usize) -> Result<Vec<ScanRecord>>;

    /// Register a user.
    /// Returns Ok(true) if created, Ok(false) if the username is taken
    async fn create_user(&self, user: &User) -> Result<bool>;

    async fn get_user(&self, username: &str) -> Result<Option<User>>;

    async fn create_session(&self, token: &SessionToken, username: &str, ttl_secs: u64) -> Result<()>;

    /// Username owning a live session
    async fn session_user(&self, token: &SessionToken) -> Result<Option<String>>;

    async fn delete_session(&self, token: &SessionToken) -> Result<()>;
}

//! In-process storage, used for tests and `STORAGE_BACKEND=memory`

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use scan_common::{Diagnosis, SessionToken};
use tokio::sync::Mutex;
use tracing::debug;

use super::Store;
use crate::models::{ScanRecord, User};

#[derive(Default)]
struct Inner {
    next_id: u64,
    records: BTreeMap<u64, ScanRecord>,
    users: HashMap<String, User>,
    sessions: HashMap<SessionToken, (String, Instant)>,
}

/// Storage backend kept entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_count(&self) -> usize {
        self.inner.lock().await.records.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_record(&self, image: &str) -> Result<ScanRecord> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let record = ScanRecord::new(inner.next_id, image.to_string());
        inner.records.insert(record.id, record.clone());
        debug!("Created record {}", record.id);
        Ok(record)
    }

    async fn record_diagnosis(&self, id: u64, diagnosis: &Diagnosis) -> Result<Option<ScanRecord>> {
        let mut inner = self.inner.lock().await;
        let Some(record) = inner.records.get_mut(&id) else {
            return Ok(None);
        };
        record.apply_diagnosis(diagnosis)?;
        Ok(Some(record.clone()))
    }

    async fn get_record(&self, id: u64) -> Result<Option<ScanRecord>> {
        Ok(self.inner.lock().await.records.get(&id).cloned())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ScanRecord>> {
        let inner = self.inner.lock().await;
        // Ids are handed out in creation order.
        Ok(inner.records.values().rev().take(limit).cloned().collect())
    }

    async fn create_user(&self, user: &User) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        if inner.users.contains_key(&user.username) {
            return Ok(false);
        }
        inner.users.insert(user.username.clone(), user.clone());
        Ok(true)
    }

    async fn get_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self.inner.lock().await.users.get(username).cloned())
    }

    async fn create_session(&self, token: &SessionToken, username: &str, ttl_secs: u64) -> Result<()> {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;

        // Abandoned sessions are never looked up again, so sweep them here.
        let before = inner.sessions.len();
        inner.sessions.retain(|_, (_, expires_at)| *expires_at > now);
        let swept = before - inner.sessions.len();
        if swept > 0 {
            debug!("Removed {} expired sessions", swept);
        }

        inner
            .sessions
            .insert(token.clone(), (username.to_string(), now + Duration::from_secs(ttl_secs)));
        Ok(())
    }

    async fn session_user(&self, token: &SessionToken) -> Result<Option<String>> {
        let mut inner = self.inner.lock().await;
        let expired = match inner.sessions.get(token) {
            Some((username, expires_at)) if *expires_at > Instant::now() => {
                return Ok(Some(username.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.sessions.remove(token);
        }
        Ok(None)
    }

    async fn delete_session(&self, token: &SessionToken) -> Result<()> {
        self.inner.lock().await.sessions.remove(token);
        Ok(())
    }
}

//! Redis storage for scan records, users and sessions

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use scan_common::{Diagnosis, Error, SessionToken};
use tracing::{debug, info};

use super::Store;
use crate::models::{ScanRecord, User};

const NEXT_RECORD_ID_KEY: &str = "scan:record:next_id";
/// Sorted set of record ids, scored by id
const RECORDS_INDEX_KEY: &str = "scan:records";

/// Writes ARGV[1] to KEYS[1] only while the stored record has no prediction.
/// Returns 1 when written, 0 when the record is missing, -1 when already classified.
const CLASSIFY_ONCE_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
    return 0
end
local prediction = cjson.decode(current).prediction
if prediction ~= nil and prediction ~= cjson.null then
    return -1
end
redis.call('SET', KEYS[1], ARGV[1])
return 1
"#;

fn record_key(id: u64) -> String {
    format!("scan:record:{}", id)
}

fn user_key(username: &str) -> String {
    format!("scan:user:{}", username)
}

fn session_key(token: &SessionToken) -> String {
    format!("scan:session:{}", token.to_hex())
}

/// Storage backend persisting to Redis
pub struct RedisStore {
    conn: ConnectionManager,
    classify_once: Script,
}

impl RedisStore {
    /// Create a new storage instance
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self {
            conn,
            classify_once: Script::new(CLASSIFY_ONCE_SCRIPT),
        })
    }

    async fn put_record(&self, record: &ScanRecord) -> Result<()> {
        let json = serde_json::to_string(record)
            .context("Failed to serialize record")?;

        let mut conn = self.conn.clone();
        let _: () = conn.set(record_key(record.id), json).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn create_record(&self, image: &str) -> Result<ScanRecord> {
        let mut conn = self.conn.clone();

        let id: u64 = conn.incr(NEXT_RECORD_ID_KEY, 1).await?;
        let record = ScanRecord::new(id, image.to_string());

        self.put_record(&record).await?;
        let _: () = conn.zadd(RECORDS_INDEX_KEY, id, id).await?;

        info!("Created record {} for image {}", id, image);
        Ok(record)
    }

    async fn record_diagnosis(&self, id: u64, diagnosis: &Diagnosis) -> Result<Option<ScanRecord>> {
        let Some(mut record) = self.get_record(id).await? else {
            debug!("Record not found: {}", id);
            return Ok(None);
        };

        record.apply_diagnosis(diagnosis)?;
        let json = serde_json::to_string(&record)
            .context("Failed to serialize record")?;

        // Another writer may have classified the record since the read above.
        let mut conn = self.conn.clone();
        let status: i64 = self
            .classify_once
            .key(record_key(id))
            .arg(json)
            .invoke_async(&mut conn)
            .await?;

        match status {
            1 => {
                debug!("Updated record {} with {:?}", id, diagnosis);
                Ok(Some(record))
            }
            0 => Ok(None),
            _ => Err(Error::AlreadyClassified(id).into()),
        }
    }

    async fn get_record(&self, id: u64) -> Result<Option<ScanRecord>> {
        let mut conn = self.conn.clone();
        let json: Option<String> = conn.get(record_key(id)).await?;

        match json {
            Some(data) => {
                let record: ScanRecord = serde_json::from_str(&data)
                    .context("Failed to deserialize record")?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ScanRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        let ids: Vec<u64> = conn
            .zrevrange(RECORDS_INDEX_KEY, 0, limit as isize - 1)
            .await?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get_record(id).await? {
                records.push(record);
            }
        }

        Ok(records)
    }

    async fn create_user(&self, user: &User) -> Result<bool> {
        let json = serde_json::to_string(user)
            .context("Failed to serialize user")?;

        let mut conn = self.conn.clone();
        let created: bool = conn.set_nx(user_key(&user.username), json).await?;

        if created {
            info!("Registered user: {}", user.username);
        } else {
            debug!("Username already taken: {}", user.username);
        }
        Ok(created)
    }

    async fn get_user(&self, username: &str) -> Result<Option<User>> {
        let mut conn = self.conn.clone();
        let json: Option<String> = conn.get(user_key(username)).await?;

        match json {
            Some(data) => {
                let user: User = serde_json::from_str(&data)
                    .context("Failed to deserialize user")?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn create_session(&self, token: &SessionToken, username: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(session_key(token))
            .arg(username)
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn session_user(&self, token: &SessionToken) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let username: Option<String> = conn.get(session_key(token)).await?;
        Ok(username)
    }

    async fn delete_session(&self, token: &SessionToken) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(session_key(token)).await?;
        Ok(())
    }
}

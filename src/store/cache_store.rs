use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        CacheError::Backend(value.to_string())
    }
}

/// Key/value store with per-entry expiry.
///
/// Values are opaque strings; callers serialize their payloads.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Returns true if the key existed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    async fn delete_many(&self, keys: &[String]) -> Result<u64, CacheError>;

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError>;
}

// ==============================================================================
// Redis
// ==============================================================================

pub struct RedisCacheStore {
    connection: redis::aio::ConnectionManager,
}

impl RedisCacheStore {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_connection_manager().await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection.clone();
        let removed: u64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection.clone();
        let removed: u64 = conn.del(keys).await?;
        Ok(removed)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection.clone();
        let keys: Vec<String> = conn.keys(format!("{}*", prefix)).await?;
        Ok(keys)
    }
}

// ==============================================================================
// In-memory
// ==============================================================================

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// Process-local cache used when no Redis URL is configured, and in tests.
///
/// Expired entries are dropped lazily on read. Writes are counted so callers
/// can observe how many `set` calls reached the store.
#[derive(Clone, Default)]
pub struct InMemoryCacheStore {
    entries: Arc<DashMap<String, MemoryEntry>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if Instant::now() < entry.expires_at {
            return Some(entry.value.clone());
        }
        drop(entry);
        self.entries.remove(key);
        None
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.live_value(key))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64, CacheError> {
        let removed = keys
            .iter()
            .filter(|key| self.entries.remove(key.as_str()).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let now = Instant::now();
        self.entries.retain(|_, entry| now < entry.expires_at);

        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

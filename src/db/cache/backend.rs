use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::AppResult;

/// Key/value storage with per-entry expiry
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Stores `value` under `key`, expiring after `ttl` seconds
    async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Creates a Redis client for caching
///
/// Only parses the URL; no connection is made until [`RedisBackend::connect`].
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Redis-backed cache storage
///
/// Shares one multiplexed connection that reconnects on failure.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    pub async fn connect(client: Client) -> AppResult<Self> {
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait::async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn.clone();
        let cached: Option<String> = conn.get(key).await?;
        Ok(cached)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Process-local cache storage
///
/// Expired entries are hidden on read and replaced on the next write.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(value, _)| value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> AppResult<()> {
        let expires_at = Instant::now() + Duration::from_secs(ttl);
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_roundtrip() {
        let backend = MemoryBackend::new();
        backend.set_ex("trending_week", "[]", 60).await.unwrap();
        assert_eq!(
            backend.get("trending_week").await.unwrap(),
            Some("[]".to_string())
        );
        assert_eq!(backend.get("popular_movies").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_backend_expires() {
        let backend = MemoryBackend::new();
        backend.set_ex("stale", "1", 0).await.unwrap();
        assert_eq!(backend.get("stale").await.unwrap(), None);
    }

    #[test]
    fn test_redis_client_rejects_bad_url() {
        assert!(create_redis_client("not a url").is_err());
    }

    async fn redis_backend() -> RedisBackend {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let client = create_redis_client(&redis_url).unwrap();
        RedisBackend::connect(client).await.unwrap()
    }

    #[tokio::test]
    #[ignore = "needs a Redis server at REDIS_URL"]
    async fn test_redis_backend_roundtrip() {
        let backend = redis_backend().await;
        let key = format!("test:{}", uuid::Uuid::new_v4());

        assert_eq!(backend.get(&key).await.unwrap(), None);
        backend.set_ex(&key, "[1,2]", 60).await.unwrap();
        assert_eq!(backend.get(&key).await.unwrap(), Some("[1,2]".to_string()));

        let mut conn = backend.conn.clone();
        let ttl: i64 = conn.ttl(&key).await.unwrap();
        assert!(ttl > 0 && ttl <= 60);

        let _: () = conn.del(&key).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "needs a Redis server at REDIS_URL"]
    async fn test_redis_backend_expires() {
        let backend = redis_backend().await;
        let key = format!("test:{}", uuid::Uuid::new_v4());

        backend.set_ex(&key, "stale", 1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(backend.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "needs a Redis server at REDIS_URL"]
    async fn test_cache_through_redis_backend() {
        use crate::db::cache::{Cache, CacheKey};
        use crate::models::MediaType;
        use std::sync::Arc;

        let backend = redis_backend().await;
        let mut conn = backend.conn.clone();
        let (cache, handle) = Cache::new(Arc::new(backend));

        // Far outside the TMDB id range so real entries are untouched
        let key = CacheKey::TmdbDetails(MediaType::Movie, -i64::from(std::process::id()));
        let value = vec!["Inception".to_string()];

        cache.set_in_background(&key, &value, 60);
        handle.shutdown().await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));

        let _: () = conn.del(key.to_string()).await.unwrap();
    }
}

use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::backend::CacheBackend;
use crate::error::AppError;
use crate::error::AppResult;
use crate::models::MediaType;

/// Time-to-live of the trending list, in seconds
pub const TRENDING_TTL: u64 = 60 * 60;
/// Time-to-live of the popular list, in seconds
pub const POPULAR_TTL: u64 = 60 * 60 * 6;
/// Time-to-live of a TMDB details payload, in seconds
pub const DETAILS_TTL: u64 = 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    TrendingWeek,
    PopularMovies,
    TmdbDetails(MediaType, i64),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::TrendingWeek => write!(f, "trending_week"),
            CacheKey::PopularMovies => write!(f, "popular_movies"),
            CacheKey::TmdbDetails(media_type, id) => write!(f, "tmdb:{}:{}", media_type, id),
        }
    }
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Cache handler for storing and retrieving JSON values
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Initiates a graceful shutdown of the cache writer
    ///
    /// Sends a shutdown signal to the writer task, which flushes all
    /// pending writes before exiting.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a new Cache instance with an async write background task
    ///
    /// This spawns a background task that processes cache writes asynchronously,
    /// preventing cache operations from blocking API responses.
    pub fn new(backend: Arc<dyn CacheBackend>) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let writer_backend = backend.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(writer_backend, write_rx, shutdown_rx).await;
        });

        let cache = Self { backend, write_tx };
        let handle = CacheWriterHandle { shutdown_tx };

        (cache, handle)
    }

    /// Background task that processes cache write messages
    ///
    /// On shutdown signal, flushes every message already queued before exiting.
    async fn cache_writer_task(
        backend: Arc<dyn CacheBackend>,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(backend = backend.name(), "Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = backend.set_ex(&msg.key, &msg.value, msg.ttl).await {
                        tracing::error!(error = %e, key = %msg.key, "Failed to write to cache");
                    }
                }
                // A dropped handle disables this branch instead of stopping the writer
                Some(()) = shutdown_rx.recv() => {
                    let mut flushed = 0;
                    while let Ok(msg) = write_rx.try_recv() {
                        if let Err(e) = backend.set_ex(&msg.key, &msg.value, msg.ttl).await {
                            tracing::error!(
                                error = %e,
                                "Failed to flush cache write during shutdown"
                            );
                        }
                        flushed += 1;
                    }

                    tracing::info!(flushed, "Cache writer task stopped");
                    break;
                }
                else => break,
            }
        }
    }

    /// Retrieves a value from the cache by key
    ///
    /// Returns `None` when the key is absent or expired.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let cached = self.backend.get(&key.to_string()).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Stores a value in the cache asynchronously without blocking
    ///
    /// The value is serialized here and handed to the writer task, so this
    /// returns before the backend write happens.
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: json,
            ttl,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::cache::MemoryBackend;
    use std::time::Duration;

    #[test]
    fn test_cache_key_display() {
        assert_eq!(CacheKey::TrendingWeek.to_string(), "trending_week");
        assert_eq!(CacheKey::PopularMovies.to_string(), "popular_movies");
        assert_eq!(
            CacheKey::TmdbDetails(MediaType::Tv, 1396).to_string(),
            "tmdb:tv:1396"
        );
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let (cache, _handle) = Cache::new(Arc::new(MemoryBackend::new()));
        let retrieved: Option<Vec<String>> =
            cache.get_from_cache(&CacheKey::TrendingWeek).await.unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    async fn test_set_in_background_writes_to_cache() {
        let (cache, _handle) = Cache::new(Arc::new(MemoryBackend::new()));
        let value = vec!["item1".to_string(), "item2".to_string()];

        cache.set_in_background(&CacheKey::PopularMovies, &value, 60);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let retrieved: Option<Vec<String>> =
            cache.get_from_cache(&CacheKey::PopularMovies).await.unwrap();
        assert_eq!(retrieved, Some(value));
    }

    #[tokio::test]
    async fn test_cache_writer_graceful_shutdown() {
        let backend = Arc::new(MemoryBackend::new());
        let (cache, handle) = Cache::new(backend.clone());
        let value = vec!["shutdown_test".to_string()];

        cache.set_in_background(&CacheKey::TrendingWeek, &value, 60);
        handle.shutdown().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let retrieved: Option<Vec<String>> =
            cache.get_from_cache(&CacheKey::TrendingWeek).await.unwrap();
        assert_eq!(retrieved, Some(value));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_an_error() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_ex("trending_week", "not json", 60).await.unwrap();
        let (cache, _handle) = Cache::new(backend);

        let result: AppResult<Option<Vec<String>>> =
            cache.get_from_cache(&CacheKey::TrendingWeek).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}

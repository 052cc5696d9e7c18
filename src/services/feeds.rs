use crate::{
    db::cache::{Cache, CacheKey, DETAILS_TTL, POPULAR_TTL, TRENDING_TTL},
    error::AppResult,
    models::{MediaType, TimeWindow, TmdbDetails, TmdbTitle},
    services::providers::MetadataProvider,
};

/// Number of titles kept in each home page feed
pub const FEED_SIZE: usize = 12;

/// This week's trending titles across movies and series
pub async fn fetch_trending(provider: &dyn MetadataProvider) -> Vec<TmdbTitle> {
    let mut titles = provider.trending(None, TimeWindow::Week).await;
    titles.truncate(FEED_SIZE);
    titles
}

/// Currently popular movies
pub async fn fetch_popular(provider: &dyn MetadataProvider) -> Vec<TmdbTitle> {
    let mut titles = provider.popular(MediaType::Movie).await;
    titles.truncate(FEED_SIZE);
    titles
}

/// Trending feed, served from cache when possible
pub async fn trending(cache: &Cache, provider: &dyn MetadataProvider) -> Vec<TmdbTitle> {
    read_through(cache, CacheKey::TrendingWeek, TRENDING_TTL, fetch_trending(provider)).await
}

/// Popular movies feed, served from cache when possible
pub async fn popular(cache: &Cache, provider: &dyn MetadataProvider) -> Vec<TmdbTitle> {
    read_through(cache, CacheKey::PopularMovies, POPULAR_TTL, fetch_popular(provider)).await
}

/// TMDB details for the film page
pub async fn film_details(
    cache: &Cache,
    provider: &dyn MetadataProvider,
    media_type: MediaType,
    tmdb_id: i64,
) -> AppResult<TmdbDetails> {
    crate::cached!(
        cache,
        CacheKey::TmdbDetails(media_type, tmdb_id),
        DETAILS_TTL,
        provider.details(tmdb_id, media_type)
    )
}

/// Feeds never fail: a broken cache counts as a miss and empty lists are not stored
async fn read_through(
    cache: &Cache,
    key: CacheKey,
    ttl: u64,
    fetch: impl std::future::Future<Output = Vec<TmdbTitle>>,
) -> Vec<TmdbTitle> {
    match cache.get_from_cache::<Vec<TmdbTitle>>(&key).await {
        Ok(Some(titles)) => {
            tracing::debug!(key = %key, "Cache hit");
            return titles;
        }
        Ok(None) => tracing::debug!(key = %key, "Cache miss"),
        Err(e) => tracing::warn!(error = %e, key = %key, "Cache read failed"),
    }

    let titles = fetch.await;
    if !titles.is_empty() {
        cache.set_in_background(&key, &titles, ttl);
    }
    titles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::cache::MemoryBackend, error::AppError, services::providers::MockMetadataProvider,
    };
    use std::{sync::Arc, time::Duration};

    fn title(id: i64) -> TmdbTitle {
        TmdbTitle {
            id,
            media_type: Some(MediaType::Movie),
            title: Some(format!("Film {}", id)),
            name: None,
            overview: None,
            release_date: None,
            first_air_date: None,
            poster_path: None,
            vote_average: None,
            vote_count: None,
            genre_ids: vec![],
        }
    }

    #[tokio::test]
    async fn test_trending_is_cached_and_truncated() {
        let (cache, _handle) = Cache::new(Arc::new(MemoryBackend::new()));
        let mut provider = MockMetadataProvider::new();
        provider
            .expect_trending()
            .withf(|media_type, window| media_type.is_none() && *window == TimeWindow::Week)
            .times(1)
            .returning(|_, _| (1..=20).map(title).collect());

        let first = trending(&cache, &provider).await;
        assert_eq!(first.len(), FEED_SIZE);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = trending(&cache, &provider).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_feed_not_cached() {
        let (cache, _handle) = Cache::new(Arc::new(MemoryBackend::new()));
        let mut provider = MockMetadataProvider::new();
        provider
            .expect_popular()
            .times(2)
            .returning(|_| Vec::new());

        assert!(popular(&cache, &provider).await.is_empty());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(popular(&cache, &provider).await.is_empty());
    }

    #[tokio::test]
    async fn test_film_details_cached() {
        let (cache, _handle) = Cache::new(Arc::new(MemoryBackend::new()));
        let mut provider = MockMetadataProvider::new();
        provider.expect_details().times(1).returning(|id, _| {
            Ok(TmdbDetails {
                id: Some(id),
                poster_path: Some("/poster.jpg".to_string()),
                ..Default::default()
            })
        });

        let first = film_details(&cache, &provider, MediaType::Movie, 603)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = film_details(&cache, &provider, MediaType::Movie, 603)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(second.poster_path.as_deref(), Some("/poster.jpg"));
    }

    #[tokio::test]
    async fn test_film_details_error_propagates() {
        let (cache, _handle) = Cache::new(Arc::new(MemoryBackend::new()));
        let mut provider = MockMetadataProvider::new();
        provider
            .expect_details()
            .returning(|_, _| Err(AppError::ExternalApi("boom".to_string())));

        let result = film_details(&cache, &provider, MediaType::Tv, 1).await;
        assert!(matches!(result, Err(AppError::ExternalApi(_))));
    }
}

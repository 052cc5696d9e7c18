/// Periodic refresh of the home page feeds
///
/// Two independent tasks keep `trending_week` and `popular_movies` warm.
/// Each runs immediately on spawn and then once per interval.
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    db::cache::{Cache, CacheKey, POPULAR_TTL, TRENDING_TTL},
    models::TmdbTitle,
    services::{feeds, providers::MetadataProvider},
};

const MIN_INTERVAL: Duration = Duration::from_secs(1);

pub struct Refresher;

/// Handle for stopping the refresh tasks
pub struct RefresherHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl RefresherHandle {
    /// Signals both tasks to stop and waits for them to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Refresh task panicked");
            }
        }
        tracing::info!("Cache refresher stopped");
    }
}

#[derive(Clone, Copy)]
enum Feed {
    Trending,
    Popular,
}

impl Feed {
    fn name(&self) -> &'static str {
        match self {
            Feed::Trending => "trending",
            Feed::Popular => "popular",
        }
    }

    fn key(&self) -> CacheKey {
        match self {
            Feed::Trending => CacheKey::TrendingWeek,
            Feed::Popular => CacheKey::PopularMovies,
        }
    }

    fn ttl(&self) -> u64 {
        match self {
            Feed::Trending => TRENDING_TTL,
            Feed::Popular => POPULAR_TTL,
        }
    }

    async fn fetch(&self, provider: &dyn MetadataProvider) -> Vec<TmdbTitle> {
        match self {
            Feed::Trending => feeds::fetch_trending(provider).await,
            Feed::Popular => feeds::fetch_popular(provider).await,
        }
    }
}

impl Refresher {
    pub fn spawn(
        cache: Cache,
        provider: Arc<dyn MetadataProvider>,
        trending_every: Duration,
        popular_every: Duration,
    ) -> RefresherHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = [(Feed::Trending, trending_every), (Feed::Popular, popular_every)]
            .into_iter()
            .map(|(feed, every)| {
                tokio::spawn(Self::run(
                    feed,
                    every.max(MIN_INTERVAL),
                    cache.clone(),
                    provider.clone(),
                    shutdown_rx.clone(),
                ))
            })
            .collect();

        tracing::info!(
            trending_secs = trending_every.as_secs(),
            popular_secs = popular_every.as_secs(),
            "Cache refresher started"
        );

        RefresherHandle { shutdown_tx, tasks }
    }

    async fn run(
        feed: Feed,
        every: Duration,
        cache: Cache,
        provider: Arc<dyn MetadataProvider>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(every);

        loop {
            tokio::select! {
                _ = ticker.tick() => Self::refresh(feed, &cache, provider.as_ref()).await,
                _ = shutdown_rx.changed() => break,
            }
        }
    }

    async fn refresh(feed: Feed, cache: &Cache, provider: &dyn MetadataProvider) {
        let titles = feed.fetch(provider).await;
        if titles.is_empty() {
            tracing::warn!(feed = feed.name(), "Refresh returned no items, keeping cache");
            return;
        }

        cache.set_in_background(&feed.key(), &titles, feed.ttl());
        tracing::info!("Updated {} cache: {} items", feed.name(), titles.len());
    }
}

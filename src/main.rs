use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinema_tracker::{
    api::{create_router, AppState},
    auth::AuthService,
    config::{CacheBackendKind, Config, StoreBackend},
    db::{
        self,
        cache::{create_redis_client, CacheBackend, MemoryBackend, RedisBackend},
        Cache, MemoryRepository, PgRepository, Repository,
    },
    services::{MetadataProvider, Refresher, TmdbProvider},
};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinema_tracker=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let repo: Arc<dyn Repository> = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = db::create_pool(&config.database_url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db::run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;
            Arc::new(PgRepository::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryRepository::new())
        }
    };

    let cache_backend: Arc<dyn CacheBackend> = match config.cache_backend {
        CacheBackendKind::Redis => {
            let client = create_redis_client(&config.redis_url)?;
            let backend = RedisBackend::connect(client)
                .await
                .context("Failed to connect to Redis")?;
            Arc::new(backend)
        }
        CacheBackendKind::Memory => Arc::new(MemoryBackend::new()),
    };
    tracing::info!(backend = cache_backend.name(), "Cache initialized");
    let (cache, cache_writer) = Cache::new(cache_backend);

    let provider: Arc<dyn MetadataProvider> = Arc::new(TmdbProvider::new(
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.tmdb_image_url.clone(),
    )?);

    let refresher = Refresher::spawn(
        cache.clone(),
        provider.clone(),
        config.trending_interval(),
        config.popular_interval(),
    );

    let auth = AuthService::new(&config.jwt_secret, config.bcrypt_cost);
    let state = AppState::new(repo, cache, provider, auth);
    let app = create_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    refresher.shutdown().await;
    cache_writer.shutdown().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

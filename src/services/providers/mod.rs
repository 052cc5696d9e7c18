/// External metadata provider abstraction
///
/// The application only talks to TMDB, but handlers and services depend on
/// this trait so the catalog can be stubbed in tests. List lookups are
/// best-effort and degrade to an empty list; detail lookups report failures.
use crate::{
    error::AppResult,
    models::{MediaType, TimeWindow, TmdbDetails, TmdbTitle},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Trait for movie/TV metadata providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Search movies and series by title
    ///
    /// Returns an empty list on any failure.
    async fn search(&self, query: &str) -> Vec<TmdbTitle>;

    /// Fetch full details of one title
    ///
    /// Unlike the list lookups this fails loudly, since importing a title
    /// cannot proceed without them.
    async fn details(&self, tmdb_id: i64, media_type: MediaType) -> AppResult<TmdbDetails>;

    /// Trending titles; `None` means all media types
    async fn trending(&self, media_type: Option<MediaType>, window: TimeWindow) -> Vec<TmdbTitle>;

    async fn popular(&self, media_type: MediaType) -> Vec<TmdbTitle>;

    async fn top_rated(&self, media_type: MediaType) -> Vec<TmdbTitle>;

    /// Titles TMDB considers similar to the given one
    async fn similar(&self, tmdb_id: i64, media_type: MediaType) -> Vec<TmdbTitle>;

    /// Absolute image URL for a poster path
    fn poster_url(&self, poster_path: &str) -> String;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        Film, FilmSummary, Genre, NewFilm, NewUser, RatingStats, Review, ReviewWithAuthor,
        StatusCounts, User, WatchState, WatchStatus, WatchlistEntry,
    },
};

/// Persistence for users, the local catalog, watch statuses and reviews
///
/// Implemented by [`super::PgRepository`] for production and
/// [`super::MemoryRepository`] for development and tests. All list operations
/// return films with their genres attached.
#[async_trait::async_trait]
pub trait Repository: Send + Sync {
    // Users

    /// Inserts a user, failing with `Conflict` if the username is taken
    async fn create_user(&self, user: NewUser) -> AppResult<User>;

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    // Catalog

    async fn get_or_create_genre(&self, name: &str) -> AppResult<Genre>;

    async fn find_film(&self, id: i64) -> AppResult<Option<Film>>;

    async fn find_film_by_tmdb_id(&self, tmdb_id: i64) -> AppResult<Option<Film>>;

    /// Returns the film with the same `tmdb_id` if one exists, otherwise inserts
    ///
    /// The boolean is true when a new row was created. Films without a
    /// `tmdb_id` are always inserted.
    async fn get_or_create_film(&self, film: NewFilm) -> AppResult<(Film, bool)>;

    /// Links a genre to a film; linking twice is a no-op
    async fn add_film_genre(&self, film_id: i64, genre_id: i64) -> AppResult<()>;

    /// Films sharing at least one genre with `film_id`, best rated first
    async fn films_sharing_genres(
        &self,
        film_id: i64,
        limit: usize,
    ) -> AppResult<Vec<FilmSummary>>;

    // Watch statuses

    async fn upsert_watch_status(
        &self,
        user_id: Uuid,
        film_id: i64,
        status: WatchState,
    ) -> AppResult<(WatchStatus, bool)>;

    async fn find_watch_status(
        &self,
        user_id: Uuid,
        film_id: i64,
    ) -> AppResult<Option<WatchStatus>>;

    /// The user's entries, most recently updated first
    async fn list_watchlist(
        &self,
        user_id: Uuid,
        status: Option<WatchState>,
    ) -> AppResult<Vec<WatchlistEntry>>;

    async fn status_counts(&self, user_id: Uuid) -> AppResult<StatusCounts>;

    /// Maps each of the given TMDB ids the user tracks to its status
    async fn statuses_for_tmdb_ids(
        &self,
        user_id: Uuid,
        tmdb_ids: &[i64],
    ) -> AppResult<HashMap<i64, WatchState>>;

    // Reviews

    async fn upsert_review(
        &self,
        user_id: Uuid,
        film_id: i64,
        rating: i16,
        text: &str,
    ) -> AppResult<(Review, bool)>;

    async fn find_review(&self, user_id: Uuid, film_id: i64) -> AppResult<Option<Review>>;

    async fn user_reviews(&self, user_id: Uuid) -> AppResult<Vec<Review>>;

    /// Latest reviews of a film, most recently updated first
    async fn film_reviews(&self, film_id: i64, limit: usize) -> AppResult<Vec<ReviewWithAuthor>>;

    async fn film_rating_stats(&self, film_id: i64) -> AppResult<RatingStats>;

    async fn user_rating_stats(&self, user_id: Uuid) -> AppResult<RatingStats>;
}

use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        Film, FilmSummary, FilmType, Genre, NewFilm, NewUser, RatingStats, Review,
        ReviewWithAuthor, StatusCounts, User, WatchState, WatchStatus, WatchlistEntry,
    },
};

/// Film columns without the genre relation
#[derive(Debug, Clone)]
struct FilmRecord {
    id: i64,
    title: String,
    description: String,
    tmdb_id: Option<i64>,
    start_year: Option<i32>,
    end_year: Option<i32>,
    film_type: FilmType,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    genres: BTreeMap<i64, Genre>,
    films: BTreeMap<i64, FilmRecord>,
    /// (film_id, genre_id) links
    film_genres: BTreeSet<(i64, i64)>,
    watch_statuses: Vec<WatchStatus>,
    reviews: Vec<Review>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn hydrate(&self, record: &FilmRecord) -> Film {
        let genres = self
            .film_genres
            .range((record.id, i64::MIN)..=(record.id, i64::MAX))
            .filter_map(|(_, genre_id)| self.genres.get(genre_id).cloned())
            .collect();

        Film {
            id: record.id,
            title: record.title.clone(),
            description: record.description.clone(),
            tmdb_id: record.tmdb_id,
            start_year: record.start_year,
            end_year: record.end_year,
            film_type: record.film_type,
            genres,
        }
    }

    fn film(&self, id: i64) -> Option<Film> {
        self.films.get(&id).map(|record| self.hydrate(record))
    }

    fn rating_stats<'a>(&self, reviews: impl Iterator<Item = &'a Review>) -> RatingStats {
        RatingStats::from_ratings(reviews.map(|r| r.rating))
    }
}

/// In-process repository backed by a single lock
///
/// Used for local development without Postgres and by the API test suite.
/// Data does not survive a restart.
#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Best average rating first, unrated films last, newest id breaking ties
fn compare_summaries(a: &FilmSummary, b: &FilmSummary) -> Ordering {
    let by_rating = match (a.avg_rating, b.avg_rating) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_rating.then_with(|| b.film.id.cmp(&a.film.id))
}

#[async_trait::async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut state = self.state.write().await;

        if state.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' is already taken",
                user.username
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_or_create_genre(&self, name: &str) -> AppResult<Genre> {
        let mut state = self.state.write().await;

        if let Some(genre) = state.genres.values().find(|g| g.name == name) {
            return Ok(genre.clone());
        }

        let genre = Genre {
            id: state.next_id(),
            name: name.to_string(),
        };
        state.genres.insert(genre.id, genre.clone());
        Ok(genre)
    }

    async fn find_film(&self, id: i64) -> AppResult<Option<Film>> {
        Ok(self.state.read().await.film(id))
    }

    async fn find_film_by_tmdb_id(&self, tmdb_id: i64) -> AppResult<Option<Film>> {
        let state = self.state.read().await;
        Ok(state
            .films
            .values()
            .find(|f| f.tmdb_id == Some(tmdb_id))
            .map(|record| state.hydrate(record)))
    }

    async fn get_or_create_film(&self, film: NewFilm) -> AppResult<(Film, bool)> {
        film.validate()?;
        let mut state = self.state.write().await;

        if let Some(tmdb_id) = film.tmdb_id {
            if let Some(existing) = state.films.values().find(|f| f.tmdb_id == Some(tmdb_id)) {
                return Ok((state.hydrate(existing), false));
            }
        }

        let record = FilmRecord {
            id: state.next_id(),
            title: film.title,
            description: film.description,
            tmdb_id: film.tmdb_id,
            start_year: film.start_year,
            end_year: film.end_year,
            film_type: film.film_type,
        };
        let created = state.hydrate(&record);
        state.films.insert(record.id, record);
        Ok((created, true))
    }

    async fn add_film_genre(&self, film_id: i64, genre_id: i64) -> AppResult<()> {
        let mut state = self.state.write().await;

        if !state.films.contains_key(&film_id) {
            return Err(AppError::NotFound(format!("Film {}", film_id)));
        }
        if !state.genres.contains_key(&genre_id) {
            return Err(AppError::NotFound(format!("Genre {}", genre_id)));
        }

        state.film_genres.insert((film_id, genre_id));
        Ok(())
    }

    async fn films_sharing_genres(
        &self,
        film_id: i64,
        limit: usize,
    ) -> AppResult<Vec<FilmSummary>> {
        let state = self.state.read().await;

        let genre_ids: BTreeSet<i64> = state
            .film_genres
            .iter()
            .filter(|(f, _)| *f == film_id)
            .map(|(_, g)| *g)
            .collect();

        let candidate_ids: BTreeSet<i64> = state
            .film_genres
            .iter()
            .filter(|(f, g)| *f != film_id && genre_ids.contains(g))
            .map(|(f, _)| *f)
            .collect();

        let mut summaries: Vec<FilmSummary> = candidate_ids
            .into_iter()
            .filter_map(|id| state.film(id))
            .map(|film| {
                let stats =
                    state.rating_stats(state.reviews.iter().filter(|r| r.film_id == film.id));
                FilmSummary {
                    film,
                    avg_rating: stats.avg_rating,
                }
            })
            .collect();

        summaries.sort_by(compare_summaries);
        summaries.truncate(limit);
        Ok(summaries)
    }

    async fn upsert_watch_status(
        &self,
        user_id: Uuid,
        film_id: i64,
        status: WatchState,
    ) -> AppResult<(WatchStatus, bool)> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        if let Some(existing) = state
            .watch_statuses
            .iter_mut()
            .find(|ws| ws.user_id == user_id && ws.film_id == film_id)
        {
            existing.status = status;
            existing.updated_at = now;
            return Ok((existing.clone(), false));
        }

        let watch_status = WatchStatus {
            id: state.next_id(),
            user_id,
            film_id,
            status,
            created_at: now,
            updated_at: now,
        };
        state.watch_statuses.push(watch_status.clone());
        Ok((watch_status, true))
    }

    async fn find_watch_status(
        &self,
        user_id: Uuid,
        film_id: i64,
    ) -> AppResult<Option<WatchStatus>> {
        let state = self.state.read().await;
        Ok(state
            .watch_statuses
            .iter()
            .find(|ws| ws.user_id == user_id && ws.film_id == film_id)
            .cloned())
    }

    async fn list_watchlist(
        &self,
        user_id: Uuid,
        status: Option<WatchState>,
    ) -> AppResult<Vec<WatchlistEntry>> {
        let state = self.state.read().await;

        let mut statuses: Vec<&WatchStatus> = state
            .watch_statuses
            .iter()
            .filter(|ws| ws.user_id == user_id)
            .filter(|ws| status.map_or(true, |s| ws.status == s))
            .collect();
        statuses.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(statuses
            .into_iter()
            .filter_map(|ws| {
                state.film(ws.film_id).map(|film| WatchlistEntry {
                    watch_status: ws.clone(),
                    film,
                    review: None,
                })
            })
            .collect())
    }

    async fn status_counts(&self, user_id: Uuid) -> AppResult<StatusCounts> {
        let state = self.state.read().await;
        let mut counts = StatusCounts::default();
        for ws in state.watch_statuses.iter().filter(|ws| ws.user_id == user_id) {
            counts.add(ws.status, 1);
        }
        Ok(counts)
    }

    async fn statuses_for_tmdb_ids(
        &self,
        user_id: Uuid,
        tmdb_ids: &[i64],
    ) -> AppResult<HashMap<i64, WatchState>> {
        let state = self.state.read().await;
        Ok(state
            .watch_statuses
            .iter()
            .filter(|ws| ws.user_id == user_id)
            .filter_map(|ws| {
                let tmdb_id = state.films.get(&ws.film_id)?.tmdb_id?;
                tmdb_ids.contains(&tmdb_id).then_some((tmdb_id, ws.status))
            })
            .collect())
    }

    async fn upsert_review(
        &self,
        user_id: Uuid,
        film_id: i64,
        rating: i16,
        text: &str,
    ) -> AppResult<(Review, bool)> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        if let Some(existing) = state
            .reviews
            .iter_mut()
            .find(|r| r.user_id == user_id && r.film_id == film_id)
        {
            existing.rating = rating;
            existing.text = text.to_string();
            existing.updated_at = now;
            return Ok((existing.clone(), false));
        }

        let review = Review {
            id: state.next_id(),
            user_id,
            film_id,
            rating,
            text: text.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.reviews.push(review.clone());
        Ok((review, true))
    }

    async fn find_review(&self, user_id: Uuid, film_id: i64) -> AppResult<Option<Review>> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .iter()
            .find(|r| r.user_id == user_id && r.film_id == film_id)
            .cloned())
    }

    async fn user_reviews(&self, user_id: Uuid) -> AppResult<Vec<Review>> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn film_reviews(&self, film_id: i64, limit: usize) -> AppResult<Vec<ReviewWithAuthor>> {
        let state = self.state.read().await;

        let mut reviews: Vec<&Review> = state
            .reviews
            .iter()
            .filter(|r| r.film_id == film_id)
            .collect();
        reviews.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(reviews
            .into_iter()
            .take(limit)
            .map(|review| ReviewWithAuthor {
                review: review.clone(),
                username: state
                    .users
                    .get(&review.user_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn film_rating_stats(&self, film_id: i64) -> AppResult<RatingStats> {
        let state = self.state.read().await;
        Ok(state.rating_stats(state.reviews.iter().filter(|r| r.film_id == film_id)))
    }

    async fn user_rating_stats(&self, user_id: Uuid) -> AppResult<RatingStats> {
        let state = self.state.read().await;
        Ok(state.rating_stats(state.reviews.iter().filter(|r| r.user_id == user_id)))
    }
}

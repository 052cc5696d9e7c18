use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    api::{AppJson, AppState},
    auth::{AuthUser, MaybeUser},
    error::{AppError, AppResult},
    models::{Film, FilmSummary, RatingStats, Review, ReviewWithAuthor, WatchStatus},
    services::{feeds, recommendations, tracking},
};

/// Number of reviews shown on a film page
const LATEST_REVIEWS: usize = 20;

#[derive(Debug, Serialize)]
pub struct FilmDetailResponse {
    pub film: Film,
    pub display_title: String,
    pub rating_stats: RatingStats,
    pub user_status: Option<WatchStatus>,
    pub user_review: Option<Review>,
    pub poster_url: Option<String>,
    pub tmdb_rating: Option<f64>,
    pub tmdb_vote_count: Option<i64>,
    pub reviews: Vec<ReviewWithAuthor>,
    pub recommendations: Vec<FilmSummary>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub watch_status: WatchStatus,
    pub created: bool,
}

/// `rating` may be a number or a numeric string
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub rating: Value,
    #[serde(default)]
    pub text: String,
}

impl ReviewRequest {
    /// The rating as an integer; range checks happen in the tracking service
    fn rating(&self) -> AppResult<i64> {
        let rating = match &self.rating {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        rating.ok_or_else(|| {
            AppError::InvalidInput("Please choose a rating from 1 to 10.".to_string())
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub review: Review,
    pub created: bool,
}

async fn load_film(state: &AppState, id: i64) -> AppResult<Film> {
    state
        .repo
        .find_film(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Film {} not found", id)))
}

/// Everything the film page shows
///
/// TMDB artwork and ratings are optional extras; a failed lookup just leaves
/// them empty.
pub async fn detail(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> AppResult<Json<FilmDetailResponse>> {
    let film = load_film(&state, id).await?;
    let repo = state.repo.as_ref();

    let rating_stats = tracking::get_film_rating_stats(repo, film.id).await?;
    let (user_status, user_review) = match &user {
        Some(user) => (
            repo.find_watch_status(user.id, film.id).await?,
            repo.find_review(user.id, film.id).await?,
        ),
        None => (None, None),
    };

    let details = match film.tmdb_id {
        Some(tmdb_id) => {
            let provider = state.provider.as_ref();
            match feeds::film_details(&state.cache, provider, film.media_type(), tmdb_id).await {
                Ok(details) => Some(details),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        film_id = film.id,
                        tmdb_id,
                        "TMDB details unavailable"
                    );
                    None
                }
            }
        }
        None => None,
    };

    let reviews = repo.film_reviews(film.id, LATEST_REVIEWS).await?;
    let recommendations = recommendations::similar_local_films(repo, film.id).await?;

    Ok(Json(FilmDetailResponse {
        display_title: film.to_string(),
        rating_stats,
        user_status,
        user_review,
        poster_url: details
            .as_ref()
            .and_then(|d| d.poster_path.as_deref())
            .map(|path| state.provider.poster_url(path)),
        tmdb_rating: details.as_ref().and_then(|d| d.vote_average),
        tmdb_vote_count: details.as_ref().and_then(|d| d.vote_count),
        reviews,
        recommendations,
        film,
    }))
}

pub async fn set_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<StatusRequest>,
) -> AppResult<Json<StatusResponse>> {
    let film = load_film(&state, id).await?;
    let status = tracking::parse_status(&payload.status)?;

    let (watch_status, created) =
        tracking::set_watch_status(state.repo.as_ref(), user.id, film.id, status).await?;

    Ok(Json(StatusResponse {
        watch_status,
        created,
    }))
}

pub async fn review(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<ReviewRequest>,
) -> AppResult<Json<ReviewResponse>> {
    let film = load_film(&state, id).await?;
    let rating = payload.rating()?;

    let (review, created) = tracking::upsert_review(
        state.repo.as_ref(),
        user.id,
        film.id,
        rating,
        &payload.text,
    )
    .await?;

    Ok(Json(ReviewResponse { review, created }))
}

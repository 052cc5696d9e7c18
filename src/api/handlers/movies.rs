use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::{annotate_titles, AnnotatedTitle};
use crate::{
    api::{AppJson, AppState},
    auth::{AuthUser, MaybeUser},
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{Film, MediaType, WatchStatus},
    services::{catalog, tracking},
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub title: AnnotatedTitle,
    pub in_database: bool,
    pub film_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub tmdb_id: i64,
    pub media_type: String,
}

/// Fields are optional so a missing one is a 400 rather than a rejection
#[derive(Debug, Deserialize)]
pub struct QuickAddRequest {
    pub tmdb_id: Option<i64>,
    pub media_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuickAddResponse {
    pub film: Film,
    pub watch_status: WatchStatus,
    pub message: String,
}

/// Searches TMDB and marks which results are already in the local catalog
pub async fn search(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    let query = params.q.unwrap_or_default().trim().to_string();
    if query.is_empty() {
        return Ok(Json(SearchResponse {
            query,
            results: vec![],
        }));
    }

    let titles = state.provider.search(&query).await;
    let annotated = annotate_titles(&state, user.map(|u| u.id), titles).await?;

    let mut results = Vec::with_capacity(annotated.len());
    for title in annotated {
        let film_id = state
            .repo
            .find_film_by_tmdb_id(title.title.id)
            .await?
            .map(|film| film.id);
        results.push(SearchResult {
            in_database: film_id.is_some(),
            film_id,
            title,
        });
    }

    Ok(Json(SearchResponse { query, results }))
}

/// Imports a TMDB title into the catalog
pub async fn add(
    State(state): State<AppState>,
    AppJson(payload): AppJson<AddRequest>,
) -> AppResult<Json<Film>> {
    let media_type: MediaType = payload.media_type.parse()?;
    let details = state.provider.details(payload.tmdb_id, media_type).await?;
    let film = catalog::import_tmdb_title(state.repo.as_ref(), &details).await?;
    Ok(Json(film))
}

/// Imports a title if needed and puts it on the user's watchlist in one step
pub async fn quick_add(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<QuickAddRequest>,
) -> AppResult<Json<QuickAddResponse>> {
    let (Some(tmdb_id), Some(media_type), Some(status)) =
        (payload.tmdb_id, payload.media_type, payload.status)
    else {
        return Err(AppError::InvalidInput("Missing required fields".to_string()));
    };

    let media_type: MediaType = media_type.parse()?;
    let status = tracking::parse_status(&status)?;

    let film =
        catalog::find_or_import(state.repo.as_ref(), state.provider.as_ref(), tmdb_id, media_type)
            .await?;
    let (watch_status, _) =
        tracking::set_watch_status(state.repo.as_ref(), user.id, film.id, status).await?;

    tracing::info!(
        request_id = %request_id,
        user_id = %user.id,
        film_id = film.id,
        status = %status,
        "Quick add completed"
    );

    let message = format!("Added \"{}\" to {}", film.title, status.label());
    Ok(Json(QuickAddResponse {
        film,
        watch_status,
        message,
    }))
}

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::{
    api::AppState,
    auth::AuthUser,
    error::AppResult,
    models::{WatchState, WatchlistEntry},
    services::tracking,
};

#[derive(Debug, Serialize)]
pub struct WatchlistResponse {
    pub status: WatchState,
    pub label: &'static str,
    pub entries: Vec<WatchlistEntry>,
}

/// The user's titles in one state, most recently updated first
pub async fn by_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(status): Path<String>,
) -> AppResult<Json<WatchlistResponse>> {
    let status = tracking::parse_status(&status)?;
    let entries =
        tracking::get_user_watchlist_by_status(state.repo.as_ref(), user.id, status).await?;

    Ok(Json(WatchlistResponse {
        status,
        label: status.label(),
        entries,
    }))
}

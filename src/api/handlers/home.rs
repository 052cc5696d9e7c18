use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use super::annotate_titles;
use crate::{api::AppState, auth::MaybeUser, error::AppResult, services::{feeds, tracking}};

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Landing flag for visitors, a personal dashboard for users
pub async fn index(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> AppResult<Json<Value>> {
    let Some(user) = user else {
        return Ok(Json(json!({ "show_landing": true })));
    };

    let counts = tracking::status_counts(state.repo.as_ref(), user.id).await?;
    let (trending, popular) = tokio::join!(
        feeds::trending(&state.cache, state.provider.as_ref()),
        feeds::popular(&state.cache, state.provider.as_ref()),
    );

    let trending = annotate_titles(&state, Some(user.id), trending).await?;
    let popular = annotate_titles(&state, Some(user.id), popular).await?;

    Ok(Json(json!({
        "show_landing": false,
        "username": user.username,
        "counts": {
            "planned": counts.planned,
            "watching": counts.watching,
            "watched": counts.watched,
            "dropped": counts.dropped,
            "total": counts.total(),
        },
        "trending": trending,
        "popular": popular,
    })))
}

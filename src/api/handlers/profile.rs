use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    api::AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{User, UserProfile},
    services::tracking,
};

async fn build_profile(state: &AppState, user: &User, viewer: &User) -> AppResult<UserProfile> {
    let repo = state.repo.as_ref();
    let counts = tracking::status_counts(repo, user.id).await?;
    let ratings = tracking::user_rating_stats(repo, user.id).await?;
    Ok(UserProfile::new(user, viewer, counts, ratings))
}

pub async fn own_profile(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(build_profile(&state, &viewer, &viewer).await?))
}

pub async fn user_profile(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    Path(username): Path<String>,
) -> AppResult<Json<UserProfile>> {
    let user = state
        .repo
        .find_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", username)))?;

    Ok(Json(build_profile(&state, &user, &viewer).await?))
}

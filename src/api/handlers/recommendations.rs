use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::annotate_titles;
use crate::{api::AppState, auth::AuthUser, error::AppResult, services::recommendations};

pub async fn for_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Value>> {
    let titles =
        recommendations::recommend_for_user(state.repo.as_ref(), state.provider.as_ref(), user.id)
            .await?;
    let recommendations = annotate_titles(&state, Some(user.id), titles).await?;

    Ok(Json(json!({ "recommendations": recommendations })))
}

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::{
    api::{AppJson, AppState},
    error::{AppError, AppResult},
    models::{NewUser, User},
};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Registers an account and signs it in
pub async fn signup(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let username = payload.username.trim().to_string();
    NewUser::validate_username(&username)?;
    NewUser::validate_password(&payload.password)?;

    let password_hash = state.auth.hash_password(&payload.password).await?;
    let user = state
        .repo
        .create_user(NewUser {
            username,
            email: payload.email.filter(|e| !e.trim().is_empty()),
            password_hash,
        })
        .await?;
    let token = state.auth.generate_token(&user)?;

    tracing::info!(user_id = %user.id, username = %user.username, "User signed up");

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let invalid = || AppError::Unauthorized("Invalid username or password".to_string());

    let user = state
        .repo
        .find_user_by_username(payload.username.trim())
        .await?
        .ok_or_else(invalid)?;

    if !state
        .auth
        .verify_password(&payload.password, &user.password_hash)
        .await?
    {
        tracing::info!(username = %user.username, "Rejected login");
        return Err(invalid());
    }

    let token = state.auth.generate_token(&user)?;
    Ok(Json(AuthResponse { token, user }))
}

/// Tokens are stateless; the client forgets its token
pub async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

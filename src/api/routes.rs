use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers::{auth, films, home, movies, profile, recommendations, watchlist};
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(home::health_check))
        .route("/", get(home::index))
        // Accounts
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        // TMDB catalog
        .route("/movies/search", get(movies::search))
        .route("/movies/add", post(movies::add))
        .route("/movies/quick-add", post(movies::quick_add))
        // Local films
        .route("/films/:id", get(films::detail))
        .route("/films/:id/status", post(films::set_status))
        .route("/films/:id/review", post(films::review))
        // Users
        .route("/profile", get(profile::own_profile))
        .route("/profile/:username", get(profile::user_profile))
        .route("/watchlist/:status", get(watchlist::by_status))
        .route("/recommendations", get(recommendations::for_user))
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        // Outermost, so the trace span sees the request id
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub mod auth;
pub mod films;
pub mod home;
pub mod movies;
pub mod profile;
pub mod recommendations;
pub mod watchlist;

use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::AppState;
use crate::{
    error::AppResult,
    models::{MediaType, TmdbTitle, WatchState},
};

/// A TMDB title decorated with the viewer's tracking state
#[derive(Debug, Serialize)]
pub struct AnnotatedTitle {
    #[serde(flatten)]
    pub title: TmdbTitle,
    pub display_title: String,
    /// `media_type`, or what the payload shape implies when TMDB omits it
    pub kind: MediaType,
    pub year: Option<i32>,
    pub poster_url: Option<String>,
    pub user_status: Option<WatchState>,
}

/// Attaches poster URLs and, for a signed-in viewer, their watch statuses
pub(crate) async fn annotate_titles(
    state: &AppState,
    user_id: Option<Uuid>,
    titles: Vec<TmdbTitle>,
) -> AppResult<Vec<AnnotatedTitle>> {
    let statuses = match user_id {
        Some(user_id) => {
            let ids: Vec<i64> = titles.iter().map(|t| t.id).collect();
            state.repo.statuses_for_tmdb_ids(user_id, &ids).await?
        }
        None => HashMap::new(),
    };

    Ok(titles
        .into_iter()
        .map(|title| AnnotatedTitle {
            display_title: title.display_title().to_string(),
            kind: title.kind(),
            year: title.year(),
            poster_url: title
                .poster_path
                .as_deref()
                .map(|path| state.provider.poster_url(path)),
            user_status: statuses.get(&title.id).copied(),
            title,
        })
        .collect())
}

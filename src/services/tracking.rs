use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    db::Repository,
    error::AppResult,
    models::{RatingStats, Review, StatusCounts, WatchState, WatchStatus, WatchlistEntry},
};

/// Parses a status submitted by a client
pub fn parse_status(raw: &str) -> AppResult<WatchState> {
    raw.trim().parse()
}

/// Sets the user's status for a film, returning whether the entry is new
pub async fn set_watch_status(
    repo: &dyn Repository,
    user_id: Uuid,
    film_id: i64,
    status: WatchState,
) -> AppResult<(WatchStatus, bool)> {
    let (watch_status, created) = repo.upsert_watch_status(user_id, film_id, status).await?;

    tracing::info!(
        user_id = %user_id,
        film_id,
        status = %status,
        created,
        "Watch status saved"
    );

    Ok((watch_status, created))
}

/// Every watchlist entry of the user, most recently updated first
pub async fn get_user_watchlist(
    repo: &dyn Repository,
    user_id: Uuid,
) -> AppResult<Vec<WatchlistEntry>> {
    let entries = repo.list_watchlist(user_id, None).await?;
    attach_reviews(repo, user_id, entries).await
}

/// Watchlist entries in one state, with the user's review of each film
pub async fn get_user_watchlist_by_status(
    repo: &dyn Repository,
    user_id: Uuid,
    status: WatchState,
) -> AppResult<Vec<WatchlistEntry>> {
    let entries = repo.list_watchlist(user_id, Some(status)).await?;
    attach_reviews(repo, user_id, entries).await
}

pub async fn get_user_watched(
    repo: &dyn Repository,
    user_id: Uuid,
) -> AppResult<Vec<WatchlistEntry>> {
    get_user_watchlist_by_status(repo, user_id, WatchState::Watched).await
}

pub async fn get_user_planned(
    repo: &dyn Repository,
    user_id: Uuid,
) -> AppResult<Vec<WatchlistEntry>> {
    get_user_watchlist_by_status(repo, user_id, WatchState::Planned).await
}

pub async fn get_user_watching(
    repo: &dyn Repository,
    user_id: Uuid,
) -> AppResult<Vec<WatchlistEntry>> {
    get_user_watchlist_by_status(repo, user_id, WatchState::Watching).await
}

pub async fn get_user_dropped(
    repo: &dyn Repository,
    user_id: Uuid,
) -> AppResult<Vec<WatchlistEntry>> {
    get_user_watchlist_by_status(repo, user_id, WatchState::Dropped).await
}

pub async fn get_user_watched_count(repo: &dyn Repository, user_id: Uuid) -> AppResult<i64> {
    Ok(repo.status_counts(user_id).await?.watched)
}

pub async fn status_counts(repo: &dyn Repository, user_id: Uuid) -> AppResult<StatusCounts> {
    repo.status_counts(user_id).await
}

pub async fn get_film_rating_stats(repo: &dyn Repository, film_id: i64) -> AppResult<RatingStats> {
    repo.film_rating_stats(film_id).await
}

pub async fn user_rating_stats(repo: &dyn Repository, user_id: Uuid) -> AppResult<RatingStats> {
    repo.user_rating_stats(user_id).await
}

/// Creates or replaces the user's review of a film
///
/// The rating must lie within 1..=10. Surrounding whitespace of the text is
/// dropped.
pub async fn upsert_review(
    repo: &dyn Repository,
    user_id: Uuid,
    film_id: i64,
    rating: i64,
    text: &str,
) -> AppResult<(Review, bool)> {
    let rating = Review::validate_rating(rating)?;
    let (review, created) = repo
        .upsert_review(user_id, film_id, rating, text.trim())
        .await?;

    tracing::info!(user_id = %user_id, film_id, rating, created, "Review saved");

    Ok((review, created))
}

async fn attach_reviews(
    repo: &dyn Repository,
    user_id: Uuid,
    mut entries: Vec<WatchlistEntry>,
) -> AppResult<Vec<WatchlistEntry>> {
    if entries.is_empty() {
        return Ok(entries);
    }

    let mut reviews: HashMap<i64, Review> = repo
        .user_reviews(user_id)
        .await?
        .into_iter()
        .map(|review| (review.film_id, review))
        .collect();

    for entry in &mut entries {
        entry.review = reviews.remove(&entry.film.id);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryRepository,
        error::AppError,
        models::{Film, FilmType, NewFilm, NewUser, User},
    };

    async fn user(repo: &MemoryRepository, username: &str) -> User {
        repo.create_user(NewUser {
            username: username.to_string(),
            email: None,
            password_hash: "hash".to_string(),
        })
        .await
        .unwrap()
    }

    async fn film(repo: &MemoryRepository, title: &str, tmdb_id: i64) -> Film {
        let (film, _) = repo
            .get_or_create_film(NewFilm {
                title: title.to_string(),
                description: String::new(),
                tmdb_id: Some(tmdb_id),
                start_year: Some(2014),
                end_year: None,
                film_type: FilmType::Movie,
            })
            .await
            .unwrap();
        film
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("watching").unwrap(), WatchState::Watching);
        assert_eq!(parse_status(" dropped ").unwrap(), WatchState::Dropped);
        assert!(matches!(
            parse_status("binged"),
            Err(AppError::InvalidInput(msg)) if msg == "Invalid status"
        ));
    }

    #[tokio::test]
    async fn test_set_watch_status_updates_existing() {
        let repo = MemoryRepository::new();
        let alice = user(&repo, "alice").await;
        let interstellar = film(&repo, "Interstellar", 157336).await;

        let (first, created) =
            set_watch_status(&repo, alice.id, interstellar.id, WatchState::Planned)
                .await
                .unwrap();
        assert!(created);

        let (second, created) =
            set_watch_status(&repo, alice.id, interstellar.id, WatchState::Watched)
                .await
                .unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(second.status, WatchState::Watched);
        assert_eq!(second.created_at, first.created_at);

        assert_eq!(get_user_watched_count(&repo, alice.id).await.unwrap(), 1);
        assert!(get_user_planned(&repo, alice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_watchlist_by_status_attaches_reviews() {
        let repo = MemoryRepository::new();
        let alice = user(&repo, "alice").await;
        let arrival = film(&repo, "Arrival", 329865).await;
        let dune = film(&repo, "Dune", 438631).await;

        set_watch_status(&repo, alice.id, arrival.id, WatchState::Watched)
            .await
            .unwrap();
        set_watch_status(&repo, alice.id, dune.id, WatchState::Watched)
            .await
            .unwrap();
        upsert_review(&repo, alice.id, arrival.id, 9, "  Haunting.  ")
            .await
            .unwrap();

        let watched = get_user_watched(&repo, alice.id).await.unwrap();
        assert_eq!(watched.len(), 2);
        // Most recently updated first
        assert_eq!(watched[0].film.id, dune.id);
        assert!(watched[0].review.is_none());
        assert_eq!(
            watched[1].review.as_ref().map(|r| r.text.as_str()),
            Some("Haunting.")
        );

        let all = get_user_watchlist(&repo, alice.id).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_review_validates_rating() {
        let repo = MemoryRepository::new();
        let alice = user(&repo, "alice").await;
        let arrival = film(&repo, "Arrival", 329865).await;

        for rating in [0, 11, -3] {
            let result = upsert_review(&repo, alice.id, arrival.id, rating, "").await;
            assert!(matches!(result, Err(AppError::InvalidInput(_))));
        }

        let (review, created) = upsert_review(&repo, alice.id, arrival.id, 10, "")
            .await
            .unwrap();
        assert!(created);
        assert_eq!(review.rating, 10);
    }

    #[tokio::test]
    async fn test_rating_stats() {
        let repo = MemoryRepository::new();
        let alice = user(&repo, "alice").await;
        let bob = user(&repo, "bob").await;
        let arrival = film(&repo, "Arrival", 329865).await;

        let empty = get_film_rating_stats(&repo, arrival.id).await.unwrap();
        assert_eq!(empty.avg_rating, None);
        assert_eq!(empty.rating_count, 0);

        upsert_review(&repo, alice.id, arrival.id, 8, "").await.unwrap();
        upsert_review(&repo, bob.id, arrival.id, 5, "").await.unwrap();

        let stats = get_film_rating_stats(&repo, arrival.id).await.unwrap();
        assert_eq!(stats.avg_rating, Some(6.5));
        assert_eq!(stats.rating_count, 2);

        let alice_stats = user_rating_stats(&repo, alice.id).await.unwrap();
        assert_eq!(alice_stats.avg_rating, Some(8.0));
        assert_eq!(alice_stats.rating_count, 1);
    }

    #[tokio::test]
    async fn test_status_counts() {
        let repo = MemoryRepository::new();
        let alice = user(&repo, "alice").await;
        for (i, state) in WatchState::ALL.into_iter().enumerate() {
            let f = film(&repo, &format!("Film {}", i), 100 + i as i64).await;
            set_watch_status(&repo, alice.id, f.id, state).await.unwrap();
        }
        let extra = film(&repo, "Extra", 999).await;
        set_watch_status(&repo, alice.id, extra.id, WatchState::Watched)
            .await
            .unwrap();

        let counts = status_counts(&repo, alice.id).await.unwrap();
        assert_eq!(counts.watched, 2);
        assert_eq!(counts.planned, 1);
        assert_eq!(counts.total(), 5);
        assert!(get_user_watching(&repo, alice.id).await.unwrap().len() == 1);
        assert!(get_user_dropped(&repo, alice.id).await.unwrap().len() == 1);
    }
}

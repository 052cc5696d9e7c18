use std::collections::HashSet;
use uuid::Uuid;

use crate::{
    db::Repository,
    error::AppResult,
    models::{FilmSummary, TmdbTitle},
    services::providers::MetadataProvider,
};

/// Reviews rated at least this high seed the recommendations
const SEED_MIN_RATING: i16 = 7;
/// Number of favourite films whose similar titles are fetched
const SEED_LIMIT: usize = 5;
const RECOMMENDATION_LIMIT: usize = 20;
const SIMILAR_FILMS_LIMIT: usize = 8;

/// Recommends TMDB titles based on the films a user rated highly
///
/// Collects TMDB's similar titles for the user's top rated films, drops
/// anything the user already tracks or reviewed, and ranks the rest by
/// TMDB vote average.
pub async fn recommend_for_user(
    repo: &dyn Repository,
    provider: &dyn MetadataProvider,
    user_id: Uuid,
) -> AppResult<Vec<TmdbTitle>> {
    let reviews = repo.user_reviews(user_id).await?;

    let mut favourites: Vec<_> = reviews
        .iter()
        .filter(|review| review.rating >= SEED_MIN_RATING)
        .collect();
    favourites.sort_by(|a, b| {
        b.rating
            .cmp(&a.rating)
            .then_with(|| b.updated_at.cmp(&a.updated_at))
    });
    favourites.truncate(SEED_LIMIT);

    if favourites.is_empty() {
        tracing::debug!(user_id = %user_id, "No highly rated films to recommend from");
        return Ok(Vec::new());
    }

    // TMDB ids the user already knows about
    let mut known: HashSet<i64> = repo
        .list_watchlist(user_id, None)
        .await?
        .into_iter()
        .filter_map(|entry| entry.film.tmdb_id)
        .collect();
    for review in &reviews {
        if let Some(tmdb_id) = repo
            .find_film(review.film_id)
            .await?
            .and_then(|film| film.tmdb_id)
        {
            known.insert(tmdb_id);
        }
    }

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for review in favourites {
        let Some(film) = repo.find_film(review.film_id).await? else {
            continue;
        };
        let Some(tmdb_id) = film.tmdb_id else {
            continue;
        };

        for title in provider.similar(tmdb_id, film.media_type()).await {
            if known.contains(&title.id) || !seen.insert(title.id) {
                continue;
            }
            candidates.push(title);
        }
    }

    // Stable, so equal scores keep discovery order
    candidates.sort_by(|a, b| {
        b.vote_average
            .unwrap_or(0.0)
            .total_cmp(&a.vote_average.unwrap_or(0.0))
    });
    candidates.truncate(RECOMMENDATION_LIMIT);

    tracing::info!(
        user_id = %user_id,
        recommendations = candidates.len(),
        "Recommendations generated"
    );

    Ok(candidates)
}

/// Local films sharing a genre with the given one, best rated first
pub async fn similar_local_films(
    repo: &dyn Repository,
    film_id: i64,
) -> AppResult<Vec<FilmSummary>> {
    repo.films_sharing_genres(film_id, SIMILAR_FILMS_LIMIT).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryRepository,
        models::{Film, FilmType, MediaType, NewFilm, NewUser, User, WatchState},
        services::providers::MockMetadataProvider,
    };

    fn candidate(id: i64, vote_average: Option<f64>) -> TmdbTitle {
        TmdbTitle {
            id,
            media_type: Some(MediaType::Movie),
            title: Some(format!("Film {}", id)),
            name: None,
            overview: None,
            release_date: None,
            first_air_date: None,
            poster_path: None,
            vote_average,
            vote_count: None,
            genre_ids: vec![],
        }
    }

    async fn user(repo: &MemoryRepository) -> User {
        repo.create_user(NewUser {
            username: "alice".to_string(),
            email: None,
            password_hash: "hash".to_string(),
        })
        .await
        .unwrap()
    }

    async fn film(repo: &MemoryRepository, tmdb_id: Option<i64>) -> Film {
        let (film, _) = repo
            .get_or_create_film(NewFilm {
                title: format!("Local {:?}", tmdb_id),
                description: String::new(),
                tmdb_id,
                start_year: None,
                end_year: None,
                film_type: FilmType::Movie,
            })
            .await
            .unwrap();
        film
    }

    #[tokio::test]
    async fn test_no_high_ratings_means_no_calls() {
        let repo = MemoryRepository::new();
        let alice = user(&repo).await;
        let meh = film(&repo, Some(10)).await;
        repo.upsert_review(alice.id, meh.id, 6, "").await.unwrap();

        let mut provider = MockMetadataProvider::new();
        provider.expect_similar().never();

        let recs = recommend_for_user(&repo, &provider, alice.id).await.unwrap();
        assert!(recs.is_empty());
    }

    #[tokio::test]
    async fn test_excludes_known_dedupes_and_ranks() {
        let repo = MemoryRepository::new();
        let alice = user(&repo).await;
        let loved = film(&repo, Some(100)).await;
        let liked = film(&repo, Some(200)).await;
        let planned = film(&repo, Some(300)).await;

        repo.upsert_review(alice.id, loved.id, 10, "").await.unwrap();
        repo.upsert_review(alice.id, liked.id, 7, "").await.unwrap();
        repo.upsert_watch_status(alice.id, planned.id, WatchState::Planned)
            .await
            .unwrap();

        let mut provider = MockMetadataProvider::new();
        provider.expect_similar().returning(|tmdb_id, _| match tmdb_id {
            100 => vec![
                candidate(300, Some(9.9)), // already planned
                candidate(1, Some(6.0)),
                candidate(2, None),
                candidate(200, Some(8.0)), // already reviewed
            ],
            200 => vec![candidate(1, Some(6.0)), candidate(3, Some(7.5))],
            _ => vec![],
        });

        let recs = recommend_for_user(&repo, &provider, alice.id).await.unwrap();
        let ids: Vec<i64> = recs.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_skips_films_without_tmdb_id() {
        let repo = MemoryRepository::new();
        let alice = user(&repo).await;
        let homemade = film(&repo, None).await;
        repo.upsert_review(alice.id, homemade.id, 9, "").await.unwrap();

        let mut provider = MockMetadataProvider::new();
        provider.expect_similar().never();

        let recs = recommend_for_user(&repo, &provider, alice.id).await.unwrap();
        assert!(recs.is_empty());
    }

    #[tokio::test]
    async fn test_only_top_five_seeds_and_twenty_results() {
        let repo = MemoryRepository::new();
        let alice = user(&repo).await;
        for i in 0..7 {
            let f = film(&repo, Some(1000 + i)).await;
            repo.upsert_review(alice.id, f.id, 8, "").await.unwrap();
        }

        let mut provider = MockMetadataProvider::new();
        provider
            .expect_similar()
            .times(5)
            .returning(|tmdb_id, _| {
                (0..10)
                    .map(|n| candidate(tmdb_id * 100 + n, Some(n as f64)))
                    .collect()
            });

        let recs = recommend_for_user(&repo, &provider, alice.id).await.unwrap();
        assert_eq!(recs.len(), 20);
        assert_eq!(recs[0].vote_average, Some(9.0));
    }

    #[tokio::test]
    async fn test_similar_local_films_capped_and_ordered() {
        let repo = MemoryRepository::new();
        let alice = user(&repo).await;
        let drama = repo.get_or_create_genre("Drama").await.unwrap();
        let comedy = repo.get_or_create_genre("Comedy").await.unwrap();

        let base = film(&repo, None).await;
        repo.add_film_genre(base.id, drama.id).await.unwrap();

        // Ten films share the genre; None means unrated
        let ratings = [
            Some(7),
            Some(9),
            Some(7),
            None,
            Some(8),
            Some(7),
            None,
            None,
            Some(5),
            None,
        ];
        let mut sharing = Vec::new();
        for rating in ratings {
            let f = film(&repo, None).await;
            repo.add_film_genre(f.id, drama.id).await.unwrap();
            if let Some(rating) = rating {
                repo.upsert_review(alice.id, f.id, rating, "").await.unwrap();
            }
            sharing.push(f.id);
        }

        let unrelated = film(&repo, None).await;
        repo.add_film_genre(unrelated.id, comedy.id).await.unwrap();
        repo.upsert_review(alice.id, unrelated.id, 10, "").await.unwrap();

        let similar = similar_local_films(&repo, base.id).await.unwrap();
        let ids: Vec<i64> = similar.iter().map(|s| s.film.id).collect();

        // Ties on 7 and the unrated tail both fall back to newest id first
        let expected = vec![
            sharing[1],
            sharing[4],
            sharing[5],
            sharing[2],
            sharing[0],
            sharing[8],
            sharing[9],
            sharing[7],
        ];
        assert_eq!(ids, expected);
        assert_eq!(similar.len(), SIMILAR_FILMS_LIMIT);
        assert_eq!(similar[0].avg_rating, Some(9.0));
        assert_eq!(similar[6].avg_rating, None);
    }
}

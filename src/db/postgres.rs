use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        Film, FilmSummary, FilmType, Genre, NewFilm, NewUser, RatingStats, Review,
        ReviewWithAuthor, StatusCounts, User, WatchState, WatchStatus, WatchlistEntry,
    },
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const FILM_COLUMNS: &str =
    "f.id, f.title, f.description, f.tmdb_id, f.start_year, f.end_year, f.type";
const WATCH_COLUMNS: &str = "id, user_id, film_id, status, created_at, updated_at";
const REVIEW_COLUMNS: &str = "id, user_id, film_id, rating, text, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct FilmRow {
    id: i64,
    title: String,
    description: String,
    tmdb_id: Option<i64>,
    start_year: Option<i32>,
    end_year: Option<i32>,
    #[sqlx(rename = "type")]
    film_type: String,
}

impl FilmRow {
    fn into_film(self, genres: Vec<Genre>) -> AppResult<Film> {
        let film_type: FilmType = self
            .film_type
            .parse()
            .map_err(|e| AppError::Internal(format!("Corrupt film row {}: {}", self.id, e)))?;

        Ok(Film {
            id: self.id,
            title: self.title,
            description: self.description,
            tmdb_id: self.tmdb_id,
            start_year: self.start_year,
            end_year: self.end_year,
            film_type,
            genres,
        })
    }
}

#[derive(sqlx::FromRow)]
struct FilmSummaryRow {
    #[sqlx(flatten)]
    film: FilmRow,
    avg_rating: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct FilmGenreRow {
    film_id: i64,
    id: i64,
    name: String,
}

#[derive(sqlx::FromRow)]
struct WatchStatusRow {
    id: i64,
    user_id: Uuid,
    film_id: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Only populated by upserts
    #[sqlx(default)]
    created: bool,
}

impl WatchStatusRow {
    fn into_watch_status(self) -> AppResult<WatchStatus> {
        let status: WatchState = self
            .status
            .parse()
            .map_err(|_| AppError::Internal(format!("Corrupt watch status row {}", self.id)))?;

        Ok(WatchStatus {
            id: self.id,
            user_id: self.user_id,
            film_id: self.film_id,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i64,
    user_id: Uuid,
    film_id: i64,
    rating: i16,
    text: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[sqlx(default)]
    created: bool,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            film_id: row.film_id,
            rating: row.rating,
            text: row.text,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewAuthorRow {
    #[sqlx(flatten)]
    review: ReviewRow,
    username: String,
}

/// PostgreSQL-backed repository
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads genres for all given film rows in one query
    async fn attach_genres(&self, rows: Vec<FilmRow>) -> AppResult<Vec<Film>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let links: Vec<FilmGenreRow> = sqlx::query_as(
            r#"
            SELECT fg.film_id, g.id, g.name
            FROM film_genres fg
            JOIN genres g ON g.id = fg.genre_id
            WHERE fg.film_id = ANY($1)
            ORDER BY g.id
            "#,
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await?;

        let mut by_film: HashMap<i64, Vec<Genre>> = HashMap::new();
        for link in links {
            by_film.entry(link.film_id).or_default().push(Genre {
                id: link.id,
                name: link.name,
            });
        }

        rows.into_iter()
            .map(|row| {
                let genres = by_film.remove(&row.id).unwrap_or_default();
                row.into_film(genres)
            })
            .collect()
    }

    async fn attach_one(&self, row: Option<FilmRow>) -> AppResult<Option<Film>> {
        match row {
            Some(row) => Ok(self.attach_genres(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn rating_stats(&self, column: &str, id: RatingKey) -> AppResult<RatingStats> {
        let sql = format!(
            "SELECT AVG(rating)::float8, COUNT(*) FROM reviews WHERE {} = $1",
            column
        );
        let query = sqlx::query_as::<_, (Option<f64>, i64)>(&sql);
        let (avg_rating, rating_count) = match id {
            RatingKey::Film(film_id) => query.bind(film_id),
            RatingKey::User(user_id) => query.bind(user_id),
        }
        .fetch_one(&self.pool)
        .await?;

        Ok(RatingStats {
            avg_rating,
            rating_count,
        })
    }
}

enum RatingKey {
    Film(i64),
    User(Uuid),
}

#[async_trait::async_trait]
impl Repository for PgRepository {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(created) => Ok(created),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
                format!("Username '{}' is already taken", user.username),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_or_create_genre(&self, name: &str) -> AppResult<Genre> {
        let (id, name): (i64, String) = sqlx::query_as(
            r#"
            INSERT INTO genres (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(Genre { id, name })
    }

    async fn find_film(&self, id: i64) -> AppResult<Option<Film>> {
        let row: Option<FilmRow> =
            sqlx::query_as(&format!("SELECT {} FROM films f WHERE f.id = $1", FILM_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        self.attach_one(row).await
    }

    async fn find_film_by_tmdb_id(&self, tmdb_id: i64) -> AppResult<Option<Film>> {
        let row: Option<FilmRow> = sqlx::query_as(&format!(
            "SELECT {} FROM films f WHERE f.tmdb_id = $1",
            FILM_COLUMNS
        ))
        .bind(tmdb_id)
        .fetch_optional(&self.pool)
        .await?;
        self.attach_one(row).await
    }

    async fn get_or_create_film(&self, film: NewFilm) -> AppResult<(Film, bool)> {
        film.validate()?;

        let inserted: Option<FilmRow> = sqlx::query_as(&format!(
            r#"
            INSERT INTO films AS f (title, description, tmdb_id, start_year, end_year, type)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (tmdb_id) DO NOTHING
            RETURNING {}
            "#,
            FILM_COLUMNS
        ))
        .bind(&film.title)
        .bind(&film.description)
        .bind(film.tmdb_id)
        .bind(film.start_year)
        .bind(film.end_year)
        .bind(film.film_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((row.into_film(Vec::new())?, true));
        }

        // Conflict on tmdb_id: the film already exists
        let tmdb_id = film
            .tmdb_id
            .ok_or_else(|| AppError::Internal("Film insert returned no row".to_string()))?;
        let existing = self.find_film_by_tmdb_id(tmdb_id).await?.ok_or_else(|| {
            AppError::Internal(format!("Film with TMDB id {} vanished", tmdb_id))
        })?;
        Ok((existing, false))
    }

    async fn add_film_genre(&self, film_id: i64, genre_id: i64) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO film_genres (film_id, genre_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(film_id)
        .bind(genre_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn films_sharing_genres(
        &self,
        film_id: i64,
        limit: usize,
    ) -> AppResult<Vec<FilmSummary>> {
        let rows: Vec<FilmSummaryRow> = sqlx::query_as(&format!(
            r#"
            SELECT {},
                   (SELECT AVG(r.rating)::float8
                    FROM reviews r
                    WHERE r.film_id = f.id) AS avg_rating
            FROM films f
            WHERE f.id <> $1
              AND EXISTS (
                  SELECT 1
                  FROM film_genres fg
                  JOIN film_genres base ON base.genre_id = fg.genre_id
                  WHERE fg.film_id = f.id AND base.film_id = $1
              )
            ORDER BY avg_rating DESC NULLS LAST, f.id DESC
            LIMIT $2
            "#,
            FILM_COLUMNS
        ))
        .bind(film_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let ratings: Vec<Option<f64>> = rows.iter().map(|r| r.avg_rating).collect();
        let films = self
            .attach_genres(rows.into_iter().map(|r| r.film).collect())
            .await?;

        Ok(films
            .into_iter()
            .zip(ratings)
            .map(|(film, avg_rating)| FilmSummary { film, avg_rating })
            .collect())
    }

    async fn upsert_watch_status(
        &self,
        user_id: Uuid,
        film_id: i64,
        status: WatchState,
    ) -> AppResult<(WatchStatus, bool)> {
        let row: WatchStatusRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO watch_statuses (user_id, film_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, film_id)
            DO UPDATE SET status = EXCLUDED.status, updated_at = now()
            RETURNING {}, (xmax = 0) AS created
            "#,
            WATCH_COLUMNS
        ))
        .bind(user_id)
        .bind(film_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;

        let created = row.created;
        Ok((row.into_watch_status()?, created))
    }

    async fn find_watch_status(
        &self,
        user_id: Uuid,
        film_id: i64,
    ) -> AppResult<Option<WatchStatus>> {
        let row: Option<WatchStatusRow> = sqlx::query_as(&format!(
            "SELECT {} FROM watch_statuses WHERE user_id = $1 AND film_id = $2",
            WATCH_COLUMNS
        ))
        .bind(user_id)
        .bind(film_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(WatchStatusRow::into_watch_status).transpose()
    }

    async fn list_watchlist(
        &self,
        user_id: Uuid,
        status: Option<WatchState>,
    ) -> AppResult<Vec<WatchlistEntry>> {
        let rows: Vec<WatchStatusRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM watch_statuses
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY updated_at DESC, id DESC
            "#,
            WATCH_COLUMNS
        ))
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        let film_ids: Vec<i64> = rows.iter().map(|r| r.film_id).collect();
        let film_rows: Vec<FilmRow> = sqlx::query_as(&format!(
            "SELECT {} FROM films f WHERE f.id = ANY($1)",
            FILM_COLUMNS
        ))
        .bind(&film_ids[..])
        .fetch_all(&self.pool)
        .await?;

        let mut films: HashMap<i64, Film> = self
            .attach_genres(film_rows)
            .await?
            .into_iter()
            .map(|f| (f.id, f))
            .collect();

        rows.into_iter()
            .filter_map(|row| {
                let film = films.remove(&row.film_id)?;
                Some(row.into_watch_status().map(|watch_status| WatchlistEntry {
                    watch_status,
                    film,
                    review: None,
                }))
            })
            .collect()
    }

    async fn status_counts(&self, user_id: Uuid) -> AppResult<StatusCounts> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM watch_statuses WHERE user_id = $1 GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            if let Ok(state) = status.parse::<WatchState>() {
                counts.add(state, count);
            }
        }
        Ok(counts)
    }

    async fn statuses_for_tmdb_ids(
        &self,
        user_id: Uuid,
        tmdb_ids: &[i64],
    ) -> AppResult<HashMap<i64, WatchState>> {
        if tmdb_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i64, String)> = sqlx::query_as(
            r#"
            SELECT f.tmdb_id, ws.status
            FROM watch_statuses ws
            JOIN films f ON f.id = ws.film_id
            WHERE ws.user_id = $1 AND f.tmdb_id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(tmdb_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(tmdb_id, status)| status.parse().ok().map(|s| (tmdb_id, s)))
            .collect())
    }

    async fn upsert_review(
        &self,
        user_id: Uuid,
        film_id: i64,
        rating: i16,
        text: &str,
    ) -> AppResult<(Review, bool)> {
        let row: ReviewRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO reviews (user_id, film_id, rating, text)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, film_id)
            DO UPDATE SET rating = EXCLUDED.rating, text = EXCLUDED.text, updated_at = now()
            RETURNING {}, (xmax = 0) AS created
            "#,
            REVIEW_COLUMNS
        ))
        .bind(user_id)
        .bind(film_id)
        .bind(rating)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        let created = row.created;
        Ok((row.into(), created))
    }

    async fn find_review(&self, user_id: Uuid, film_id: i64) -> AppResult<Option<Review>> {
        let row: Option<ReviewRow> = sqlx::query_as(&format!(
            "SELECT {} FROM reviews WHERE user_id = $1 AND film_id = $2",
            REVIEW_COLUMNS
        ))
        .bind(user_id)
        .bind(film_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Review::from))
    }

    async fn user_reviews(&self, user_id: Uuid) -> AppResult<Vec<Review>> {
        let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
            "SELECT {} FROM reviews WHERE user_id = $1 ORDER BY updated_at DESC, id DESC",
            REVIEW_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn film_reviews(&self, film_id: i64, limit: usize) -> AppResult<Vec<ReviewWithAuthor>> {
        let rows: Vec<ReviewAuthorRow> = sqlx::query_as(
            r#"
            SELECT r.id, r.user_id, r.film_id, r.rating, r.text, r.created_at, r.updated_at,
                   u.username
            FROM reviews r
            JOIN users u ON u.id = r.user_id
            WHERE r.film_id = $1
            ORDER BY r.updated_at DESC, r.id DESC
            LIMIT $2
            "#,
        )
        .bind(film_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ReviewWithAuthor {
                review: row.review.into(),
                username: row.username,
            })
            .collect())
    }

    async fn film_rating_stats(&self, film_id: i64) -> AppResult<RatingStats> {
        self.rating_stats("film_id", RatingKey::Film(film_id)).await
    }

    async fn user_rating_stats(&self, user_id: Uuid) -> AppResult<RatingStats> {
        self.rating_stats("user_id", RatingKey::User(user_id)).await
    }
}

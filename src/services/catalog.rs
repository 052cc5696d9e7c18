use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::{parse_year, Film, FilmType, MediaType, NewFilm, TmdbDetails},
    services::providers::MetadataProvider,
};

/// Maps a TMDB details payload onto the fields of a local film
///
/// Movies carry `title` and `release_date`, series carry `name` and
/// `first_air_date`. A series that has ended also gets an `end_year`.
pub fn details_to_new_film(details: &TmdbDetails) -> AppResult<NewFilm> {
    let tmdb_id = details
        .id
        .filter(|id| *id != 0)
        .ok_or_else(|| AppError::InvalidInput("TMDB data must contain an 'id' field".to_string()))?;

    let title = details
        .title
        .clone()
        .or_else(|| details.name.clone())
        .unwrap_or_else(|| "Unknown Title".to_string());

    let film_type = if details.title.is_some() {
        FilmType::Movie
    } else {
        FilmType::Series
    };

    let start_year = parse_year(details.release_date.as_deref())
        .or_else(|| parse_year(details.first_air_date.as_deref()));

    let end_year = match (film_type, details.in_production) {
        (FilmType::Series, Some(false)) => parse_year(details.last_air_date.as_deref())
            .filter(|end| start_year.map_or(true, |start| *end >= start)),
        _ => None,
    };

    Ok(NewFilm {
        title,
        description: details.overview.clone().unwrap_or_default(),
        tmdb_id: Some(tmdb_id),
        start_year,
        end_year,
        film_type,
    })
}

/// Imports a TMDB title into the local catalog
///
/// Idempotent: an existing film with the same `tmdb_id` is returned as is,
/// and genres are only linked once.
pub async fn import_tmdb_title(repo: &dyn Repository, details: &TmdbDetails) -> AppResult<Film> {
    let new_film = details_to_new_film(details)?;
    let (film, created) = repo.get_or_create_film(new_film).await?;

    for genre in &details.genres {
        let name = genre.name.trim();
        if name.is_empty() {
            continue;
        }
        let genre = repo.get_or_create_genre(name).await?;
        repo.add_film_genre(film.id, genre.id).await?;
    }

    tracing::info!(
        film_id = film.id,
        tmdb_id = ?film.tmdb_id,
        created,
        genres = details.genres.len(),
        "Imported TMDB title"
    );

    repo.find_film(film.id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Film {} vanished after import", film.id)))
}

/// Returns the local film for a TMDB id, importing it on first use
pub async fn find_or_import(
    repo: &dyn Repository,
    provider: &dyn MetadataProvider,
    tmdb_id: i64,
    media_type: MediaType,
) -> AppResult<Film> {
    if let Some(film) = repo.find_film_by_tmdb_id(tmdb_id).await? {
        tracing::debug!(tmdb_id, film_id = film.id, "Film already in catalog");
        return Ok(film);
    }

    let details = provider.details(tmdb_id, media_type).await?;
    import_tmdb_title(repo, &details).await
}

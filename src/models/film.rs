use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use super::MediaType;
use crate::error::AppError;

/// A genre label shared between films
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Kind of title stored locally
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FilmType {
    Movie,
    Series,
}

impl FilmType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilmType::Movie => "movie",
            FilmType::Series => "series",
        }
    }

    /// The TMDB media type used to look this kind of title up
    pub fn media_type(&self) -> MediaType {
        match self {
            FilmType::Movie => MediaType::Movie,
            FilmType::Series => MediaType::Tv,
        }
    }
}

impl FromStr for FilmType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(FilmType::Movie),
            "series" => Ok(FilmType::Series),
            other => Err(AppError::InvalidInput(format!("Unknown film type: {}", other))),
        }
    }
}

/// A movie or series imported into the local catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Film {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub tmdb_id: Option<i64>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    #[serde(rename = "type")]
    pub film_type: FilmType,
    pub genres: Vec<Genre>,
}

impl Film {
    pub fn media_type(&self) -> MediaType {
        self.film_type.media_type()
    }
}

impl Display for Film {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Some(start) = self.start_year else {
            return write!(f, "{}", self.title);
        };

        match (self.film_type, self.end_year) {
            (FilmType::Movie, _) => write!(f, "{} ({})", self.title, start),
            // Miniseries
            (FilmType::Series, Some(end)) if end == start => {
                write!(f, "{} ({})", self.title, start)
            }
            (FilmType::Series, Some(end)) => write!(f, "{} ({}–{})", self.title, start, end),
            (FilmType::Series, None) => write!(f, "{} ({}–…)", self.title, start),
        }
    }
}

/// Fields required to insert a film
#[derive(Debug, Clone, PartialEq)]
pub struct NewFilm {
    pub title: String,
    pub description: String,
    pub tmdb_id: Option<i64>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub film_type: FilmType,
}

impl NewFilm {
    /// Rejects an end year that precedes the start year
    pub fn validate(&self) -> Result<(), AppError> {
        if let (Some(start), Some(end)) = (self.start_year, self.end_year) {
            if end < start {
                return Err(AppError::InvalidInput(
                    "end_year cannot be less than start_year".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// A film together with its average local rating
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FilmSummary {
    #[serde(flatten)]
    pub film: Film,
    pub avg_rating: Option<f64>,
}

use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

// ============================================================================
// Request parameters
// ============================================================================

/// TMDB media type discriminator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    /// Path segment used by the TMDB API
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaType::Movie),
            "tv" | "series" => Ok(MediaType::Tv),
            other => Err(AppError::InvalidInput(format!(
                "Unknown media type: {}",
                other
            ))),
        }
    }
}

/// Window for the trending endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    Week,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Week => "week",
        }
    }
}

// ============================================================================
// Response types
// ============================================================================

/// A title as it appears in TMDB list endpoints (search, trending, popular, similar)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbTitle {
    pub id: i64,
    #[serde(default)]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<i64>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
}

impl TmdbTitle {
    /// Movie results carry `title`, series results carry `name`
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Unknown Title")
    }

    /// Explicit media type, falling back to the shape of the payload
    pub fn kind(&self) -> MediaType {
        self.media_type.unwrap_or(if self.title.is_some() {
            MediaType::Movie
        } else {
            MediaType::Tv
        })
    }

    pub fn year(&self) -> Option<i32> {
        parse_year(self.release_date.as_deref())
            .or_else(|| parse_year(self.first_air_date.as_deref()))
    }
}

/// A genre entry inside a details payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbGenre {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

/// Full details of a movie or TV series
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TmdbDetails {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub last_air_date: Option<String>,
    #[serde(default)]
    pub in_production: Option<bool>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<i64>,
}

/// Extracts the year from a `YYYY-MM-DD` date, ignoring blank or malformed values
pub fn parse_year(date: Option<&str>) -> Option<i32> {
    date.filter(|d| d.len() >= 4)
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse().ok())
}

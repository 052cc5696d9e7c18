use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

use super::{Film, Review};
use crate::error::AppError;

/// A user's tracking state for one title
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WatchState {
    Planned,
    Watching,
    Watched,
    Dropped,
}

impl WatchState {
    pub const ALL: [WatchState; 4] = [
        WatchState::Planned,
        WatchState::Watching,
        WatchState::Watched,
        WatchState::Dropped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WatchState::Planned => "planned",
            WatchState::Watching => "watching",
            WatchState::Watched => "watched",
            WatchState::Dropped => "dropped",
        }
    }

    /// Human readable label, e.g. "Watching"
    pub fn label(&self) -> &'static str {
        match self {
            WatchState::Planned => "Planned",
            WatchState::Watching => "Watching",
            WatchState::Watched => "Watched",
            WatchState::Dropped => "Dropped",
        }
    }
}

impl Display for WatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WatchState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WatchState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| AppError::InvalidInput("Invalid status".to_string()))
    }
}

/// Tracking record for a (user, film) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchStatus {
    pub id: i64,
    pub user_id: Uuid,
    pub film_id: i64,
    pub status: WatchState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A watch status joined with its film
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WatchlistEntry {
    pub watch_status: WatchStatus,
    pub film: Film,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,
}

/// Number of titles a user has in each state
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub planned: i64,
    pub watching: i64,
    pub watched: i64,
    pub dropped: i64,
}

impl StatusCounts {
    pub fn add(&mut self, state: WatchState, count: i64) {
        match state {
            WatchState::Planned => self.planned += count,
            WatchState::Watching => self.watching += count,
            WatchState::Watched => self.watched += count,
            WatchState::Dropped => self.dropped += count,
        }
    }

    pub fn total(&self) -> i64 {
        self.planned + self.watching + self.watched + self.dropped
    }
}

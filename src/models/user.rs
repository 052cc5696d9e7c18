use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{RatingStats, StatusCounts};
use crate::error::AppError;

const MAX_USERNAME_LEN: usize = 150;
const MIN_PASSWORD_LEN: usize = 8;

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Signup payload after hashing
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
}

impl NewUser {
    /// Username rules: 1-150 characters of letters, digits and @.+-_
    pub fn validate_username(username: &str) -> Result<(), AppError> {
        if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
            return Err(AppError::InvalidInput(
                "Username must be between 1 and 150 characters".to_string(),
            ));
        }
        if !username
            .chars()
            .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            return Err(AppError::InvalidInput(
                "Username may only contain letters, digits and @/./+/-/_".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_password(password: &str) -> Result<(), AppError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidInput(
                "Password must be at least 8 characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// Profile statistics for a user
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserProfile {
    pub username: String,
    pub is_own_profile: bool,
    pub planned_count: i64,
    pub watching_count: i64,
    pub watched_count: i64,
    pub dropped_count: i64,
    pub total_count: i64,
    pub avg_rating: Option<f64>,
    pub reviews_count: i64,
}

impl UserProfile {
    pub fn new(user: &User, viewer: &User, counts: StatusCounts, ratings: RatingStats) -> Self {
        Self {
            username: user.username.clone(),
            is_own_profile: user.id == viewer.id,
            planned_count: counts.planned,
            watching_count: counts.watching,
            watched_count: counts.watched,
            dropped_count: counts.dropped,
            total_count: counts.total(),
            avg_rating: ratings.avg_rating,
            reviews_count: ratings.rating_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(NewUser::validate_username("film.buff+1@home").is_ok());
        assert!(NewUser::validate_username("").is_err());
        assert!(NewUser::validate_username("has space").is_err());
        assert!(NewUser::validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(NewUser::validate_password("12345678").is_ok());
        assert!(NewUser::validate_password("short").is_err());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: None,
            password_hash: "$2b$12$secret".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
    }
}

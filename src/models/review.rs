use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Lowest accepted rating
pub const MIN_RATING: i16 = 1;
/// Highest accepted rating
pub const MAX_RATING: i16 = 10;

/// A user's rating and review of a film
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: i64,
    pub user_id: Uuid,
    pub film_id: i64,
    pub rating: i16,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn validate_rating(rating: i64) -> Result<i16, AppError> {
        if rating < MIN_RATING as i64 || rating > MAX_RATING as i64 {
            return Err(AppError::InvalidInput(
                "Rating must be between 1 and 10.".to_string(),
            ));
        }
        Ok(rating as i16)
    }
}

/// A review with the author's username, for film pages
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: Review,
    pub username: String,
}

/// Aggregate of a set of ratings
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RatingStats {
    /// Mean rating, absent when there are no reviews
    pub avg_rating: Option<f64>,
    pub rating_count: i64,
}

impl RatingStats {
    pub fn from_ratings<I: IntoIterator<Item = i16>>(ratings: I) -> Self {
        let (sum, count) = ratings
            .into_iter()
            .fold((0i64, 0i64), |(sum, count), r| (sum + r as i64, count + 1));

        Self {
            avg_rating: (count > 0).then(|| sum as f64 / count as f64),
            rating_count: count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rating_bounds() {
        assert_eq!(Review::validate_rating(1).unwrap(), 1);
        assert_eq!(Review::validate_rating(10).unwrap(), 10);
        assert!(Review::validate_rating(0).is_err());
        assert!(Review::validate_rating(11).is_err());
        assert!(Review::validate_rating(-3).is_err());
    }

    #[test]
    fn test_stats_empty() {
        let stats = RatingStats::from_ratings(Vec::new());
        assert_eq!(stats.avg_rating, None);
        assert_eq!(stats.rating_count, 0);
    }

    #[test]
    fn test_stats_average() {
        let stats = RatingStats::from_ratings(vec![7, 8, 10]);
        assert_eq!(stats.rating_count, 3);
        let avg = stats.avg_rating.unwrap();
        assert!((avg - 25.0 / 3.0).abs() < f64::EPSILON);
    }
}

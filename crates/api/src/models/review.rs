//! Product review types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use shopfront_core::{ProductId, ReviewId, UserId};

/// A review with its author's display name.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub user_name: String,
    pub product_id: ProductId,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

/// Body of `POST /reviews`.
#[derive(Debug, Deserialize)]
pub struct NewReview {
    #[serde(alias = "productId")]
    pub product: ProductId,
    pub rating: i16,
    #[serde(default)]
    pub comment: String,
}

/// Body of `PATCH /reviews/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewUpdate {
    pub rating: Option<i16>,
    pub comment: Option<String>,
}

/// Ratings are whole stars from 1 to 5.
///
/// # Errors
///
/// Returns a client-facing message when out of range.
pub fn validate_rating(rating: i16) -> Result<(), String> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err("Rating must be between 1 and 5".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(6).is_err());
    }
}

//! Review repository.

use sqlx::PgPool;

use shopfront_core::{PageRequest, ProductId, ReviewId, UserId};

use super::RepositoryError;
use crate::models::Review;

/// Select a review joined with its author. `r` must name the review rows.
const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.user_id, u.name AS user_name, r.product_id, r.rating, r.comment,
           r.created_at, r.edited_at
    FROM r
    JOIN shop."user" u ON u.id = r.user_id
"#;

/// Repository for product reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of a product's reviews, newest first, plus the total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
        page: PageRequest,
    ) -> Result<(Vec<Review>, i64), RepositoryError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shop.review WHERE product_id = $1")
                .bind(product_id)
                .fetch_one(self.pool)
                .await?;

        let reviews = sqlx::query_as::<_, Review>(&format!(
            "WITH r AS (SELECT * FROM shop.review WHERE product_id = $1) {REVIEW_SELECT} \
             ORDER BY r.created_at DESC, r.id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(product_id)
        .bind(page.sql_limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((reviews, total))
    }

    /// Get a review by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "WITH r AS (SELECT * FROM shop.review WHERE id = $1) {REVIEW_SELECT}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(review)
    }

    /// Create a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already reviewed the product.
    /// Returns `RepositoryError::Invalid` if the product doesn't exist.
    pub async fn create(
        &self,
        user_id: UserId,
        product_id: ProductId,
        rating: i16,
        comment: &str,
    ) -> Result<Review, RepositoryError> {
        sqlx::query_as::<_, Review>(&format!(
            r"
            WITH r AS (
                INSERT INTO shop.review (user_id, product_id, rating, comment)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            {REVIEW_SELECT}
            "
        ))
        .bind(user_id)
        .bind(product_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "you have already reviewed this product"))
    }

    /// Change rating and/or comment and stamp `edited_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn update(
        &self,
        id: ReviewId,
        rating: Option<i16>,
        comment: Option<&str>,
    ) -> Result<Review, RepositoryError> {
        sqlx::query_as::<_, Review>(&format!(
            r"
            WITH r AS (
                UPDATE shop.review SET
                    rating = COALESCE($2, rating),
                    comment = COALESCE($3, comment),
                    edited_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            {REVIEW_SELECT}
            "
        ))
        .bind(id)
        .bind(rating)
        .bind(comment)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "review already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.review WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

//! Wishlist repository.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use shopfront_core::{PageRequest, ProductId, UserId, WishlistItemId};

use super::RepositoryError;
use super::products::{SUMMARY_COLUMNS, SummaryRow};
use crate::models::WishlistLine;

const LINE_QUERY: &str = r"
    SELECT wi.id, wi.user_id, wi.note, wi.created_at, {SUMMARY_COLUMNS}
    FROM shop.wishlist_item wi
    JOIN shop.product p ON p.id = wi.product_id
    JOIN shop.brand b ON b.id = p.brand_id
";

#[derive(FromRow)]
struct WishlistLineRow {
    id: WishlistItemId,
    user_id: UserId,
    note: String,
    created_at: DateTime<Utc>,
    #[sqlx(flatten)]
    product: SummaryRow,
}

impl WishlistLineRow {
    fn into_line(self) -> (UserId, WishlistLine) {
        (
            self.user_id,
            WishlistLine {
                id: self.id,
                note: self.note,
                created_at: self.created_at,
                product: self.product.into(),
            },
        )
    }
}

fn line_query(tail: &str) -> String {
    format!("{}{tail}", LINE_QUERY.replace("{SUMMARY_COLUMNS}", SUMMARY_COLUMNS))
}

/// Repository for wishlist database operations.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of a user's wishlist, newest first, plus the total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<(Vec<WishlistLine>, i64), RepositoryError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shop.wishlist_item WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;

        let rows = sqlx::query_as::<_, WishlistLineRow>(&line_query(
            "WHERE wi.user_id = $1 ORDER BY wi.created_at DESC, wi.id DESC LIMIT $2 OFFSET $3",
        ))
        .bind(user_id)
        .bind(page.sql_limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let lines = rows.into_iter().map(|r| r.into_line().1).collect();
        Ok((lines, total))
    }

    /// Get a wishlist line and its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: WishlistItemId,
    ) -> Result<Option<(UserId, WishlistLine)>, RepositoryError> {
        let row = sqlx::query_as::<_, WishlistLineRow>(&line_query("WHERE wi.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(WishlistLineRow::into_line))
    }

    /// Add a product to a user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product is already wished.
    /// Returns `RepositoryError::Invalid` if the product doesn't exist.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        note: &str,
    ) -> Result<WishlistLine, RepositoryError> {
        let id: WishlistItemId = sqlx::query_scalar(
            r"
            INSERT INTO shop.wishlist_item (user_id, product_id, note)
            VALUES ($1, $2, $3)
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(note)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product is already in the wishlist"))?;

        self.get(id)
            .await?
            .map(|(_, line)| line)
            .ok_or(RepositoryError::NotFound)
    }

    /// Replace the note on a wishlist line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line doesn't exist.
    pub async fn update_note(
        &self,
        id: WishlistItemId,
        note: &str,
    ) -> Result<WishlistLine, RepositoryError> {
        let result = sqlx::query("UPDATE shop.wishlist_item SET note = $2 WHERE id = $1")
            .bind(id)
            .bind(note)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(id)
            .await?
            .map(|(_, line)| line)
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a wishlist line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line doesn't exist.
    pub async fn delete(&self, id: WishlistItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.wishlist_item WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_query_expands_summary_columns() {
        let sql = line_query("WHERE wi.id = $1");
        assert!(sql.contains("p.title AS product_title"));
        assert!(!sql.contains("{SUMMARY_COLUMNS}"));
        assert!(sql.trim_end().ends_with("WHERE wi.id = $1"));
    }
}

//! Cart repository.
//!
//! Quantities are checked against stock inside the same transaction that
//! writes them, with the product row locked.

use sqlx::{FromRow, PgConnection, PgPool};

use shopfront_core::{CartItemId, ProductId, UserId};

use super::RepositoryError;
use super::products::{SUMMARY_COLUMNS, SummaryRow};
use crate::models::{CartItem, CartLine};

#[derive(FromRow)]
struct CartLineRow {
    id: CartItemId,
    quantity: i32,
    #[sqlx(flatten)]
    product: SummaryRow,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            id: row.id,
            quantity: row.quantity,
            product: row.product.into(),
        }
    }
}

#[derive(FromRow)]
struct StockRow {
    stock_quantity: i32,
    is_deleted: bool,
}

/// Lock a product and return its stock, rejecting deleted products.
async fn lock_available_stock(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<i32, RepositoryError> {
    let row = sqlx::query_as::<_, StockRow>(
        "SELECT stock_quantity, is_deleted FROM shop.product WHERE id = $1 FOR UPDATE",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    if row.is_deleted {
        return Err(RepositoryError::Conflict(
            "product is no longer available".to_owned(),
        ));
    }
    Ok(row.stock_quantity)
}

fn ensure_in_stock(quantity: i32, stock: i32) -> Result<(), RepositoryError> {
    if quantity > stock {
        return Err(RepositoryError::Conflict(format!(
            "insufficient stock: only {stock} available"
        )));
    }
    Ok(())
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's cart with product details, oldest line first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(&format!(
            r"
            SELECT ci.id, ci.quantity, {SUMMARY_COLUMNS}
            FROM shop.cart_item ci
            JOIN shop.product p ON p.id = ci.product_id
            JOIN shop.brand b ON b.id = p.brand_id
            WHERE ci.user_id = $1
            ORDER BY ci.id
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    /// Get a single cart row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CartItemId) -> Result<Option<CartItem>, RepositoryError> {
        let item = sqlx::query_as::<_, CartItem>(
            "SELECT id, user_id, product_id, quantity FROM shop.cart_item WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(item)
    }

    /// Add a product to a cart, incrementing the quantity if already present.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the product is deleted or the
    /// resulting quantity exceeds stock.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let stock = lock_available_stock(&mut tx, product_id).await?;

        let item = sqlx::query_as::<_, CartItem>(
            r"
            INSERT INTO shop.cart_item (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = shop.cart_item.quantity + EXCLUDED.quantity
            RETURNING id, user_id, product_id, quantity
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "cart item already exists"))?;

        // Dropping the transaction rolls back the increment.
        ensure_in_stock(item.quantity, stock)?;
        tx.commit().await?;
        Ok(item)
    }

    /// Set the quantity of a cart row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the row doesn't exist.
    /// Returns `RepositoryError::Conflict` if the quantity exceeds stock.
    pub async fn update_quantity(
        &self,
        item: &CartItem,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let stock = lock_available_stock(&mut tx, item.product_id).await?;
        ensure_in_stock(quantity, stock)?;

        let updated = sqlx::query_as::<_, CartItem>(
            r"
            UPDATE shop.cart_item SET quantity = $2
            WHERE id = $1
            RETURNING id, user_id, product_id, quantity
            ",
        )
        .bind(item.id)
        .bind(quantity)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "cart item already exists"))?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a cart row and return it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the row doesn't exist.
    pub async fn delete(&self, id: CartItemId) -> Result<CartItem, RepositoryError> {
        sqlx::query_as::<_, CartItem>(
            "DELETE FROM shop.cart_item WHERE id = $1 RETURNING id, user_id, product_id, quantity",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Remove every line from a user's cart. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_in_stock() {
        assert!(ensure_in_stock(3, 3).is_ok());
        assert!(matches!(
            ensure_in_stock(4, 3),
            Err(RepositoryError::Conflict(msg)) if msg.contains("only 3")
        ));
    }
}

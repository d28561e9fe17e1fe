//! Order repository.
//!
//! Checkout and status changes run in transactions that lock the affected
//! product rows, so stock never goes negative and a cancelled order is
//! restocked exactly once.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};

use shopfront_core::{
    OrderId, OrderStatus, PageRequest, PaymentMode, PaymentStatus, ProductId, UserId,
};

use super::RepositoryError;
use crate::config::CheckoutConfig;
use crate::models::{AddressSnapshot, Order, OrderLine, OrderTotals};

const ORDER_COLUMNS: &str = "id, user_id, items, address, status, payment_mode, payment_status, \
     payment_reference, subtotal, shipping, tax, total, created_at, updated_at";

#[derive(FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    items: Json<Vec<OrderLine>>,
    address: Json<AddressSnapshot>,
    status: OrderStatus,
    payment_mode: PaymentMode,
    payment_status: PaymentStatus,
    payment_reference: Option<String>,
    subtotal: Decimal,
    shipping: Decimal,
    tax: Decimal,
    total: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            address: row.address.0,
            status: row.status,
            payment_mode: row.payment_mode,
            payment_status: row.payment_status,
            payment_reference: row.payment_reference,
            subtotal: row.subtotal,
            shipping: row.shipping,
            tax: row.tax,
            total: row.total,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A cart line joined with the locked product row.
#[derive(FromRow)]
struct CheckoutRow {
    product_id: ProductId,
    quantity: i32,
    title: String,
    brand: String,
    thumbnail: String,
    price: Decimal,
    stock_quantity: i32,
    is_deleted: bool,
}

impl CheckoutRow {
    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.is_deleted {
            return Err(RepositoryError::Conflict(format!(
                "{} is no longer available",
                self.title
            )));
        }
        if self.quantity > self.stock_quantity {
            return Err(RepositoryError::Conflict(format!(
                "insufficient stock for {}: only {} available",
                self.title, self.stock_quantity
            )));
        }
        Ok(())
    }

    fn into_line(self) -> OrderLine {
        OrderLine {
            product_id: self.product_id,
            title: self.title,
            brand: self.brand,
            thumbnail: self.thumbnail,
            unit_price: self.price,
            quantity: self.quantity,
        }
    }
}

async fn adjust_stock(
    conn: &mut PgConnection,
    product_id: ProductId,
    delta: i32,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE shop.product SET stock_quantity = stock_quantity + $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(product_id)
    .bind(delta)
    .execute(&mut *conn)
    .await
    .map_err(|e| RepositoryError::from_write(e, "stock update rejected"))?;
    Ok(())
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Turn a user's cart into an order.
    ///
    /// Locks every product in the cart, checks and decrements stock, freezes
    /// line and address snapshots, computes totals and empties the cart, all
    /// in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` if the cart is empty.
    /// Returns `RepositoryError::Conflict` if a product is deleted or short on stock.
    pub async fn create_from_cart(
        &self,
        user_id: UserId,
        address: AddressSnapshot,
        payment_mode: PaymentMode,
        checkout: &CheckoutConfig,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, CheckoutRow>(
            r"
            SELECT p.id AS product_id, ci.quantity, p.title, b.name AS brand, p.thumbnail,
                   p.price, p.stock_quantity, p.is_deleted
            FROM shop.cart_item ci
            JOIN shop.product p ON p.id = ci.product_id
            JOIN shop.brand b ON b.id = p.brand_id
            WHERE ci.user_id = $1
            ORDER BY p.id
            FOR UPDATE OF p
            ",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        if rows.is_empty() {
            return Err(RepositoryError::Invalid("cart is empty".to_owned()));
        }

        let mut lines = Vec::with_capacity(rows.len());
        for row in rows {
            row.check_available()?;
            adjust_stock(&mut tx, row.product_id, -row.quantity).await?;
            lines.push(row.into_line());
        }

        let totals = OrderTotals::compute(&lines, checkout);

        let order = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO shop.customer_order
                (user_id, items, address, status, payment_mode, payment_status,
                 subtotal, shipping, tax, total)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(Json(&lines))
        .bind(Json(&address))
        .bind(OrderStatus::Pending)
        .bind(payment_mode)
        .bind(payment_mode.initial_payment_status())
        .bind(totals.subtotal)
        .bind(totals.shipping)
        .bind(totals.tax)
        .bind(totals.total)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "order already exists"))?;

        sqlx::query("DELETE FROM shop.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(order.into())
    }

    /// One page of all orders, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        page: PageRequest,
        status: Option<OrderStatus>,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM shop.customer_order");
        if let Some(status) = status {
            count.push(" WHERE status = ").push_bind(status);
        }
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ORDER_COLUMNS} FROM shop.customer_order"
        ));
        if let Some(status) = status {
            qb.push(" WHERE status = ").push_bind(status);
        }
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.sql_limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb.build_query_as::<OrderRow>().fetch_all(self.pool).await?;
        Ok((rows.into_iter().map(Order::from).collect(), total))
    }

    /// All orders placed by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.customer_order WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.customer_order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Order::from))
    }

    /// Move an order to a new status.
    ///
    /// When `require_current` is set, the order must still be in that status
    /// once locked. Cancelling puts the items back in stock; delivering a
    /// cash-on-delivery order marks it paid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Conflict` if the transition is not allowed.
    pub async fn transition(
        &self,
        id: OrderId,
        next: OrderStatus,
        require_current: Option<OrderStatus>,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Order = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.customer_order WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?
        .into();

        if require_current.is_some_and(|required| required != current.status) {
            return Err(RepositoryError::Conflict(format!(
                "order is {} and can no longer be changed",
                current.status
            )));
        }
        if !current.status.can_transition_to(next) {
            return Err(RepositoryError::Conflict(format!(
                "cannot change order from {} to {next}",
                current.status
            )));
        }

        if next == OrderStatus::Cancelled {
            let mut items: Vec<&OrderLine> = current.items.iter().collect();
            items.sort_by_key(|line| line.product_id.as_i32());
            for line in items {
                adjust_stock(&mut tx, line.product_id, line.quantity).await?;
            }
        }

        let payment_status =
            if next == OrderStatus::Delivered && current.payment_mode == PaymentMode::Cod {
                PaymentStatus::Paid
            } else {
                current.payment_status
            };

        let updated = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE shop.customer_order
            SET status = $2, payment_status = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(next)
        .bind(payment_status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated.into())
    }

    /// Record a payment outcome reported by a provider.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Conflict` if the order's current payment
    /// status may not be replaced by `status` (e.g. `Paid` to `Failed`).
    pub async fn set_payment_status(
        &self,
        id: OrderId,
        status: PaymentStatus,
        reference: Option<&str>,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: PaymentStatus = sqlx::query_scalar(
            "SELECT payment_status FROM shop.customer_order WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if !current.accepts_update_to(status) {
            return Err(RepositoryError::Conflict(format!(
                "payment is {current:?} and cannot become {status:?}"
            )));
        }

        let updated = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE shop.customer_order
            SET payment_status = $2,
                payment_reference = COALESCE($3, payment_reference),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(status)
        .bind(reference)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated.into())
    }

    /// Remember the provider's reference (e.g. a Stripe payment intent ID).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn set_payment_reference(
        &self,
        id: OrderId,
        reference: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.customer_order SET payment_reference = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(reference)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Find the order carrying a provider reference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_payment_reference(
        &self,
        reference: &str,
    ) -> Result<Option<OrderId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, OrderId>(
            "SELECT id FROM shop.customer_order WHERE payment_reference = $1",
        )
        .bind(reference)
        .fetch_optional(self.pool)
        .await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(quantity: i32, stock: i32, deleted: bool) -> CheckoutRow {
        CheckoutRow {
            product_id: ProductId::new(9),
            quantity,
            title: "Lamp".to_string(),
            brand: "Lumen".to_string(),
            thumbnail: String::new(),
            price: Decimal::new(1999, 2),
            stock_quantity: stock,
            is_deleted: deleted,
        }
    }

    #[test]
    fn test_checkout_row_availability() {
        assert!(row(2, 2, false).check_available().is_ok());
        assert!(matches!(
            row(3, 2, false).check_available(),
            Err(RepositoryError::Conflict(msg)) if msg.contains("only 2")
        ));
        assert!(matches!(
            row(1, 5, true).check_available(),
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[test]
    fn test_checkout_row_snapshots_unit_price() {
        let line = row(2, 5, false).into_line();
        assert_eq!(line.unit_price, Decimal::new(1999, 2));
        assert_eq!(line.line_total(), Decimal::new(3998, 2));
        assert_eq!(line.brand, "Lumen");
    }
}

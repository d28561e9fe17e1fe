//! Aggregate queries for the admin dashboard.

use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use shopfront_core::{StockStatus, round_to_cents};

use super::RepositoryError;
use crate::models::DashboardStats;
use crate::models::stats::{MONTHS, MonthlySales, StockCounts};

#[derive(FromRow)]
struct OrderTotalsRow {
    total_orders: i64,
    pending_orders: i64,
    revenue_orders: i64,
    total_revenue: Decimal,
}

#[derive(FromRow)]
struct MonthRow {
    month: i32,
    sales: Decimal,
    orders: i64,
}

/// Repository for dashboard aggregates.
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    /// Create a new stats repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Compute dashboard figures. Cancelled orders don't count as revenue.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn dashboard(&self) -> Result<DashboardStats, RepositoryError> {
        let totals = sqlx::query_as::<_, OrderTotalsRow>(
            r"
            SELECT COUNT(*) AS total_orders,
                   COUNT(*) FILTER (WHERE status = 'pending') AS pending_orders,
                   COUNT(*) FILTER (WHERE status <> 'cancelled') AS revenue_orders,
                   COALESCE(SUM(total) FILTER (WHERE status <> 'cancelled'), 0) AS total_revenue
            FROM shop.customer_order
            ",
        )
        .fetch_one(self.pool)
        .await?;

        let stock = sqlx::query_as::<_, (i64, i64, i64)>(
            r"
            SELECT COUNT(*) FILTER (WHERE stock_quantity > $1),
                   COUNT(*) FILTER (WHERE stock_quantity BETWEEN 1 AND $1),
                   COUNT(*) FILTER (WHERE stock_quantity <= 0)
            FROM shop.product
            WHERE NOT is_deleted
            ",
        )
        .bind(StockStatus::LOW_STOCK_THRESHOLD)
        .fetch_one(self.pool)
        .await?;

        let months = sqlx::query_as::<_, MonthRow>(
            r"
            SELECT EXTRACT(MONTH FROM created_at)::int4 AS month,
                   COALESCE(SUM(total), 0) AS sales,
                   COUNT(*) AS orders
            FROM shop.customer_order
            WHERE status <> 'cancelled'
              AND created_at >= date_trunc('year', NOW())
            GROUP BY 1
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(DashboardStats {
            total_orders: totals.total_orders,
            pending_orders: totals.pending_orders,
            total_revenue: totals.total_revenue,
            average_order_value: average(totals.total_revenue, totals.revenue_orders),
            stock: StockCounts {
                in_stock: stock.0,
                low_stock: stock.1,
                out_of_stock: stock.2,
            },
            monthly_sales: fill_months(&months),
        })
    }
}

fn average(total: Decimal, count: i64) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    round_to_cents(total / Decimal::from(count))
}

fn fill_months(rows: &[MonthRow]) -> Vec<MonthlySales> {
    MONTHS
        .iter()
        .zip(1..)
        .map(|(&month, number)| {
            let row = rows.iter().find(|r| r.month == number);
            MonthlySales {
                month,
                sales: row.map_or(Decimal::ZERO, |r| r.sales),
                orders: row.map_or(0, |r| r.orders),
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_average_handles_no_orders() {
        assert_eq!(average(Decimal::ZERO, 0), Decimal::ZERO);
        assert_eq!(average(Decimal::new(1000, 2), 3).to_string(), "3.33");
    }

    #[test]
    fn test_fill_months_covers_whole_year() {
        let rows = [MonthRow {
            month: 3,
            sales: Decimal::new(4200, 2),
            orders: 2,
        }];
        let months = fill_months(&rows);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].month, "Jan");
        assert_eq!(months[0].orders, 0);
        assert_eq!(months[2].month, "Mar");
        assert_eq!(months[2].sales, Decimal::new(4200, 2));
        assert_eq!(months[2].orders, 2);
    }
}

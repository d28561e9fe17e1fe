//! Admin dashboard figures.

use rust_decimal::Decimal;
use serde::Serialize;

/// Aggregates shown on the admin dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    /// Sum of non-cancelled order totals.
    pub total_revenue: Decimal,
    pub average_order_value: Decimal,
    pub stock: StockCounts,
    /// One entry per month of the current year, January first.
    pub monthly_sales: Vec<MonthlySales>,
}

/// Live products per stock bucket.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockCounts {
    pub in_stock: i64,
    pub low_stock: i64,
    pub out_of_stock: i64,
}

/// Revenue and order count for one calendar month.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlySales {
    /// Three-letter month name.
    pub month: &'static str,
    pub sales: Decimal,
    pub orders: i64,
}

/// Short month names, January first.
pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

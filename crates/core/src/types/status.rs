//! Status enums for orders, payments and stock levels.

use serde::{Deserialize, Serialize};

/// Order fulfillment status.
///
/// Orders move forward through the fulfillment pipeline and end in either
/// `Delivered` or `Cancelled`:
///
/// ```text
/// Pending ──> Dispatched ──> OutForDelivery ──> Delivered
///    │            │
///    └────────────┴──> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_status", rename_all = "snake_case")
)]
pub enum OrderStatus {
    #[default]
    Pending,
    Dispatched,
    #[serde(rename = "Out for delivery")]
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Returns true if no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Returns true if an order in this status may move to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Dispatched | Self::Cancelled)
                | (Self::Dispatched, Self::OutForDelivery | Self::Cancelled)
                | (Self::OutForDelivery, Self::Delivered)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Dispatched => write!(f, "Dispatched"),
            Self::OutForDelivery => write!(f, "Out for delivery"),
            Self::Delivered => write!(f, "Delivered"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// How the customer chose to pay at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.payment_mode", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    /// Cash on delivery.
    Cod,
    /// Card payment via Stripe.
    Card,
    /// Simulated payment, settled immediately.
    Sandbox,
    /// Redirect payment via PayFast.
    #[serde(rename = "PAYFAST")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "payfast"))]
    PayFast,
}

impl PaymentMode {
    /// Payment status an order starts with for this mode.
    #[must_use]
    pub const fn initial_payment_status(self) -> PaymentStatus {
        match self {
            Self::Cod => PaymentStatus::Unpaid,
            Self::Sandbox => PaymentStatus::Paid,
            Self::Card | Self::PayFast => PaymentStatus::Pending,
        }
    }
}

/// Settlement state of an order's payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "camelCase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Returns true if a provider report of `next` may replace this status.
    ///
    /// Providers deliver events out of order, so a settled payment only moves
    /// on to a refund; a late failure for an earlier attempt is dropped.
    #[must_use]
    pub const fn accepts_update_to(self, next: Self) -> bool {
        match self {
            Self::Paid => matches!(next, Self::Paid | Self::Refunded),
            Self::Refunded => matches!(next, Self::Refunded),
            Self::Unpaid | Self::Pending | Self::Failed => true,
        }
    }
}

/// Stock level bucket derived from a product's quantity on hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// Quantity at or below which stock counts as low.
    pub const LOW_STOCK_THRESHOLD: i32 = 10;

    /// Classify a stock quantity.
    #[must_use]
    pub const fn from_quantity(quantity: i32) -> Self {
        if quantity <= 0 {
            Self::OutOfStock
        } else if quantity <= Self::LOW_STOCK_THRESHOLD {
            Self::LowStock
        } else {
            Self::InStock
        }
    }
}

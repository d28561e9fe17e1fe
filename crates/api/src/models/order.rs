//! Order types and checkout arithmetic.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopfront_core::{
    AddressId, OrderId, OrderStatus, PaymentMode, PaymentStatus, ProductId, UserId, round_to_cents,
};

use super::AddressSnapshot;
use crate::config::CheckoutConfig;

/// A placed order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderLine>,
    pub address: AddressSnapshot,
    pub status: OrderStatus,
    pub payment_mode: PaymentMode,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product line frozen into an order at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub title: String,
    pub brand: String,
    pub thumbnail: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl OrderLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Money breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Sum the lines and add the flat shipping fee and tax.
    #[must_use]
    pub fn compute(lines: &[OrderLine], checkout: &CheckoutConfig) -> Self {
        let subtotal = round_to_cents(lines.iter().map(OrderLine::line_total).sum());
        let shipping = round_to_cents(checkout.shipping_fee);
        let tax = round_to_cents(checkout.flat_tax);
        Self {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
        }
    }
}

/// Body of `POST /orders`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[serde(alias = "addressId")]
    pub address: AddressId,
    pub payment_mode: PaymentMode,
}

/// Body of `PATCH /orders/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatus {
    pub status: OrderStatus,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn line(price: &str, quantity: i32) -> OrderLine {
        OrderLine {
            product_id: ProductId::new(1),
            title: "Mug".to_string(),
            brand: "Acme".to_string(),
            thumbnail: String::new(),
            unit_price: Decimal::from_str(price).unwrap(),
            quantity,
        }
    }

    #[test]
    fn test_totals_add_flat_fees() {
        let totals = OrderTotals::compute(
            &[line("10.00", 2), line("4.50", 1)],
            &CheckoutConfig::default(),
        );
        assert_eq!(totals.subtotal.to_string(), "24.50");
        assert_eq!(totals.shipping.to_string(), "5.55");
        assert_eq!(totals.tax.to_string(), "5.00");
        assert_eq!(totals.total.to_string(), "35.05");
    }

    #[test]
    fn test_totals_round_subtotal_to_cents() {
        let totals = OrderTotals::compute(&[line("0.335", 3)], &CheckoutConfig::default());
        assert_eq!(totals.subtotal.to_string(), "1.01");
    }

    #[test]
    fn test_new_order_body() {
        let body: NewOrder =
            serde_json::from_str(r#"{"address": 7, "paymentMode": "PAYFAST"}"#).unwrap();
        assert_eq!(body.address, AddressId::new(7));
        assert_eq!(body.payment_mode, PaymentMode::PayFast);
    }

    #[test]
    fn test_status_body_accepts_display_names() {
        let body: UpdateOrderStatus =
            serde_json::from_str(r#"{"status": "Out for delivery"}"#).unwrap();
        assert_eq!(body.status, OrderStatus::OutForDelivery);
    }
}

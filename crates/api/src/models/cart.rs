//! Cart domain types.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use shopfront_core::{CartItemId, ProductId, UserId};

use super::ProductSummary;

/// A stored cart row.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
}

/// A cart row with the product it refers to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: CartItemId,
    pub quantity: i32,
    pub product: ProductSummary,
}

/// Body of `POST /cart`.
#[derive(Debug, Deserialize)]
pub struct AddToCart {
    #[serde(alias = "productId")]
    pub product: ProductId,
    #[serde(default = "one")]
    pub quantity: i32,
}

const fn one() -> i32 {
    1
}

/// Body of `PATCH /cart/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateCartQuantity {
    pub quantity: i32,
}

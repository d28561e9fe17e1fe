//! Wishlist domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfront_core::{ProductId, WishlistItemId};

use super::ProductSummary;

/// A wishlist row with the product it refers to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistLine {
    pub id: WishlistItemId,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub product: ProductSummary,
}

/// Body of `POST /wishlist`.
#[derive(Debug, Deserialize)]
pub struct AddToWishlist {
    #[serde(alias = "productId")]
    pub product: ProductId,
    #[serde(default)]
    pub note: String,
}

/// Body of `PATCH /wishlist/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateWishlistNote {
    pub note: String,
}

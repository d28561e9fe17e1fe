//! Product domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use shopfront_core::{BrandId, CategoryId, ProductId, StockStatus};

/// A catalog product as stored.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub discount_percentage: Decimal,
    pub category_id: CategoryId,
    pub brand_id: BrandId,
    pub stock_quantity: i32,
    pub thumbnail: String,
    pub images: Vec<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product with joined catalog names, review aggregate and stock bucket.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub brand_name: String,
    pub category_name: String,
    /// Mean rating, 0 when the product has no reviews.
    pub average_rating: f64,
    pub review_count: i64,
    pub stock_status: StockStatus,
}

/// The slice of a product embedded in cart and wishlist lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub discount_percentage: Decimal,
    pub thumbnail: String,
    pub stock_quantity: i32,
    pub brand: String,
    pub is_deleted: bool,
}

/// Body of `POST /products`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub discount_percentage: Decimal,
    #[serde(alias = "categoryId")]
    pub category: CategoryId,
    #[serde(alias = "brandId")]
    pub brand: BrandId,
    pub stock_quantity: i32,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub images: Vec<String>,
}

impl NewProduct {
    /// Check field ranges before touching the database.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message for the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title is required".to_string());
        }
        validate_price(self.price)?;
        validate_discount(self.discount_percentage)?;
        validate_stock(self.stock_quantity)
    }
}

/// Body of `PATCH /products/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
    #[serde(alias = "categoryId")]
    pub category: Option<CategoryId>,
    #[serde(alias = "brandId")]
    pub brand: Option<BrandId>,
    pub stock_quantity: Option<i32>,
    pub thumbnail: Option<String>,
    pub images: Option<Vec<String>>,
}

impl ProductUpdate {
    /// Check the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message for the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.as_ref().is_some_and(|t| t.trim().is_empty()) {
            return Err("Title cannot be empty".to_string());
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(discount) = self.discount_percentage {
            validate_discount(discount)?;
        }
        if let Some(stock) = self.stock_quantity {
            validate_stock(stock)?;
        }
        Ok(())
    }
}

fn validate_price(price: Decimal) -> Result<(), String> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err("Price cannot be negative".to_string());
    }
    Ok(())
}

fn validate_discount(discount: Decimal) -> Result<(), String> {
    if discount < Decimal::ZERO || discount > Decimal::ONE_HUNDRED {
        return Err("Discount must be between 0 and 100".to_string());
    }
    Ok(())
}

fn validate_stock(stock: i32) -> Result<(), String> {
    if stock < 0 {
        return Err("Stock quantity cannot be negative".to_string());
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_product() -> NewProduct {
        serde_json::from_value(serde_json::json!({
            "title": "Trail Runner",
            "price": 89.5,
            "category": 1,
            "brand": 2,
            "stockQuantity": 12
        }))
        .unwrap()
    }

    #[test]
    fn test_new_product_defaults() {
        let product = new_product();
        assert_eq!(product.discount_percentage, Decimal::ZERO);
        assert!(product.images.is_empty());
        assert_eq!(product.brand, BrandId::new(2));
        assert!(product.validate().is_ok());
    }

    #[test]
    fn test_new_product_accepts_id_aliases() {
        let product: NewProduct = serde_json::from_value(serde_json::json!({
            "title": "Trail Runner",
            "price": "10.00",
            "categoryId": 4,
            "brandId": 5,
            "stockQuantity": 0
        }))
        .unwrap();
        assert_eq!(product.category, CategoryId::new(4));
        assert_eq!(product.brand, BrandId::new(5));
    }

    #[test]
    fn test_new_product_rejects_bad_ranges() {
        let mut product = new_product();
        product.title = "  ".to_string();
        assert!(product.validate().is_err());

        let mut product = new_product();
        product.price = Decimal::new(-1, 0);
        assert!(product.validate().is_err());

        let mut product = new_product();
        product.discount_percentage = Decimal::new(101, 0);
        assert!(product.validate().is_err());

        let mut product = new_product();
        product.stock_quantity = -3;
        assert!(product.validate().is_err());
    }

    #[test]
    fn test_update_only_checks_present_fields() {
        assert!(ProductUpdate::default().validate().is_ok());
        let update = ProductUpdate {
            discount_percentage: Some(Decimal::new(-5, 0)),
            ..ProductUpdate::default()
        };
        assert!(update.validate().is_err());
    }
}

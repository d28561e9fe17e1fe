//! Brands and categories.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use shopfront_core::{BrandId, CategoryId};

/// A product brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Body of `POST /brands` and `POST /categories`.
#[derive(Debug, Deserialize)]
pub struct NewCatalogEntry {
    pub name: String,
}

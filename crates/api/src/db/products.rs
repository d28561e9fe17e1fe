//! Product repository.
//!
//! Listing uses `QueryBuilder` because brand/category filters, sort column
//! and soft-delete visibility all vary per request.

use serde::Deserialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use shopfront_core::{BrandId, CategoryId, PageRequest, ProductId, StockStatus};

use super::RepositoryError;
use crate::models::{NewProduct, Product, ProductDetail, ProductSummary, ProductUpdate};

const PRODUCT_COLUMNS: &str = "p.id, p.title, p.description, p.price, p.discount_percentage, \
     p.category_id, p.brand_id, p.stock_quantity, p.thumbnail, p.images, p.is_deleted, \
     p.created_at, p.updated_at";

/// Columns selected into [`SummaryRow`]; expects `p` = product, `b` = brand.
pub(super) const SUMMARY_COLUMNS: &str = "p.id AS product_id, p.title AS product_title, \
     p.price AS product_price, p.discount_percentage AS product_discount_percentage, \
     p.thumbnail AS product_thumbnail, p.stock_quantity AS product_stock_quantity, \
     b.name AS product_brand, p.is_deleted AS product_is_deleted";

/// Product columns joined onto cart and wishlist rows.
#[derive(FromRow)]
pub(super) struct SummaryRow {
    product_id: ProductId,
    product_title: String,
    product_price: rust_decimal::Decimal,
    product_discount_percentage: rust_decimal::Decimal,
    product_thumbnail: String,
    product_stock_quantity: i32,
    product_brand: String,
    product_is_deleted: bool,
}

impl From<SummaryRow> for ProductSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            id: row.product_id,
            title: row.product_title,
            price: row.product_price,
            discount_percentage: row.product_discount_percentage,
            thumbnail: row.product_thumbnail,
            stock_quantity: row.product_stock_quantity,
            brand: row.product_brand,
            is_deleted: row.product_is_deleted,
        }
    }
}

/// Column a product listing is sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductSort {
    #[default]
    CreatedAt,
    Price,
    Title,
    Rating,
}

impl ProductSort {
    const fn sql(self) -> &'static str {
        match self {
            Self::CreatedAt => "p.created_at",
            Self::Price => "p.price",
            Self::Title => "p.title",
            Self::Rating => "COALESCE(r.avg_rating, 0)",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    const fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filters for `GET /products`.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub brands: Vec<BrandId>,
    pub categories: Vec<CategoryId>,
    pub include_deleted: bool,
    pub sort: ProductSort,
    pub order: SortOrder,
    pub page: PageRequest,
}

impl ProductFilter {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if !self.include_deleted {
            qb.push(" AND NOT p.is_deleted");
        }
        if !self.brands.is_empty() {
            let ids: Vec<i32> = self.brands.iter().map(BrandId::as_i32).collect();
            qb.push(" AND p.brand_id = ANY(").push_bind(ids).push(")");
        }
        if !self.categories.is_empty() {
            let ids: Vec<i32> = self.categories.iter().map(CategoryId::as_i32).collect();
            qb.push(" AND p.category_id = ANY(").push_bind(ids).push(")");
        }
    }
}

#[derive(FromRow)]
struct ProductDetailRow {
    #[sqlx(flatten)]
    product: Product,
    brand_name: String,
    category_name: String,
    average_rating: f64,
    review_count: i64,
}

impl From<ProductDetailRow> for ProductDetail {
    fn from(row: ProductDetailRow) -> Self {
        let stock_status = StockStatus::from_quantity(row.product.stock_quantity);
        Self {
            product: row.product,
            brand_name: row.brand_name,
            category_name: row.category_name,
            average_rating: row.average_rating,
            review_count: row.review_count,
            stock_status,
        }
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of products plus the total number matching the filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM shop.product p WHERE TRUE",
        );
        filter.push_conditions(&mut count);
        let total = count.build_query_scalar::<i64>().fetch_one(self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product p \
             LEFT JOIN (SELECT product_id, AVG(rating) AS avg_rating \
                        FROM shop.review GROUP BY product_id) r ON r.product_id = p.id \
             WHERE TRUE"
        ));
        filter.push_conditions(&mut qb);
        qb.push(" ORDER BY ")
            .push(filter.sort.sql())
            .push(" ")
            .push(filter.order.sql())
            .push(", p.id ")
            .push(filter.order.sql());
        qb.push(" LIMIT ")
            .push_bind(filter.page.sql_limit())
            .push(" OFFSET ")
            .push_bind(filter.page.offset());

        let products = qb.build_query_as::<Product>().fetch_all(self.pool).await?;
        Ok((products, total))
    }

    /// Get a product by ID, deleted or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Get a product with catalog names and review aggregate.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_detail(&self, id: ProductId) -> Result<Option<ProductDetail>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductDetailRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS},
                   b.name AS brand_name,
                   c.name AS category_name,
                   COALESCE(AVG(r.rating)::float8, 0) AS average_rating,
                   COUNT(r.id) AS review_count
            FROM shop.product p
            JOIN shop.brand b ON b.id = p.brand_id
            JOIN shop.category c ON c.id = p.category_id
            LEFT JOIN shop.review r ON r.product_id = p.id
            WHERE p.id = $1
            GROUP BY p.id, b.name, c.name
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ProductDetail::from))
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` if the brand or category does not exist.
    pub async fn create(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            WITH p AS (
                INSERT INTO shop.product
                    (title, description, price, discount_percentage, category_id, brand_id,
                     stock_quantity, thumbnail, images)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *
            )
            SELECT {PRODUCT_COLUMNS} FROM p
            "
        ))
        .bind(new.title.trim())
        .bind(&new.description)
        .bind(new.price)
        .bind(new.discount_percentage)
        .bind(new.category)
        .bind(new.brand)
        .bind(new.stock_quantity)
        .bind(&new.thumbnail)
        .bind(&new.images)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product already exists"))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Invalid` if a new brand or category does not exist.
    pub async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            WITH p AS (
                UPDATE shop.product SET
                    title = COALESCE($2, title),
                    description = COALESCE($3, description),
                    price = COALESCE($4, price),
                    discount_percentage = COALESCE($5, discount_percentage),
                    category_id = COALESCE($6, category_id),
                    brand_id = COALESCE($7, brand_id),
                    stock_quantity = COALESCE($8, stock_quantity),
                    thumbnail = COALESCE($9, thumbnail),
                    images = COALESCE($10, images),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {PRODUCT_COLUMNS} FROM p
            "
        ))
        .bind(id)
        .bind(update.title.as_deref().map(str::trim))
        .bind(update.description.as_deref())
        .bind(update.price)
        .bind(update.discount_percentage)
        .bind(update.category)
        .bind(update.brand)
        .bind(update.stock_quantity)
        .bind(update.thumbnail.as_deref())
        .bind(update.images.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Set or clear the soft-delete flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn set_deleted(&self, id: ProductId, deleted: bool) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            WITH p AS (
                UPDATE shop.product SET is_deleted = $2, updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {PRODUCT_COLUMNS} FROM p
            "
        ))
        .bind(id)
        .bind(deleted)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_query_values() {
        let sort: ProductSort = serde_json::from_str("\"createdAt\"").unwrap_or_default();
        assert_eq!(sort, ProductSort::CreatedAt);
        let sort: ProductSort = serde_json::from_str("\"rating\"").unwrap_or_default();
        assert_eq!(sort.sql(), "COALESCE(r.avg_rating, 0)");
    }

    #[test]
    fn test_filter_hides_deleted_by_default() {
        let filter = ProductFilter::default();
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM shop.product p WHERE TRUE");
        filter.push_conditions(&mut qb);
        assert!(qb.sql().contains("NOT p.is_deleted"));
    }

    #[test]
    fn test_filter_binds_id_lists() {
        let filter = ProductFilter {
            brands: vec![BrandId::new(1), BrandId::new(2)],
            categories: vec![CategoryId::new(3)],
            include_deleted: true,
            ..ProductFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM shop.product p WHERE TRUE");
        filter.push_conditions(&mut qb);
        let sql = qb.sql();
        assert!(!sql.contains("is_deleted"));
        assert!(sql.contains("p.brand_id = ANY($1)"));
        assert!(sql.contains("p.category_id = ANY($2)"));
    }
}

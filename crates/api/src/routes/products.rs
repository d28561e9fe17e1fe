//! Product catalog routes.
//!
//! Listing and detail are public; writes are admin-only. Deleting a product
//! only sets its soft-delete flag so past orders and reviews keep resolving.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use shopfront_core::ProductId;

use super::{Counted, PageQuery, parse_id_list};
use crate::db::ProductRepository;
use crate::db::products::{ProductFilter, ProductSort, SortOrder};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{OptionalAuth, RequireAdmin};
use crate::models::{NewProduct, Product, ProductDetail, ProductUpdate};
use crate::state::AppState;

/// Query string of `GET /products`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    /// Comma-separated brand IDs.
    pub brand: Option<String>,
    /// Comma-separated category IDs.
    pub category: Option<String>,
    pub sort: Option<ProductSort>,
    pub order: Option<SortOrder>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub include_deleted: bool,
}

impl ProductListQuery {
    fn into_filter(self, is_admin: bool) -> Result<ProductFilter> {
        Ok(ProductFilter {
            brands: parse_id_list(self.brand.as_deref(), "brand")?,
            categories: parse_id_list(self.category.as_deref(), "category")?,
            include_deleted: is_admin && self.include_deleted,
            sort: self.sort.unwrap_or_default(),
            order: self.order.unwrap_or_default(),
            page: PageQuery {
                page: self.page,
                limit: self.limit,
            }
            .page_request(),
        })
    }
}

fn product_not_found() -> AppError {
    AppError::NotFound("Product not found".to_string())
}

/// `GET /products`
pub async fn list(
    State(state): State<AppState>,
    OptionalAuth(current): OptionalAuth,
    ApiQuery(query): ApiQuery<ProductListQuery>,
) -> Result<Counted<Vec<Product>>> {
    let is_admin = current.is_some_and(|user| user.is_admin);
    let filter = query.into_filter(is_admin)?;

    let (products, total) = ProductRepository::new(state.pool()).list(&filter).await?;
    Ok(Counted(products, total))
}

/// `GET /products/{id}` - soft-deleted products are visible to admins only.
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(current): OptionalAuth,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<ProductDetail>> {
    let detail = ProductRepository::new(state.pool())
        .get_detail(id)
        .await?
        .ok_or_else(product_not_found)?;

    let is_admin = current.is_some_and(|user| user.is_admin);
    if detail.product.is_deleted && !is_admin {
        return Err(product_not_found());
    }

    Ok(Json(detail))
}

/// `POST /products` (admin)
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(new): ApiJson<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    new.validate().map_err(AppError::BadRequest)?;

    let product = ProductRepository::new(state.pool()).create(&new).await?;
    tracing::info!(product_id = %product.id, admin_id = %admin.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PATCH /products/{id}` (admin)
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(update): ApiJson<ProductUpdate>,
) -> Result<Json<Product>> {
    update.validate().map_err(AppError::BadRequest)?;
    Ok(Json(
        ProductRepository::new(state.pool()).update(id, &update).await?,
    ))
}

/// `DELETE /products/{id}` (admin) - soft delete.
pub async fn soft_delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .set_deleted(id, true)
        .await?;
    tracing::info!(product_id = %id, admin_id = %admin.id, "Product soft-deleted");
    Ok(Json(product))
}

/// `PATCH /products/undelete/{id}` (admin)
pub async fn undelete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .set_deleted(id, false)
        .await?;
    tracing::info!(product_id = %id, admin_id = %admin.id, "Product restored");
    Ok(Json(product))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::{BrandId, CategoryId};

    use super::*;

    fn query(qs: &str) -> ProductListQuery {
        let uri: axum::http::Uri = format!("/products?{qs}").parse().unwrap();
        axum::extract::Query::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_query_into_filter() {
        let filter = query("brand=1,2&category=3&sort=price&order=asc&page=2&limit=5")
            .into_filter(false)
            .unwrap();
        assert_eq!(filter.brands, vec![BrandId::new(1), BrandId::new(2)]);
        assert_eq!(filter.categories, vec![CategoryId::new(3)]);
        assert_eq!(filter.sort, ProductSort::Price);
        assert_eq!(filter.order, SortOrder::Asc);
        assert_eq!(filter.page.offset(), 5);
    }

    #[test]
    fn test_include_deleted_requires_admin() {
        assert!(!query("includeDeleted=true").into_filter(false).unwrap().include_deleted);
        assert!(query("includeDeleted=true").into_filter(true).unwrap().include_deleted);
    }

    #[test]
    fn test_defaults() {
        let filter = query("").into_filter(false).unwrap();
        assert_eq!(filter.sort, ProductSort::CreatedAt);
        assert_eq!(filter.order, SortOrder::Desc);
        assert!(filter.brands.is_empty());
    }
}

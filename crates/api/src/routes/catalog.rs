//! Brand and category routes, served from the catalog cache.

use axum::{Json, extract::State, http::StatusCode};

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::RequireAdmin;
use crate::models::catalog::NewCatalogEntry;
use crate::models::{Brand, Category};
use crate::state::AppState;

fn entry_name(entry: &NewCatalogEntry) -> Result<&str> {
    let name = entry.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    Ok(name)
}

/// `GET /brands`
pub async fn list_brands(State(state): State<AppState>) -> Result<Json<Vec<Brand>>> {
    let brands = state.catalog().brands(state.pool()).await?;
    Ok(Json(brands.to_vec()))
}

/// `POST /brands` (admin)
pub async fn create_brand(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiJson(entry): ApiJson<NewCatalogEntry>,
) -> Result<(StatusCode, Json<Brand>)> {
    let brand = state
        .catalog()
        .create_brand(state.pool(), entry_name(&entry)?)
        .await?;
    Ok((StatusCode::CREATED, Json(brand)))
}

/// `GET /categories`
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = state.catalog().categories(state.pool()).await?;
    Ok(Json(categories.to_vec()))
}

/// `POST /categories` (admin)
pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiJson(entry): ApiJson<NewCatalogEntry>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = state
        .catalog()
        .create_category(state.pool(), entry_name(&entry)?)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

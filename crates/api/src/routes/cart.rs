//! Cart routes.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use shopfront_core::{CartItemId, UserId};

use super::{ensure_can_access, ensure_owner};
use crate::db::CartRepository;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::models::cart::{AddToCart, UpdateCartQuantity};
use crate::models::{CartItem, CartLine, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClearedCart {
    pub removed: u64,
}

fn check_quantity(quantity: i32) -> Result<()> {
    if quantity < 1 {
        return Err(AppError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

async fn owned_item(
    carts: &CartRepository<'_>,
    user: &CurrentUser,
    id: CartItemId,
) -> Result<CartItem> {
    let item = carts
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart item not found".to_string()))?;
    ensure_owner(user, item.user_id)?;
    Ok(item)
}

/// `POST /cart` - adding a product already in the cart increments it.
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<AddToCart>,
) -> Result<(StatusCode, Json<CartItem>)> {
    check_quantity(req.quantity)?;

    let item = CartRepository::new(state.pool())
        .add(user.id, req.product, req.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// `GET /cart/user/{id}` - self or admin.
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<Json<Vec<CartLine>>> {
    ensure_can_access(&user, user_id)?;
    Ok(Json(
        CartRepository::new(state.pool())
            .list_for_user(user_id)
            .await?,
    ))
}

/// `PATCH /cart/{id}` - owner.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<CartItemId>,
    ApiJson(req): ApiJson<UpdateCartQuantity>,
) -> Result<Json<CartItem>> {
    check_quantity(req.quantity)?;

    let carts = CartRepository::new(state.pool());
    let item = owned_item(&carts, &user, id).await?;
    Ok(Json(carts.update_quantity(&item, req.quantity).await?))
}

/// `DELETE /cart/{id}` - owner.
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<CartItemId>,
) -> Result<Json<CartItem>> {
    let carts = CartRepository::new(state.pool());
    owned_item(&carts, &user, id).await?;
    Ok(Json(carts.delete(id).await?))
}

/// `DELETE /cart/user/{id}` - self.
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<Json<ClearedCart>> {
    ensure_owner(&user, user_id)?;
    let removed = CartRepository::new(state.pool()).clear(user_id).await?;
    Ok(Json(ClearedCart { removed }))
}

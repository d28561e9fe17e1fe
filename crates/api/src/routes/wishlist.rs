//! Wishlist routes.

use axum::{Json, extract::State, http::StatusCode};

use shopfront_core::{UserId, WishlistItemId};

use super::{Counted, PageQuery, ensure_can_access, ensure_owner};
use crate::db::WishlistRepository;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, WishlistLine};
use crate::models::wishlist::{AddToWishlist, UpdateWishlistNote};
use crate::state::AppState;

async fn owned_line(
    wishlist: &WishlistRepository<'_>,
    user: &CurrentUser,
    id: WishlistItemId,
) -> Result<WishlistLine> {
    let (owner, line) = wishlist
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Wishlist item not found".to_string()))?;
    ensure_owner(user, owner)?;
    Ok(line)
}

/// `POST /wishlist`
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<AddToWishlist>,
) -> Result<(StatusCode, Json<WishlistLine>)> {
    let line = WishlistRepository::new(state.pool())
        .add(user.id, req.product, req.note.trim())
        .await?;
    Ok((StatusCode::CREATED, Json(line)))
}

/// `GET /wishlist/user/{id}` - self or admin, paginated.
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(user_id): ApiPath<UserId>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Counted<Vec<WishlistLine>>> {
    ensure_can_access(&user, user_id)?;
    let (lines, total) = WishlistRepository::new(state.pool())
        .list_for_user(user_id, page.page_request())
        .await?;
    Ok(Counted(lines, total))
}

/// `PATCH /wishlist/{id}` - owner.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<WishlistItemId>,
    ApiJson(req): ApiJson<UpdateWishlistNote>,
) -> Result<Json<WishlistLine>> {
    let wishlist = WishlistRepository::new(state.pool());
    owned_line(&wishlist, &user, id).await?;
    Ok(Json(wishlist.update_note(id, req.note.trim()).await?))
}

/// `DELETE /wishlist/{id}` - owner.
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<WishlistItemId>,
) -> Result<Json<WishlistLine>> {
    let wishlist = WishlistRepository::new(state.pool());
    let line = owned_line(&wishlist, &user, id).await?;
    wishlist.delete(id).await?;
    Ok(Json(line))
}

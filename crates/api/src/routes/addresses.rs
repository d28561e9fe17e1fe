//! Saved address routes.

use axum::{Json, extract::State, http::StatusCode};

use shopfront_core::{AddressId, UserId};

use super::{ensure_can_access, ensure_owner};
use crate::db::AddressRepository;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::models::{Address, AddressUpdate, CurrentUser, NewAddress};
use crate::state::AppState;

async fn owned_address(
    addresses: &AddressRepository<'_>,
    user: &CurrentUser,
    id: AddressId,
) -> Result<Address> {
    let address = addresses
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Address not found".to_string()))?;
    ensure_owner(user, address.user_id)?;
    Ok(address)
}

/// `POST /address`
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(new): ApiJson<NewAddress>,
) -> Result<(StatusCode, Json<Address>)> {
    new.validate().map_err(AppError::BadRequest)?;
    let address = AddressRepository::new(state.pool())
        .create(user.id, &new)
        .await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// `GET /address/user/{id}` - self or admin.
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<Json<Vec<Address>>> {
    ensure_can_access(&user, user_id)?;
    Ok(Json(
        AddressRepository::new(state.pool())
            .list_for_user(user_id)
            .await?,
    ))
}

/// `PATCH /address/{id}` - owner.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<AddressId>,
    ApiJson(update): ApiJson<AddressUpdate>,
) -> Result<Json<Address>> {
    update.validate().map_err(AppError::BadRequest)?;
    let addresses = AddressRepository::new(state.pool());
    owned_address(&addresses, &user, id).await?;
    Ok(Json(addresses.update(id, &update).await?))
}

/// `DELETE /address/{id}` - owner.
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<AddressId>,
) -> Result<Json<Address>> {
    let addresses = AddressRepository::new(state.pool());
    owned_address(&addresses, &user, id).await?;
    Ok(Json(addresses.delete(id).await?))
}

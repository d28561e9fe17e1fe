//! User profile routes.

use axum::{Json, extract::State};
use serde::Deserialize;

use shopfront_core::UserId;

use super::{ensure_can_access, ensure_owner};
use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
}

/// `GET /users/{id}` - self or admin.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<User>> {
    ensure_can_access(&current, id)?;

    UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// `PATCH /users/{id}` - self only.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<Json<User>> {
    ensure_owner(&current, id)?;
    let users = UserRepository::new(state.pool());

    let Some(name) = req.name else {
        return users
            .get_by_id(id)
            .await?
            .map(Json)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()));
    };

    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }

    Ok(Json(users.update_name(id, name).await?))
}

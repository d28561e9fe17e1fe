//! Product review routes.

use axum::{Json, extract::State, http::StatusCode};

use shopfront_core::{ProductId, ReviewId};

use super::{Counted, PageQuery, ensure_can_access, ensure_owner};
use crate::db::ReviewRepository;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireAuth;
use crate::models::Review;
use crate::models::review::{NewReview, ReviewUpdate, validate_rating};
use crate::state::AppState;

fn review_not_found() -> AppError {
    AppError::NotFound("Review not found".to_string())
}

/// `POST /reviews` - one review per user and product.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(new): ApiJson<NewReview>,
) -> Result<(StatusCode, Json<Review>)> {
    validate_rating(new.rating).map_err(AppError::BadRequest)?;

    let review = ReviewRepository::new(state.pool())
        .create(user.id, new.product, new.rating, new.comment.trim())
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /reviews/product/{id}` - newest first, paginated.
pub async fn list(
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Counted<Vec<Review>>> {
    let (reviews, total) = ReviewRepository::new(state.pool())
        .list_for_product(product_id, page.page_request())
        .await?;
    Ok(Counted(reviews, total))
}

/// `PATCH /reviews/{id}` - author only.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ReviewId>,
    ApiJson(update): ApiJson<ReviewUpdate>,
) -> Result<Json<Review>> {
    if let Some(rating) = update.rating {
        validate_rating(rating).map_err(AppError::BadRequest)?;
    }

    let reviews = ReviewRepository::new(state.pool());
    let review = reviews.get(id).await?.ok_or_else(review_not_found)?;
    ensure_owner(&user, review.user_id)?;

    let comment = update.comment.as_deref().map(str::trim);
    Ok(Json(reviews.update(id, update.rating, comment).await?))
}

/// `DELETE /reviews/{id}` - author or admin.
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ReviewId>,
) -> Result<Json<Review>> {
    let reviews = ReviewRepository::new(state.pool());
    let review = reviews.get(id).await?.ok_or_else(review_not_found)?;
    ensure_can_access(&user, review.user_id)?;

    reviews.delete(id).await?;
    if user.id != review.user_id {
        tracing::info!(review_id = %id, admin_id = %user.id, "Review removed by admin");
    }
    Ok(Json(review))
}

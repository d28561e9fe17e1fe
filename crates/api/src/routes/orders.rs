//! Order routes.
//!
//! Checkout turns the caller's cart into an order in one transaction; the
//! address is frozen into the order so later edits don't rewrite history.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use shopfront_core::{OrderId, OrderStatus, UserId};

use super::{Counted, PageQuery, ensure_can_access};
use crate::db::{AddressRepository, OrderRepository};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::order::{NewOrder, UpdateOrderStatus};
use crate::models::{AddressSnapshot, Order};
use crate::state::AppState;

/// Query string of `GET /orders`.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<OrderStatus>,
}

fn order_not_found() -> AppError {
    AppError::NotFound("Order not found".to_string())
}

/// `POST /orders` - checkout the caller's cart.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<NewOrder>,
) -> Result<(StatusCode, Json<Order>)> {
    // Someone else's address is reported the same as a missing one.
    let address = AddressRepository::new(state.pool())
        .get(req.address)
        .await?
        .filter(|address| address.user_id == user.id)
        .ok_or_else(|| AppError::NotFound("Address not found".to_string()))?;

    let order = OrderRepository::new(state.pool())
        .create_from_cart(
            user.id,
            AddressSnapshot::from(&address),
            req.payment_mode,
            &state.config().checkout,
        )
        .await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.id,
        total = %order.total,
        payment_mode = ?order.payment_mode,
        "Order placed"
    );
    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /orders` (admin) - newest first, optionally by status.
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> Result<Counted<Vec<Order>>> {
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .page_request();

    let (orders, total) = OrderRepository::new(state.pool())
        .list(page, query.status)
        .await?;
    Ok(Counted(orders, total))
}

/// `GET /orders/user/{id}` - self or admin.
pub async fn list_for_user(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<Json<Vec<Order>>> {
    ensure_can_access(&user, user_id)?;
    Ok(Json(
        OrderRepository::new(state.pool())
            .list_for_user(user_id)
            .await?,
    ))
}

/// `GET /orders/{id}` - owner or admin.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(order_not_found)?;
    ensure_can_access(&user, order.user_id)?;
    Ok(Json(order))
}

/// `PATCH /orders/{id}`
///
/// Admins may make any valid transition. Owners may only cancel, and only
/// while the order is still pending.
pub async fn update_status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(req): ApiJson<UpdateOrderStatus>,
) -> Result<Json<Order>> {
    let orders = OrderRepository::new(state.pool());

    let order = if user.is_admin {
        orders.transition(id, req.status, None).await?
    } else {
        let existing = orders.get(id).await?.ok_or_else(order_not_found)?;
        if existing.user_id != user.id {
            return Err(AppError::Forbidden(
                "You do not have access to this order".to_string(),
            ));
        }
        if req.status != OrderStatus::Cancelled {
            return Err(AppError::Forbidden(
                "Only cancellation is allowed".to_string(),
            ));
        }
        orders
            .transition(id, OrderStatus::Cancelled, Some(OrderStatus::Pending))
            .await?
    };

    tracing::info!(order_id = %id, user_id = %user.id, status = %order.status, "Order status changed");
    Ok(Json(order))
}

//! Payment routes: Stripe card payments and PayFast redirects.
//!
//! Provider callbacks (`/stripe/webhook`, `/payfast/notify`) carry no
//! session; they are trusted only after their signature verifies.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use shopfront_core::{OrderId, PaymentMode, PaymentStatus, round_to_cents};

use super::ensure_can_access;
use crate::db::{OrderRepository, RepositoryError, UserRepository};
use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Order};
use crate::services::payments::PayFastPayment;
use crate::services::payments::payfast::ItnStatus;
use crate::state::AppState;

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// Body of `POST /create-payment-intent`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequest {
    #[serde(default)]
    pub total: Option<Decimal>,
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

/// Body of `POST /payfast/initiate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayFastInitiateRequest {
    pub order_id: OrderId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayFastInitiateResponse {
    pub payment_url: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnQuery {
    pub order_id: Option<OrderId>,
}

async fn owned_order(state: &AppState, user: &CurrentUser, id: OrderId) -> Result<Order> {
    let order = OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    ensure_can_access(user, order.user_id)?;
    Ok(order)
}

/// A new intent replaces the order's payment reference, so only unpaid card
/// orders may get one.
fn ensure_card_payable(order: &Order) -> Result<()> {
    if order.payment_mode != PaymentMode::Card {
        return Err(AppError::BadRequest("Order is not a card payment".to_string()));
    }
    if order.payment_status == PaymentStatus::Paid {
        return Err(AppError::Conflict("Order is already paid".to_string()));
    }
    Ok(())
}

/// `POST /create-payment-intent`
#[instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<PaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>> {
    let stripe = state.stripe()?;

    let amount = match req.order_id {
        Some(order_id) => {
            let order = owned_order(&state, &user, order_id).await?;
            ensure_card_payable(&order)?;
            order.total
        }
        None => req
            .total
            .ok_or_else(|| AppError::BadRequest("total or orderId is required".to_string()))?,
    };

    let intent = stripe.create_payment_intent(amount, req.order_id).await?;

    if let Some(order_id) = req.order_id {
        OrderRepository::new(state.pool())
            .set_payment_reference(order_id, &intent.id)
            .await?;
    }

    info!(intent_id = %intent.id, order_id = ?req.order_id, "Payment intent created");
    Ok(Json(PaymentIntentResponse {
        client_secret: intent.client_secret,
    }))
}

/// `POST /stripe/webhook`
///
/// Unknown events and events for unknown orders are acknowledged so Stripe
/// stops retrying them.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookAck>> {
    let stripe = state.stripe()?;
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".to_string()))?;

    let event = stripe.verify_webhook(&body, signature)?;

    let status = match event.kind.as_str() {
        "payment_intent.succeeded" => PaymentStatus::Paid,
        "payment_intent.payment_failed" => PaymentStatus::Failed,
        other => {
            info!(event_id = %event.id, kind = other, "Ignoring Stripe event");
            return Ok(Json(WebhookAck { received: true }));
        }
    };

    let orders = OrderRepository::new(state.pool());
    let intent_id = event.data.object.id.as_str();
    let order_id = match event.order_id() {
        Some(id) => Some(id),
        None => orders.find_by_payment_reference(intent_id).await?,
    };

    let Some(order_id) = order_id else {
        warn!(event_id = %event.id, intent_id, "Stripe event for unknown order");
        return Ok(Json(WebhookAck { received: true }));
    };

    match orders
        .set_payment_status(order_id, status, Some(intent_id))
        .await
    {
        Ok(_) => info!(%order_id, ?status, intent_id, "Stripe payment recorded"),
        Err(RepositoryError::NotFound) => {
            warn!(%order_id, intent_id, "Stripe event references a missing order");
        }
        Err(RepositoryError::Conflict(reason)) => {
            warn!(%order_id, intent_id, %reason, "Stale Stripe event ignored");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Json(WebhookAck { received: true }))
}

fn split_name(name: &str) -> (String, String) {
    let mut parts = name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

/// `POST /payfast/initiate`
#[instrument(skip(state, user, req), fields(user_id = %user.id, order_id = %req.order_id))]
pub async fn payfast_initiate(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<PayFastInitiateRequest>,
) -> Result<Json<PayFastInitiateResponse>> {
    let payfast = state.payfast()?;
    let order = owned_order(&state, &user, req.order_id).await?;
    if order.payment_status == PaymentStatus::Paid {
        return Err(AppError::Conflict("Order is already paid".to_string()));
    }

    let buyer = UserRepository::new(state.pool())
        .get_by_id(order.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let (name_first, name_last) = split_name(&buyer.name);

    let titles = order
        .items
        .iter()
        .map(|line| line.title.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let item_count: i32 = order.items.iter().map(|line| line.quantity).sum();

    let base_url = &state.config().base_url;
    let payment = PayFastPayment {
        return_url: format!("{base_url}/payfast/return?orderId={}", order.id),
        cancel_url: format!("{base_url}/payfast/cancel"),
        notify_url: format!("{base_url}/payfast/notify"),
        name_first,
        name_last,
        email_address: buyer.email.as_str().to_string(),
        order_id: order.id,
        amount: order.total,
        item_name: format!("Order #{}: {titles}", order.id),
        item_description: format!("{item_count} items"),
    };

    let payment_url = payfast.payment_url(&payment)?;
    info!(total = %order.total, "PayFast payment initiated");
    Ok(Json(PayFastInitiateResponse { payment_url }))
}

/// `POST /payfast/notify` - PayFast's server-to-server ITN.
///
/// Once the signature verifies the answer is always 200; PayFast retries
/// anything else.
pub async fn payfast_notify(State(state): State<AppState>, body: Bytes) -> Result<&'static str> {
    let payfast = state.payfast()?;
    let fields: Vec<(String, String)> = url::form_urlencoded::parse(&body).into_owned().collect();
    let itn = payfast.verify_itn(&fields)?;

    let orders = OrderRepository::new(state.pool());
    let Some(order) = orders.get(itn.order_id).await? else {
        warn!(order_id = %itn.order_id, "ITN for unknown order");
        return Ok("OK");
    };

    if itn.amount_gross != round_to_cents(order.total) {
        warn!(
            order_id = %order.id,
            expected = %order.total,
            received = %itn.amount_gross,
            "ITN amount mismatch, ignoring"
        );
        return Ok("OK");
    }

    let status = match itn.status {
        ItnStatus::Complete => PaymentStatus::Paid,
        ItnStatus::Failed => PaymentStatus::Failed,
        ItnStatus::Cancelled | ItnStatus::Other(_) => {
            info!(order_id = %order.id, status = ?itn.status, "PayFast ITN without settlement");
            return Ok("OK");
        }
    };

    match orders
        .set_payment_status(order.id, status, Some(&itn.pf_payment_id))
        .await
    {
        Ok(_) => info!(
            order_id = %order.id,
            ?status,
            pf_payment_id = %itn.pf_payment_id,
            "PayFast payment recorded"
        ),
        Err(RepositoryError::Conflict(reason)) => {
            warn!(
                order_id = %order.id,
                pf_payment_id = %itn.pf_payment_id,
                %reason,
                "Stale ITN ignored"
            );
        }
        Err(e) => return Err(e.into()),
    }

    Ok("OK")
}

/// `GET /payfast/return` - buyer lands here after paying.
pub async fn payfast_return(
    State(state): State<AppState>,
    Query(query): Query<ReturnQuery>,
) -> Redirect {
    let origin = &state.config().origin;
    match query.order_id {
        Some(id) => Redirect::to(&format!("{origin}/order-success/{id}")),
        None => Redirect::to(origin),
    }
}

/// `GET /payfast/cancel` - buyer abandoned the payment.
pub async fn payfast_cancel(State(state): State<AppState>) -> Redirect {
    Redirect::to(&format!("{}/checkout", state.config().origin))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name() {
        assert_eq!(
            split_name("Ada King Lovelace"),
            ("Ada".to_string(), "King Lovelace".to_string())
        );
        assert_eq!(split_name("Cher"), ("Cher".to_string(), String::new()));
        assert_eq!(split_name("  "), (String::new(), String::new()));
    }

    #[test]
    fn test_intent_request_accepts_either_field() {
        let by_order: PaymentIntentRequest = serde_json::from_str(r#"{"orderId": 4}"#).unwrap();
        assert_eq!(by_order.order_id, Some(OrderId::new(4)));
        assert!(by_order.total.is_none());

        let by_total: PaymentIntentRequest = serde_json::from_str(r#"{"total": "12.50"}"#).unwrap();
        assert_eq!(by_total.total, Some(Decimal::new(1250, 2)));
    }

    fn card_order(payment_status: PaymentStatus) -> Order {
        let now = chrono::Utc::now();
        Order {
            id: OrderId::new(9),
            user_id: shopfront_core::UserId::new(3),
            items: Vec::new(),
            address: crate::models::AddressSnapshot {
                kind: "home".to_string(),
                street: "1 Main St".to_string(),
                city: "Cape Town".to_string(),
                state: "WC".to_string(),
                country: "ZA".to_string(),
                postal_code: "8001".to_string(),
                phone_number: "0210000000".to_string(),
            },
            status: shopfront_core::OrderStatus::Pending,
            payment_mode: PaymentMode::Card,
            payment_status,
            payment_reference: Some("pi_first".to_string()),
            subtotal: Decimal::new(1000, 2),
            shipping: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::new(1000, 2),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_new_intent_only_for_unpaid_card_orders() {
        assert!(ensure_card_payable(&card_order(PaymentStatus::Pending)).is_ok());
        assert!(ensure_card_payable(&card_order(PaymentStatus::Failed)).is_ok());
        assert!(matches!(
            ensure_card_payable(&card_order(PaymentStatus::Paid)),
            Err(AppError::Conflict(_))
        ));

        let cod = Order {
            payment_mode: PaymentMode::Cod,
            ..card_order(PaymentStatus::Unpaid)
        };
        assert!(matches!(
            ensure_card_payable(&cod),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_return_query_without_order() {
        let uri: axum::http::Uri = "/payfast/return".parse().unwrap();
        let query: ReturnQuery = Query::try_from_uri(&uri).unwrap().0;
        assert!(query.order_id.is_none());
    }
}

//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                           - API banner
//! GET    /health, /health/ready      - Liveness / readiness
//!
//! # Auth (strict rate limit)
//! POST   /auth/signup                - Register, log in, email OTP
//! POST   /auth/login                 - Log in
//! POST   /auth/verify-otp            - Confirm email with OTP
//! POST   /auth/resend-otp            - Issue a fresh OTP
//! POST   /auth/forgot-password       - Email a reset link
//! POST   /auth/reset-password        - Set a new password with a reset token
//! GET    /auth/check-auth            - Current user
//! GET    /auth/logout                - Log out
//!
//! # Shop (relaxed rate limit)
//! GET    /users/{id}                 PATCH /users/{id}
//! GET    /products                   POST  /products (admin)
//! GET    /products/{id}              PATCH/DELETE /products/{id} (admin)
//! PATCH  /products/undelete/{id}     (admin)
//! GET    /brands, /categories        POST  /brands, /categories (admin)
//! POST   /cart                       GET   /cart/user/{id}
//! PATCH  /cart/{id}                  DELETE /cart/{id}, /cart/user/{id}
//! POST   /wishlist                   GET   /wishlist/user/{id}
//! PATCH  /wishlist/{id}              DELETE /wishlist/{id}
//! POST   /address                    GET   /address/user/{id}
//! PATCH  /address/{id}               DELETE /address/{id}
//! POST   /reviews                    GET   /reviews/product/{id}
//! PATCH  /reviews/{id}               DELETE /reviews/{id}
//! POST   /orders                     GET   /orders (admin)
//! GET    /orders/user/{id}           GET/PATCH /orders/{id}
//! GET    /admin/stats                (admin)
//!
//! # Payments
//! POST   /create-payment-intent      - Stripe client secret
//! POST   /payfast/initiate           - Signed PayFast redirect URL
//! POST   /payfast/initialize-payment - Alias of /payfast/initiate
//! GET    /payfast/return, /payfast/cancel - Browser redirects back to the frontend
//!
//! # Provider callbacks (not rate limited)
//! POST   /stripe/webhook             - Stripe events
//! POST   /payfast/notify             - PayFast ITN
//! ```

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod users;
pub mod wishlist;

use axum::{
    Json, Router,
    http::HeaderValue,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};

use shopfront_core::{PageRequest, UserId};

use crate::error::AppError;
use crate::middleware::{TOTAL_COUNT_HEADER, api_rate_limiter, auth_rate_limiter};
use crate::models::CurrentUser;
use crate::state::AppState;

// =============================================================================
// Shared helpers
// =============================================================================

/// `?page=&limit=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    /// Clamp into a page request.
    #[must_use]
    pub const fn page_request(self) -> PageRequest {
        let page = match self.page {
            Some(page) => page,
            None => 1,
        };
        let limit = match self.limit {
            Some(limit) => limit,
            None => PageRequest::DEFAULT_LIMIT,
        };
        PageRequest::new(page, limit)
    }
}

/// A JSON list answered with its total row count in `X-Total-Count`.
pub struct Counted<T>(pub T, pub i64);

impl<T: Serialize> IntoResponse for Counted<T> {
    fn into_response(self) -> Response {
        let Self(body, total) = self;
        let mut response = Json(body).into_response();
        response
            .headers_mut()
            .insert(TOTAL_COUNT_HEADER, HeaderValue::from(total));
        response
    }
}

/// Body of simple acknowledgements.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Allow the resource owner or an admin.
fn ensure_can_access(user: &CurrentUser, owner: UserId) -> Result<(), AppError> {
    if user.can_access(owner) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You do not have access to this resource".to_string(),
        ))
    }
}

/// Allow only the resource owner.
fn ensure_owner(user: &CurrentUser, owner: UserId) -> Result<(), AppError> {
    if user.id == owner {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You do not have access to this resource".to_string(),
        ))
    }
}

/// Parse a comma-separated list of numeric IDs (`?brand=1,2`).
fn parse_id_list<T: From<i32>>(raw: Option<&str>, field: &str) -> Result<Vec<T>, AppError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i32>()
                .map(T::from)
                .map_err(|_| AppError::BadRequest(format!("invalid {field} id: {part}")))
        })
        .collect()
}

// =============================================================================
// Routers
// =============================================================================

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/resend-otp", post(auth::resend_otp))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/check-auth", get(auth::check_auth))
        .route("/logout", get(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .patch(products::update)
                .delete(products::soft_delete),
        )
        .route("/undelete/{id}", patch(products::undelete))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(cart::add))
        .route("/user/{id}", get(cart::list).delete(cart::clear))
        .route("/{id}", patch(cart::update).delete(cart::remove))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(wishlist::add))
        .route("/user/{id}", get(wishlist::list))
        .route("/{id}", patch(wishlist::update).delete(wishlist::remove))
}

/// Create the address routes router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(addresses::create))
        .route("/user/{id}", get(addresses::list))
        .route("/{id}", patch(addresses::update).delete(addresses::remove))
}

/// Create the review routes router.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(reviews::create))
        .route("/product/{id}", get(reviews::list))
        .route("/{id}", patch(reviews::update).delete(reviews::remove))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list).post(orders::create))
        .route("/user/{id}", get(orders::list_for_user))
        .route("/{id}", get(orders::show).patch(orders::update_status))
}

/// Routes for browsers and the frontend, under the relaxed rate limit.
fn shop_routes(trust_proxy: bool) -> Router<AppState> {
    Router::new()
        .route("/users/{id}", get(users::show).patch(users::update))
        .nest("/products", product_routes())
        .route("/brands", get(catalog::list_brands).post(catalog::create_brand))
        .route(
            "/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .nest("/cart", cart_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/address", address_routes())
        .nest("/reviews", review_routes())
        .nest("/orders", order_routes())
        .route("/admin/stats", get(admin::stats))
        .route("/create-payment-intent", post(payments::create_payment_intent))
        .route("/payfast/initiate", post(payments::payfast_initiate))
        .route("/payfast/initialize-payment", post(payments::payfast_initiate))
        .route("/payfast/return", get(payments::payfast_return))
        .route("/payfast/cancel", get(payments::payfast_cancel))
        .layer(api_rate_limiter(trust_proxy))
}

/// Server-to-server callbacks from payment providers.
fn callback_routes() -> Router<AppState> {
    Router::new()
        .route("/stripe/webhook", post(payments::stripe_webhook))
        .route("/payfast/notify", post(payments::payfast_notify))
}

/// Create all routes.
///
/// `trust_proxy` lets the rate limiters key on forwarded-for headers.
pub fn routes(trust_proxy: bool) -> Router<AppState> {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes().layer(auth_rate_limiter(trust_proxy)))
        .merge(callback_routes())
        .merge(shop_routes(trust_proxy))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::{BrandId, Email};

    use super::*;

    #[test]
    fn test_page_query_defaults_and_clamps() {
        let page = PageQuery::default().page_request();
        assert_eq!(page.page(), 1);
        assert_eq!(page.limit(), PageRequest::DEFAULT_LIMIT);

        let page = PageQuery {
            page: Some(0),
            limit: Some(1_000),
        }
        .page_request();
        assert_eq!(page.page(), 1);
        assert_eq!(page.limit(), PageRequest::MAX_LIMIT);
    }

    #[test]
    fn test_parse_id_list() {
        let ids: Vec<BrandId> = parse_id_list(Some("1, 2,,3"), "brand").unwrap();
        assert_eq!(ids, vec![BrandId::new(1), BrandId::new(2), BrandId::new(3)]);

        let none: Vec<BrandId> = parse_id_list(None, "brand").unwrap();
        assert!(none.is_empty());

        assert!(matches!(
            parse_id_list::<BrandId>(Some("1,abc"), "brand"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_access_helpers() {
        let shopper = CurrentUser {
            id: UserId::new(1),
            email: Email::parse("a@example.com").unwrap(),
            is_admin: false,
        };
        let admin = CurrentUser {
            id: UserId::new(2),
            is_admin: true,
            ..shopper.clone()
        };

        assert!(ensure_can_access(&shopper, UserId::new(1)).is_ok());
        assert!(ensure_can_access(&shopper, UserId::new(3)).is_err());
        assert!(ensure_can_access(&admin, UserId::new(3)).is_ok());
        assert!(ensure_owner(&admin, UserId::new(3)).is_err());
    }

    #[test]
    fn test_counted_sets_total_header() {
        let response = Counted(vec![1, 2], 42).into_response();
        assert_eq!(response.headers()[TOTAL_COUNT_HEADER], "42");
    }
}

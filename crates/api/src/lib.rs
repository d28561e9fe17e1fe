//! Shopfront REST API.
//!
//! The server is built as a library so the router can be exercised in tests
//! without a listener; `main.rs` only wires configuration, logging and the
//! `PostgreSQL` session store around [`app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::{Router, extract::Request, response::Response};
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::Span;

use crate::state::AppState;

/// Build the full application router.
///
/// Layers, outermost first: Sentry, trace span, request ID, CORS, security
/// headers, session. Rate limits are applied per route group in
/// [`routes::routes`].
pub fn app<S: SessionStore + Clone>(state: AppState, sessions: SessionManagerLayer<S>) -> Router {
    let cors = middleware::cors_layer(&state.config().origin);
    let trust_proxy = state.config().trust_proxy;

    Router::new()
        .merge(routes::routes(trust_proxy))
        .layer(sessions)
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(cors)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    tracing::debug!("finished processing request");
                }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::SocketAddr;

    use axum::{
        Extension,
        body::Body,
        extract::ConnectInfo,
        http::{Method, StatusCode, header},
    };
    use secrecy::SecretString;
    use shopfront_core::CurrencyCode;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::config::{ApiConfig, StripeConfig};
    use crate::middleware::session_layer;
    use crate::services::email::EmailService;

    /// Router over a lazy pool; requests that reach the database fail, so
    /// these tests only cover paths decided before any query runs.
    fn test_app(config: ApiConfig) -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/shopfront_unused")
            .unwrap();
        let sessions = session_layer(MemoryStore::default(), &config);
        let state = AppState::with_email(config, pool, EmailService::log_only()).unwrap();
        app(state, sessions).layer(Extension(ConnectInfo(SocketAddr::from((
            [127, 0, 0, 1],
            40000,
        )))))
    }

    fn with_stripe() -> ApiConfig {
        let mut config = ApiConfig::for_tests();
        config.stripe = Some(StripeConfig {
            secret_key: SecretString::from("sk_test_unused"),
            webhook_secret: Some(SecretString::from("whsec_test_secret")),
            currency: CurrencyCode::USD,
        });
        config
    }

    async fn send(router: Router, request: Request) -> Response {
        router.oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = send(test_app(ApiConfig::for_tests()), get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_root_banner() {
        let response = send(test_app(ApiConfig::for_tests()), get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["message"], "API is running");
    }

    #[tokio::test]
    async fn test_responses_carry_request_id_and_security_headers() {
        let response = send(test_app(ApiConfig::for_tests()), get("/health")).await;
        let headers = response.headers();
        assert!(headers.contains_key(middleware::request_id::REQUEST_ID_HEADER));
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    }

    #[tokio::test]
    async fn test_check_auth_without_session_is_unauthorized() {
        let response = send(test_app(ApiConfig::for_tests()), get("/auth/check-auth")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(json_body(response).await["message"].is_string());
    }

    #[tokio::test]
    async fn test_admin_routes_require_session() {
        let response = send(test_app(ApiConfig::for_tests()), get("/admin/stats")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(test_app(ApiConfig::for_tests()), get("/orders")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_stripe_webhook_unconfigured() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/stripe/webhook")
            .header("stripe-signature", "t=1,v1=00")
            .body(Body::from("{}"))
            .unwrap();
        let response = send(test_app(ApiConfig::for_tests()), request).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_stripe_webhook_rejects_bad_signature() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/stripe/webhook")
            .header("stripe-signature", "t=1700000000,v1=deadbeef")
            .body(Body::from(r#"{"id":"evt_1","type":"payment_intent.succeeded"}"#))
            .unwrap();
        let response = send(test_app(with_stripe()), request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], "Invalid signature");
    }

    #[tokio::test]
    async fn test_stripe_webhook_requires_signature_header() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/stripe/webhook")
            .body(Body::from("{}"))
            .unwrap();
        let response = send(test_app(with_stripe()), request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_payfast_notify_unconfigured() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/payfast/notify")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("m_payment_id=1&signature=abc"))
            .unwrap();
        let response = send(test_app(ApiConfig::for_tests()), request).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_payfast_redirects_to_frontend() {
        let response = send(test_app(ApiConfig::for_tests()), get("/payfast/cancel")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "http://localhost:3000/checkout"
        );

        let response = send(
            test_app(ApiConfig::for_tests()),
            get("/payfast/return?orderId=42"),
        )
        .await;
        assert_eq!(
            response.headers()[header::LOCATION],
            "http://localhost:3000/order-success/42"
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = send(test_app(ApiConfig::for_tests()), get("/nope")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    fn from_forwarded(uri: &str, forwarded_for: &str) -> Request {
        Request::builder()
            .uri(uri)
            .header("x-forwarded-for", forwarded_for)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_auth_limit_ignores_forwarded_for_by_default() {
        let router = test_app(ApiConfig::for_tests());
        let mut statuses = Vec::new();
        for i in 0..6 {
            let request = from_forwarded("/auth/check-auth", &format!("203.0.113.{i}"));
            statuses.push(send(router.clone(), request).await.status());
        }
        assert!(statuses[..5].iter().all(|s| *s == StatusCode::UNAUTHORIZED));
        assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_auth_limit_keys_on_forwarded_for_behind_proxy() {
        let mut config = ApiConfig::for_tests();
        config.trust_proxy = true;
        let router = test_app(config);
        for i in 0..6 {
            let request = from_forwarded("/auth/check-auth", &format!("203.0.113.{i}"));
            let response = send(router.clone(), request).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }
}

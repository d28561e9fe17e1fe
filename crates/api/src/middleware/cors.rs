//! CORS for the browser frontend.
//!
//! The frontend runs on its own origin and sends the session cookie, so the
//! origin must be explicit (no wildcard) and credentials allowed.

use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::CorsLayer;

/// Header carrying the total row count of paginated lists.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Build the CORS layer for `origin`.
///
/// An origin that isn't a valid header value allows no cross-origin callers.
#[must_use]
pub fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .expose_headers([HeaderName::from_static(TOTAL_COUNT_HEADER)]);

    match HeaderValue::from_str(origin.trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin, "Invalid CORS origin, cross-origin requests disabled");
            layer
        }
    }
}

//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `auth_rate_limiter`: strict limits for `/auth` endpoints (~10/min)
//! - `api_rate_limiter`: relaxed limits for everything else (~100/min)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Key extractor for the client IP.
///
/// Uses the socket address from `ConnectInfo`; the server must be started
/// with `into_make_service_with_connect_info::<SocketAddr>()`. With
/// `trust_proxy` set, `X-Forwarded-For` (first hop) and then `X-Real-IP` take
/// precedence. Those headers are client-controlled unless a proxy in front
/// overwrites them.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor {
    trust_proxy: bool,
}

impl ClientIpKeyExtractor {
    #[must_use]
    pub const fn new(trust_proxy: bool) -> Self {
        Self { trust_proxy }
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let forwarded = if self.trust_proxy {
            forwarded_ip(req.headers())
        } else {
            None
        };

        forwarded
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
///
/// # Panics
///
/// Never in practice: `per_second(6)` and `burst_size(5)` are both non-zero,
/// which is all `GovernorConfigBuilder::finish` checks.
#[must_use]
pub fn auth_rate_limiter(trust_proxy: bool) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor::new(trust_proxy))
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Create rate limiter for general API: ~100 requests per minute per IP.
///
/// Configuration: 1 request per second (replenish), burst of 50.
///
/// # Panics
///
/// Never in practice: `per_second(1)` and `burst_size(50)` are both non-zero.
#[must_use]
pub fn api_rate_limiter(trust_proxy: bool) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor::new(trust_proxy))
        .per_second(1)
        .burst_size(50)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(50) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap_or_else(|e| panic!("{e}"))
    }

    fn peer(mut req: Request<()>) -> Request<()> {
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 9], 4000))));
        req
    }

    #[test]
    fn test_forwarded_for_takes_first_hop_behind_proxy() {
        let req = peer(request(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]));
        let ip = ClientIpKeyExtractor::new(true).extract(&req).ok();
        assert_eq!(ip, "203.0.113.7".parse().ok());
    }

    #[test]
    fn test_real_ip_fallback_behind_proxy() {
        let req = peer(request(&[("x-real-ip", "198.51.100.2")]));
        assert_eq!(
            ClientIpKeyExtractor::new(true).extract(&req).ok(),
            "198.51.100.2".parse().ok()
        );
    }

    #[test]
    fn test_forwarded_headers_ignored_without_proxy() {
        let req = peer(request(&[
            ("x-forwarded-for", "203.0.113.7"),
            ("x-real-ip", "198.51.100.2"),
        ]));
        assert_eq!(
            ClientIpKeyExtractor::new(false).extract(&req).ok(),
            "192.0.2.9".parse().ok()
        );
    }

    #[test]
    fn test_connect_info_fallback() {
        let req = peer(request(&[("x-forwarded-for", "not-an-ip")]));
        assert_eq!(
            ClientIpKeyExtractor::new(true).extract(&req).ok(),
            "192.0.2.9".parse().ok()
        );
    }

    #[test]
    fn test_no_source_is_an_error() {
        assert!(ClientIpKeyExtractor::new(false).extract(&request(&[])).is_err());
        let spoofable = request(&[("x-forwarded-for", "203.0.113.7")]);
        assert!(ClientIpKeyExtractor::new(false).extract(&spoofable).is_err());
    }
}

//! Per-client rate limiting with `governor` and `tower_governor`.
//!
//! - [`auth_rate_limiter`]: login and registration, about 10 per minute
//! - [`api_rate_limiter`]: everything else under `/api`, about 100 per minute

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Proxy headers carrying the client address, most trusted first.
const CLIENT_IP_HEADERS: [&str; 4] = [
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

/// Keys requests by the client IP reported by the fronting proxy, falling
/// back to the peer address when no proxy header is present.
///
/// `X-Forwarded-For` may hold a chain; its first entry is the client.
#[derive(Clone, Copy)]
pub struct ProxyIpKeyExtractor;

/// First parseable client address among [`CLIENT_IP_HEADERS`].
fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    CLIENT_IP_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    })
}

impl tower_governor::key_extractor::KeyExtractor for ProxyIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        client_ip(req.headers())
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ProxyIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// A limiter quota that `governor` refused.
#[derive(Debug, thiserror::Error)]
#[error("invalid rate limit: one token per {per_second}s, burst {burst}")]
pub struct RateLimitConfigError {
    per_second: u64,
    burst: u32,
}

fn limiter(per_second: u64, burst: u32) -> Result<RateLimiterLayer, RateLimitConfigError> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ProxyIpKeyExtractor)
        .per_second(per_second)
        .burst_size(burst)
        .finish()
        .ok_or(RateLimitConfigError { per_second, burst })?;
    Ok(GovernorLayer::new(Arc::new(config)))
}

/// One token every 6 seconds, burst of 5.
///
/// # Errors
///
/// Never fails for these constants; the `Result` mirrors [`limiter`].
pub fn auth_rate_limiter() -> Result<RateLimiterLayer, RateLimitConfigError> {
    limiter(6, 5)
}

/// One token per second, burst of 50.
///
/// # Errors
///
/// Never fails for these constants; the `Result` mirrors [`limiter`].
pub fn api_rate_limiter() -> Result<RateLimiterLayer, RateLimitConfigError> {
    limiter(1, 50)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_cloudflare_header_wins() {
        let map = headers(&[
            ("x-forwarded-for", "10.0.0.1"),
            ("cf-connecting-ip", "203.0.113.7"),
        ]);
        assert_eq!(client_ip(&map), Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_forwarded_chain_uses_first_hop() {
        let map = headers(&[("x-forwarded-for", "198.51.100.4, 10.0.0.1")]);
        assert_eq!(client_ip(&map), Some("198.51.100.4".parse().unwrap()));
    }

    #[test]
    fn test_skips_garbage_and_falls_through() {
        let map = headers(&[("cf-connecting-ip", "nope"), ("fly-client-ip", "2001:db8::1")]);
        assert_eq!(client_ip(&map), Some("2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn test_extractor_rejects_without_any_address() {
        let req = Request::get("/api/products").body(()).unwrap();
        assert!(ProxyIpKeyExtractor.extract(&req).is_err());
    }

    #[test]
    fn test_extractor_falls_back_to_peer_address() {
        let mut req = Request::get("/api/products").body(()).unwrap();
        let peer: SocketAddr = "192.0.2.10:51000".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(peer));
        assert_eq!(ProxyIpKeyExtractor.extract(&req).unwrap(), peer.ip());
    }

    #[test]
    fn test_limiters_build() {
        assert!(auth_rate_limiter().is_ok());
        assert!(api_rate_limiter().is_ok());
    }
}

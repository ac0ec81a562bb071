//! Per-IP rate limiting using governor and `tower_governor`.
//!
//! Two tiers:
//! - [`RateLimitTier::Strict`] for endpoints that send email, write files or
//!   call the LLM (~10/min)
//! - [`RateLimitTier::Relaxed`] for pages and file downloads (~100/min)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Client IP headers set by the proxies in front of the site, most trusted first.
const CLIENT_IP_HEADERS: &[&str] = &[
    "cf-connecting-ip",
    "fly-client-ip",
    "x-real-ip",
    "x-forwarded-for",
];

/// Key extractor reading the client IP from proxy headers, falling back to
/// the socket peer address.
#[derive(Debug, Clone, Copy)]
pub struct ProxyIpKeyExtractor;

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

/// First parsable client IP; for `x-forwarded-for` the left-most entry.
fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    CLIENT_IP_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    })
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ProxyIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// How aggressively a route group is limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitTier {
    /// One token every 6 seconds, burst of 5.
    Strict,
    /// One token per second, burst of 50.
    Relaxed,
}

impl RateLimitTier {
    const fn params(self) -> (u64, u32) {
        match self {
            Self::Strict => (6, 5),
            Self::Relaxed => (1, 50),
        }
    }

    /// Build the governor layer for this tier.
    ///
    /// # Panics
    ///
    /// Never in practice: both tiers use positive period and burst values,
    /// which `GovernorConfigBuilder` always accepts.
    #[must_use]
    pub fn layer(self) -> RateLimiterLayer {
        let (period_secs, burst) = self.params();
        let config = GovernorConfigBuilder::default()
            .key_extractor(ProxyIpKeyExtractor)
            .per_second(period_secs)
            .burst_size(burst)
            .finish()
            .expect("rate limiter config with positive period and burst is valid");
        GovernorLayer::new(Arc::new(config))
    }
}

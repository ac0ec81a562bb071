//! HTTP middleware stack for the site.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, binary only)
//! 2. CORS
//! 3. `TraceLayer` (request tracing)
//! 4. Request ID (add unique ID to each request)
//! 5. Security headers (CSP, frame options, etc.)
//! 6. Allowed hosts (reject unknown `Host` headers)
//! 7. Panic guard (500 JSON with the request ID)
//! 8. Rate limiting (governor, per route group)

pub mod allowed_hosts;
pub mod catch_panic;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use allowed_hosts::allowed_hosts_middleware;
pub use catch_panic::catch_panic_middleware;
pub use rate_limit::{RateLimitTier, RateLimiterLayer};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;

//! `Host` header allow-list.
//!
//! When `ALLOWED_HOSTS` is set, requests for any other host get a 400.
//! Entries starting with `.` also match every subdomain.

use axum::{
    extract::{Request, State},
    http::{StatusCode, header::HOST},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::state::AppState;

/// Reject requests whose `Host` is not in the configured allow-list.
pub async fn allowed_hosts_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let allowed = &state.config().allowed_hosts;
    if allowed.is_empty() {
        return next.run(request).await;
    }

    let host = request
        .headers()
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| request.uri().host())
        .map(strip_port);

    if host.is_some_and(|h| host_allowed(h, allowed)) {
        return next.run(request).await;
    }

    tracing::warn!(host = ?host, "Rejected request for unknown host");
    (StatusCode::BAD_REQUEST, "Invalid host header").into_response()
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal, e.g. [::1]:8000
        return host.find(']').and_then(|end| host.get(..=end)).unwrap_or(host);
    }
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}

fn host_allowed(host: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|entry| {
        if entry == "*" {
            return true;
        }
        if let Some(domain) = entry.strip_prefix('.') {
            return host.eq_ignore_ascii_case(domain)
                || host
                    .to_ascii_lowercase()
                    .ends_with(&format!(".{}", domain.to_ascii_lowercase()));
        }
        host.eq_ignore_ascii_case(entry)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(entries: &[&str]) -> Vec<String> {
        entries.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("aichatflows.com:443"), "aichatflows.com");
        assert_eq!(strip_port("localhost"), "localhost");
        assert_eq!(strip_port("[::1]:8000"), "[::1]");
    }

    #[test]
    fn test_exact_and_subdomain_matching() {
        let allowed = list(&["localhost", ".aichatflows.com"]);
        assert!(host_allowed("localhost", &allowed));
        assert!(host_allowed("AIChatFlows.com", &allowed));
        assert!(host_allowed("www.aichatflows.com", &allowed));
        assert!(!host_allowed("evilaichatflows.com", &allowed));
        assert!(!host_allowed("attacker.example", &allowed));
    }

    #[test]
    fn test_wildcard_allows_everything() {
        assert!(host_allowed("anything.test", &list(&["*"])));
    }
}

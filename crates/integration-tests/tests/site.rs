//! Integration tests for pages and cross-cutting middleware.

#![allow(clippy::unwrap_used)]

use aichatflows_integration_tests::{TestApp, TestOptions};
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

// =============================================================================
// Pages
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::spawn().await;

    let resp = app.get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_pages_render() {
    let app = TestApp::spawn().await;

    for path in ["/", "/start", "/start?plan=pro", "/legal"] {
        let resp = app.get(path).await;
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
        assert!(
            resp.headers()["content-type"]
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );
    }
}

#[tokio::test]
async fn test_start_preselects_requested_plan() {
    let app = TestApp::spawn().await;

    let html = app.get("/start?plan=pro").await.text().await.unwrap();
    assert!(html.contains("onboarding-form"));
    assert!(html.contains("value=\"Pro\" required checked"));
}

#[tokio::test]
async fn test_static_assets_are_served() {
    let app = TestApp::spawn().await;

    let resp = app.get("/static/js/onboarding.js").await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::spawn().await;

    let resp = app.get("/wp-admin").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Middleware
// =============================================================================

#[tokio::test]
async fn test_security_headers_on_pages_and_api() {
    let app = TestApp::spawn().await;

    let page = app.get("/").await;
    assert_eq!(page.headers()["x-frame-options"], "DENY");
    assert_eq!(page.headers()["x-content-type-options"], "nosniff");
    assert!(page.headers().contains_key("content-security-policy"));
    assert!(page.headers().get("cache-control").is_none());

    let api = app
        .post_json("/api/demo-chat", &json!({"message": "hi"}))
        .await;
    assert_eq!(api.headers()["x-frame-options"], "DENY");
    assert!(
        api.headers()["cache-control"]
            .to_str()
            .unwrap()
            .contains("no-store")
    );
}

#[tokio::test]
async fn test_request_id_is_generated_or_propagated() {
    let app = TestApp::spawn().await;

    let resp = app.get("/health").await;
    let generated = resp.headers()["x-request-id"].to_str().unwrap();
    assert!(Uuid::parse_str(generated).is_ok());

    let upstream = Uuid::new_v4().to_string();
    let resp = app
        .client
        .get(app.url("/health"))
        .header("x-request-id", &upstream)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], upstream.as_str());

    let resp = app
        .client
        .get(app.url("/health"))
        .header("x-request-id", "<script>")
        .send()
        .await
        .unwrap();
    let replaced = resp.headers()["x-request-id"].to_str().unwrap();
    assert!(Uuid::parse_str(replaced).is_ok());
}

#[tokio::test]
async fn test_unknown_host_is_rejected() {
    let app = TestApp::spawn_with(TestOptions {
        configure: |config| config.allowed_hosts = vec![".aichatflows.com".to_string()],
        ..TestOptions::default()
    })
    .await;

    // reqwest sends 127.0.0.1:<port> as the host.
    let resp = app.get("/health").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .client
        .get(app.url("/health"))
        .header("host", "www.aichatflows.com")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cors_allows_configured_origin_only() {
    let app = TestApp::spawn_with(TestOptions {
        configure: |config| config.allowed_origins = vec!["https://aichatflows.com".to_string()],
        ..TestOptions::default()
    })
    .await;

    let allowed = app
        .client
        .get(app.url("/health"))
        .header("origin", "https://aichatflows.com")
        .send()
        .await
        .unwrap();
    assert_eq!(
        allowed.headers()["access-control-allow-origin"],
        "https://aichatflows.com"
    );

    let other = app
        .client
        .get(app.url("/health"))
        .header("origin", "https://evil.example")
        .send()
        .await
        .unwrap();
    assert!(other.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_form_endpoints_are_rate_limited() {
    let app = TestApp::spawn_with(TestOptions {
        rate_limits: true,
        ..TestOptions::default()
    })
    .await;

    let body = json!({"message": "hi"});
    for _ in 0..5 {
        let resp = app.post_json("/api/demo-chat", &body).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let resp = app.post_json("/api/demo-chat", &body).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    // Pages use their own, larger budget.
    let resp = app.get("/").await;
    assert_eq!(resp.status(), StatusCode::OK);
}

//! Integration tests for the support chat endpoints.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use aichatflows_integration_tests::{FailingChat, FixedChat, TestApp, TestOptions};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn test_chat_without_llm_uses_demo_reply() {
    let app = TestApp::spawn().await;

    let resp = app
        .post_json(
            "/api/chat",
            &json!({"user_id": "visitor-1", "message": "How much does it cost?"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert!(body["reply"].as_str().unwrap().contains("Starter"));
}

#[tokio::test]
async fn test_chat_uses_configured_backend() {
    let app = TestApp::spawn_with(TestOptions {
        chat: Some(Arc::new(FixedChat("We set you up in 48 hours."))),
        ..TestOptions::default()
    })
    .await;

    let resp = app
        .post_json("/api/chat", &json!({"message": "How fast is setup?"}))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["reply"], "We set you up in 48 hours.");
}

#[tokio::test]
async fn test_demo_chat_ignores_configured_backend() {
    let app = TestApp::spawn_with(TestOptions {
        chat: Some(Arc::new(FixedChat("from the model"))),
        ..TestOptions::default()
    })
    .await;

    let body: Value = app
        .post_json("/api/demo-chat", &json!({"message": "hello"}))
        .await
        .json()
        .await
        .unwrap();
    assert!(body["reply"].as_str().unwrap().starts_with("Hello!"));
}

#[tokio::test]
async fn test_backend_failure_is_bad_gateway() {
    let app = TestApp::spawn_with(TestOptions {
        chat: Some(Arc::new(FailingChat)),
        ..TestOptions::default()
    })
    .await;

    let resp = app
        .post_json("/api/chat", &json!({"message": "Are you there?"}))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(!body.to_string().contains("Overloaded"));
}

#[tokio::test]
async fn test_blank_message_is_bad_request() {
    let app = TestApp::spawn().await;

    let resp = app.post_json("/api/chat", &json!({"message": "   "})).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_over_long_message_is_bad_request() {
    let app = TestApp::spawn().await;

    let resp = app
        .post_json("/api/demo-chat", &json!({"message": "a".repeat(2001)}))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_message_is_bad_request() {
    let app = TestApp::spawn().await;

    let resp = app.post_json("/api/chat", &json!({"user_id": "v"})).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

//! Anthropic Messages API client for the support widget.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::config::LlmConfig;

use super::error::{ApiErrorResponse, ChatError};
use super::types::{ChatRequest, ChatResponse, Message};
use super::{ChatCompletion, SYSTEM_PROMPT};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const TEMPERATURE: f32 = 0.7;

/// Claude API client.
#[derive(Clone)]
pub struct ClaudeClient {
    inner: Arc<ClaudeClientInner>,
}

struct ClaudeClientInner {
    client: reqwest::Client,
    model: String,
    api_url: String,
}

impl ClaudeClient {
    /// Create a new Claude client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key contains invalid header characters or
    /// the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, ChatError> {
        Self::with_api_url(config, ANTHROPIC_API_URL)
    }

    /// Create a client that posts to `api_url` instead of the public endpoint.
    ///
    /// # Errors
    ///
    /// See [`ClaudeClient::new`].
    pub fn with_api_url(config: &LlmConfig, api_url: &str) -> Result<Self, ChatError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|_| ChatError::Config("API key is not a valid header value".to_string()))?;
        api_key.set_sensitive(true);
        headers.insert("x-api-key", api_key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ChatError::Config(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(ClaudeClientInner {
                client,
                model: config.model.clone(),
                api_url: api_url.to_string(),
            }),
        })
    }

    /// Send a conversation and get a complete response.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip(self, messages, system), fields(model = %self.inner.model))]
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
    ) -> Result<ChatResponse, ChatError> {
        let request = ChatRequest {
            model: self.inner.model.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            messages,
            system,
            temperature: Some(TEMPERATURE),
        };

        let response = self
            .inner
            .client
            .post(&self.inner.api_url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_error_status(status, response).await);
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ChatError::Parse(format!("Failed to parse response: {e}")))?;

        tracing::debug!(
            response_id = %parsed.id,
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "Chat completion received"
        );
        Ok(parsed)
    }
}

#[async_trait]
impl ChatCompletion for ClaudeClient {
    async fn reply(&self, message: &str) -> Result<String, ChatError> {
        let response = self
            .chat(vec![Message::user(message)], Some(SYSTEM_PROMPT.to_string()))
            .await?;
        let text = response.text();
        if text.is_empty() {
            return Err(ChatError::EmptyReply);
        }
        Ok(text)
    }
}

/// Map an error status code to a [`ChatError`].
async fn handle_error_status(status: reqwest::StatusCode, response: reqwest::Response) -> ChatError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        return ChatError::RateLimited(retry_after);
    }

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return ChatError::Unauthorized("Invalid API key".to_string());
    }

    match response.text().await {
        Ok(body) => serde_json::from_str::<ApiErrorResponse>(&body).map_or_else(
            |_| ChatError::Api {
                error_type: "unknown".to_string(),
                message: body.clone(),
            },
            |api_error| ChatError::Api {
                error_type: api_error.error.error_type,
                message: api_error.error.message,
            },
        ),
        Err(e) => ChatError::Http(e),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use axum::{
        Json, Router,
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::post,
    };
    use secrecy::SecretString;
    use serde_json::{Value, json};

    use super::*;

    const TEST_MODEL: &str = "claude-3-5-haiku-latest";
    const TEST_KEY: &str = "sk-ant-test-key";

    fn test_config() -> LlmConfig {
        LlmConfig {
            api_key: SecretString::from(TEST_KEY),
            model: TEST_MODEL.to_string(),
        }
    }

    /// Canned Messages API that records the last request it saw.
    struct StubApi {
        status: StatusCode,
        retry_after: Option<&'static str>,
        body: String,
        seen: Mutex<Option<(HeaderMap, Value)>>,
    }

    async fn messages(
        State(stub): State<Arc<StubApi>>,
        headers: HeaderMap,
        Json(request): Json<Value>,
    ) -> Response {
        *stub.seen.lock().unwrap() = Some((headers, request));
        let mut response = (stub.status, stub.body.clone()).into_response();
        if let Some(secs) = stub.retry_after {
            response
                .headers_mut()
                .insert("retry-after", HeaderValue::from_static(secs));
        }
        response
    }

    async fn spawn_stub(
        status: StatusCode,
        retry_after: Option<&'static str>,
        body: Value,
    ) -> (ClaudeClient, Arc<StubApi>) {
        let stub = Arc::new(StubApi {
            status,
            retry_after,
            body: body.to_string(),
            seen: Mutex::new(None),
        });
        let app = Router::new()
            .route("/v1/messages", post(messages))
            .with_state(stub.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client =
            ClaudeClient::with_api_url(&test_config(), &format!("http://{addr}/v1/messages"))
                .unwrap();
        (client, stub)
    }

    fn text_reply(text: &str) -> Value {
        json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": TEST_MODEL,
            "content": [{"type": "text", "text": text}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 5}
        })
    }

    #[test]
    fn test_claude_client_is_clone_send_sync() {
        fn assert_traits<T: Clone + Send + Sync>() {}
        assert_traits::<ClaudeClient>();
    }

    #[test]
    fn test_new_rejects_unusable_key() {
        let config = LlmConfig {
            api_key: SecretString::from("bad\nkey"),
            model: TEST_MODEL.to_string(),
        };
        assert!(matches!(
            ClaudeClient::new(&config),
            Err(ChatError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let client = ClaudeClient::with_api_url(&test_config(), "http://127.0.0.1:9/v1/messages")
            .expect("client builds");
        let result = client.reply("hello").await;
        assert!(matches!(result, Err(ChatError::Http(_))));
    }

    #[tokio::test]
    async fn test_reply_sends_prompt_and_returns_text() {
        let (client, stub) =
            spawn_stub(StatusCode::OK, None, text_reply("  Setup takes 24-48 hours. ")).await;

        let reply = client.reply("How long does setup take?").await.unwrap();
        assert_eq!(reply, "Setup takes 24-48 hours.");

        let (headers, request) = stub.seen.lock().unwrap().take().unwrap();
        assert_eq!(headers["x-api-key"], TEST_KEY);
        assert_eq!(headers["anthropic-version"], ANTHROPIC_VERSION);
        assert_eq!(request["model"], TEST_MODEL);
        assert_eq!(request["system"], SYSTEM_PROMPT);
        assert_eq!(request["max_tokens"], DEFAULT_MAX_TOKENS);
        assert_eq!(
            request["messages"],
            json!([{"role": "user", "content": "How long does setup take?"}])
        );
    }

    #[tokio::test]
    async fn test_reply_without_text_is_empty_reply() {
        let mut body = text_reply("");
        body["content"] = json!([{"type": "tool_use", "id": "t1", "name": "x", "input": {}}]);
        let (client, _stub) = spawn_stub(StatusCode::OK, None, body).await;

        assert!(matches!(
            client.reply("hi").await,
            Err(ChatError::EmptyReply)
        ));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_parse_error() {
        let (client, _stub) = spawn_stub(StatusCode::OK, None, json!({"unexpected": true})).await;

        assert!(matches!(client.reply("hi").await, Err(ChatError::Parse(_))));
    }

    #[tokio::test]
    async fn test_too_many_requests_is_rate_limited() {
        let (client, _stub) =
            spawn_stub(StatusCode::TOO_MANY_REQUESTS, Some("12"), json!({})).await;

        assert!(matches!(
            client.reply("hi").await,
            Err(ChatError::RateLimited(12))
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_without_retry_after_defaults() {
        let (client, _stub) = spawn_stub(StatusCode::TOO_MANY_REQUESTS, None, json!({})).await;

        assert!(matches!(
            client.reply("hi").await,
            Err(ChatError::RateLimited(60))
        ));
    }

    #[tokio::test]
    async fn test_unauthorized_is_mapped() {
        let body = json!({
            "type": "error",
            "error": {"type": "authentication_error", "message": "invalid x-api-key"}
        });
        let (client, _stub) = spawn_stub(StatusCode::UNAUTHORIZED, None, body).await;

        assert!(matches!(
            client.reply("hi").await,
            Err(ChatError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_error_body_is_api_error() {
        let body = json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}
        });
        let (client, _stub) = spawn_stub(StatusCode::SERVICE_UNAVAILABLE, None, body).await;

        match client.reply("hi").await {
            Err(ChatError::Api {
                error_type,
                message,
            }) => {
                assert_eq!(error_type, "overloaded_error");
                assert_eq!(message, "Overloaded");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unstructured_error_body_is_unknown_api_error() {
        let (client, _stub) =
            spawn_stub(StatusCode::BAD_GATEWAY, None, json!("upstream down")).await;

        match client.reply("hi").await {
            Err(ChatError::Api { error_type, .. }) => assert_eq!(error_type, "unknown"),
            other => panic!("expected API error, got {other:?}"),
        }
    }
}

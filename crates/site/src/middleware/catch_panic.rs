//! Turns a panicking handler into a 500 response.
//!
//! Must run inside the request ID middleware so the response body can carry
//! the ID the client sees in `x-request-id`.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;

use super::RequestId;
use crate::error::AppError;

/// Middleware that answers with [`AppError::Internal`] when the inner service panics.
pub async fn catch_panic_middleware(request: Request, next: Next) -> Response {
    let request_id = request.extensions().get::<RequestId>().map(|id| id.0);

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => AppError::internal(
            format!("handler panicked: {}", panic_message(panic.as_ref())),
            request_id,
        )
        .into_response(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::StatusCode,
        middleware,
        routing::{get, post},
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::error::INTERNAL_ERROR_MESSAGE;
    use crate::middleware::{REQUEST_ID_HEADER, request_id_middleware};

    async fn explode() -> &'static str {
        panic!("submission pipeline bug")
    }

    fn app() -> Router {
        Router::new()
            .route("/api/submit-onboarding", post(explode))
            .route("/ok", get(|| async { "ok" }))
            .layer(middleware::from_fn(catch_panic_middleware))
            .layer(middleware::from_fn(request_id_middleware))
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error_with_request_id() {
        let request_id = Uuid::new_v4();
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/submit-onboarding")
                    .header(REQUEST_ID_HEADER, request_id.to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()[REQUEST_ID_HEADER],
            request_id.to_string().as_str()
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], INTERNAL_ERROR_MESSAGE);
        assert_eq!(body["request_id"], request_id.to_string());
        assert!(!body.to_string().contains("pipeline bug"));
    }

    #[tokio::test]
    async fn test_normal_responses_pass_through() {
        let response = app()
            .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_panic_message_reads_str_and_string() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}

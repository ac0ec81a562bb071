//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. API handlers return `Result<T, AppError>`
//! and every error renders as a JSON body with `success: false`.

use aichatflows_core::ValidationErrors;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::services::chat::{ChatError, MessageError};
use crate::services::uploads::UploadError;

/// Message shown for any unexpected failure.
pub const INTERNAL_ERROR_MESSAGE: &str =
    "An unexpected error occurred. Please try again or contact support.";

/// Application-level error type for the site.
#[derive(Debug, Error)]
pub enum AppError {
    /// The onboarding form failed validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Upload rejected or unreadable.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// LLM request failed.
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {detail}")]
    Internal {
        detail: String,
        request_id: Option<Uuid>,
    },
}

impl AppError {
    /// Internal error tagged with the request it belongs to.
    pub fn internal(detail: impl Into<String>, request_id: Option<Uuid>) -> Self {
        Self::Internal {
            detail: detail.into(),
            request_id,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Upload(err) => match err {
                UploadError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                UploadError::NotFound => StatusCode::NOT_FOUND,
                UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
                UploadError::Empty
                | UploadError::UnsupportedType(_)
                | UploadError::ContentTypeMismatch { .. }
                | UploadError::InvalidKind(_) => StatusCode::BAD_REQUEST,
            },
            Self::Chat(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MessageError> for AppError {
    fn from(err: MessageError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() && !matches!(self, Self::Chat(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if matches!(self, Self::Chat(_)) {
            tracing::warn!(error = %self, "LLM request failed");
        }

        // Don't expose internal error details to clients
        let body = match self {
            Self::Validation(errors) => json!({
                "success": false,
                "message": "Please correct the highlighted fields and try again.",
                "errors": errors.0,
            }),
            Self::Internal { request_id, .. } => json!({
                "success": false,
                "message": INTERNAL_ERROR_MESSAGE,
                "request_id": request_id,
            }),
            Self::Upload(UploadError::Io(_)) => json!({
                "success": false,
                "message": INTERNAL_ERROR_MESSAGE,
            }),
            Self::Chat(_) => json!({
                "success": false,
                "message": "The assistant is unavailable right now. Please try again shortly.",
            }),
            Self::Upload(err) => json!({ "success": false, "message": err.to_string() }),
            Self::BadRequest(message) => json!({ "success": false, "message": message }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aichatflows_core::{Field, FieldError};
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Upload(UploadError::TooLarge);
        assert_eq!(err.to_string(), "Upload error: File is larger than the 10 MB limit");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::Upload(UploadError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Upload(UploadError::TooLarge)),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            get_status(AppError::Chat(ChatError::EmptyReply)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::internal("test", None)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_validation_body_lists_errors() {
        let errors = ValidationErrors(vec![FieldError::required(Field::BusinessName)]);
        let response = AppError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"][0]["field"], "business_name");
        assert_eq!(body["errors"][0]["message"], "Business name is required");
    }

    #[tokio::test]
    async fn test_internal_body_hides_detail() {
        let id = Uuid::new_v4();
        let response = AppError::internal("disk on fire", Some(id)).into_response();
        let body = body_json(response).await;
        assert_eq!(body["message"], INTERNAL_ERROR_MESSAGE);
        assert_eq!(body["request_id"], id.to_string());
        assert!(!body.to_string().contains("disk on fire"));
    }
}

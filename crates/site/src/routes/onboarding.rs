//! Onboarding form submission.
//!
//! POST /api/submit-onboarding
//!
//! Validates and sanitizes the form, emails platform logins once, stores the
//! credential-free record, sends notifications and returns the checkout link
//! for the chosen plan. Storage and email failures are logged and never fail
//! the response.

use aichatflows_core::{RoutedSubmission, route_credentials, validate_submission};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequestId;
use crate::state::AppState;

/// Successful submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    /// Checkout link for the chosen plan; `null` when not configured.
    pub stripe_url: Option<String>,
    pub request_id: Uuid,
}

/// Accept an onboarding submission.
///
/// # Errors
///
/// Returns 400 for a malformed body and 422 listing every invalid field.
#[instrument(skip_all, fields(request_id = %request_id))]
pub async fn submit_onboarding(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<SubmitResponse>> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::info!(error = %rejection.body_text(), "Malformed onboarding payload");
        AppError::BadRequest("Request body must be valid JSON".to_string())
    })?;
    let Value::Object(payload) = payload else {
        return Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    };

    let submission = validate_submission(&payload, Utc::now()).inspect_err(|errors| {
        tracing::info!(
            fields = ?errors.errors().iter().map(|e| e.field).collect::<Vec<_>>(),
            "Onboarding submission rejected"
        );
    })?;

    let RoutedSubmission { bundle, record } = route_credentials(submission, request_id);
    let plan = record.details.plan;

    add_breadcrumb(
        "onboarding",
        "Submission validated",
        Some(&[
            ("plan", plan.as_str()),
            ("credentials_handling", record.credentials_handling.as_str()),
        ]),
    );

    if let Err(e) = state.submissions().save(&record).await {
        tracing::error!(error = %e, "Failed to store submission, continuing");
    }

    let report = state
        .notifications()
        .submission_received(&record, bundle.as_ref())
        .await;
    drop(bundle);

    tracing::info!(
        plan = %plan,
        emails_sent = report.sent,
        emails_failed = report.failed,
        "Onboarding submission accepted"
    );

    let stripe_url = state.config().checkout.url_for(plan).map(str::to_string);
    let message = if stripe_url.is_some() {
        "Thank you! Your details were received. Redirecting you to checkout..."
    } else {
        "Thank you! Your details were received. Our team will be in touch within 24-48 hours."
    };

    Ok(Json(SubmitResponse {
        success: true,
        message: message.to_string(),
        stripe_url,
        request_id,
    }))
}

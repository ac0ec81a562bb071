//! Support chat handlers.
//!
//! POST /api/chat       - LLM reply, or a canned reply without an API key
//! POST /api/demo-chat  - Always a canned reply

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::services::chat::{check_message, demo_reply};
use crate::state::AppState;

/// Chat request body.
#[derive(Debug, Deserialize)]
pub struct ChatBody {
    /// Anonymous visitor ID, for log correlation only.
    #[serde(default)]
    pub user_id: Option<String>,
    pub message: String,
}

/// Chat reply body.
#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

/// Answer a visitor with the LLM.
///
/// # Errors
///
/// Returns 400 for empty or over-long messages and 502 if the LLM fails.
#[instrument(skip_all)]
pub async fn chat(
    State(state): State<AppState>,
    body: std::result::Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatReply>> {
    let body = parse_body(body)?;
    let message = check_message(&body.message)?;
    tracing::debug!(user_id = body.user_id.as_deref().unwrap_or("anonymous"), "Chat message");

    let reply = match state.chat() {
        Some(backend) => backend.reply(message).await?,
        None => demo_reply(message),
    };

    Ok(Json(ChatReply { reply }))
}

/// Answer a visitor from the canned reply table.
///
/// # Errors
///
/// Returns 400 for empty or over-long messages.
#[instrument(skip_all)]
pub async fn demo_chat(body: std::result::Result<Json<ChatBody>, JsonRejection>) -> Result<Json<ChatReply>> {
    let body = parse_body(body)?;
    let message = check_message(&body.message)?;
    Ok(Json(ChatReply {
        reply: demo_reply(message),
    }))
}

fn parse_body(body: std::result::Result<Json<ChatBody>, JsonRejection>) -> Result<ChatBody> {
    body.map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

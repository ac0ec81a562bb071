//! HTTP route handlers for the site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                  - Landing page with chat widget
//! GET  /start?plan=starter|pro            - Onboarding form
//! GET  /legal                             - Legal notice
//! GET  /thank-you?ref=<request id>        - Post-checkout page, sends payment emails
//! GET  /health                            - Liveness check
//!
//! # API
//! POST /api/submit-onboarding             - Onboarding form (JSON)
//! POST /api/upload-file                   - Onboarding document (multipart)
//! GET  /api/files/{business}/{filename}   - Serve an uploaded document
//! POST /api/chat                          - Support chat
//! POST /api/demo-chat                     - Canned support chat
//! ```

pub mod chat;
pub mod onboarding;
pub mod pages;
pub mod uploads;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::services::uploads::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Room for multipart framing and the text fields around the file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Routes that send email, write files or call the LLM.
pub fn form_api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/submit-onboarding",
            post(onboarding::submit_onboarding),
        )
        .route(
            "/api/upload-file",
            post(uploads::upload_file)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/api/chat", post(chat::chat))
        .route("/api/demo-chat", post(chat::demo_chat))
}

/// Pages and uploaded file downloads.
pub fn browse_routes() -> Router<AppState> {
    pages::router().route("/api/files/{business}/{filename}", get(uploads::serve_file))
}

/// Create all routes for the site, without rate limits.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(browse_routes())
        .merge(form_api_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

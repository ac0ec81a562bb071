//! Services behind the HTTP handlers.
//!
//! - `chat` - LLM-backed and canned replies for the support widget
//! - `email` - SMTP delivery and onboarding notifications
//! - `store` - JSON files for stored submissions
//! - `uploads` - Uploaded onboarding documents

pub mod chat;
pub mod email;
pub mod store;
pub mod uploads;

pub use chat::{ChatCompletion, ClaudeClient};
pub use email::{DisabledMailer, Mailer, NotificationDispatcher, SmtpMailer};
pub use store::SubmissionStore;
pub use uploads::UploadStore;

//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::SiteConfig;
use crate::services::chat::{ChatCompletion, ChatError, ClaudeClient};
use crate::services::email::{
    DisabledMailer, EmailError, Mailer, NotificationDispatcher, SmtpMailer,
};
use crate::services::store::SubmissionStore;
use crate::services::uploads::UploadStore;

/// Error building services from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("email setup failed: {0}")]
    Email(#[from] EmailError),
    #[error("chat client setup failed: {0}")]
    Chat(#[from] ChatError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Every outside collaborator
/// (mailer, LLM client) is injected, so tests can swap in fakes.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SiteConfig,
    notifications: NotificationDispatcher,
    chat: Option<Arc<dyn ChatCompletion>>,
    submissions: SubmissionStore,
    uploads: UploadStore,
}

impl AppState {
    /// Create state with explicit collaborators.
    #[must_use]
    pub fn new(
        config: SiteConfig,
        mailer: Arc<dyn Mailer>,
        chat: Option<Arc<dyn ChatCompletion>>,
    ) -> Self {
        let notifications = NotificationDispatcher::new(
            mailer,
            config.email.admin_address.clone(),
            config.email.support_address.clone(),
            config.base_url.clone(),
        );
        let submissions =
            SubmissionStore::with_fallback(&config.submissions_dir, &config.submissions_fallback_dir);
        let uploads = UploadStore::new(&config.uploads_dir);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                notifications,
                chat,
                submissions,
                uploads,
            }),
        }
    }

    /// Create state with the production SMTP mailer and Claude client.
    ///
    /// Falls back to [`DisabledMailer`] without SMTP credentials and to demo
    /// chat replies without an LLM key.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay or the HTTP client cannot be built.
    pub fn from_config(config: SiteConfig) -> Result<Self, StateError> {
        let mailer: Arc<dyn Mailer> = match SmtpMailer::from_config(&config.email)? {
            Some(smtp) => Arc::new(smtp),
            None => {
                tracing::warn!("SMTP credentials not set, notification emails are disabled");
                Arc::new(DisabledMailer)
            }
        };

        let chat: Option<Arc<dyn ChatCompletion>> = match config.llm.as_ref() {
            Some(llm) => Some(Arc::new(ClaudeClient::new(llm)?)),
            None => {
                tracing::warn!("LLM_API_KEY not set, chat widget will use demo replies");
                None
            }
        };

        Ok(Self::new(config, mailer, chat))
    }

    /// Site configuration.
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    /// Notification dispatcher.
    #[must_use]
    pub fn notifications(&self) -> &NotificationDispatcher {
        &self.inner.notifications
    }

    /// LLM backend, when configured.
    #[must_use]
    pub fn chat(&self) -> Option<&Arc<dyn ChatCompletion>> {
        self.inner.chat.as_ref()
    }

    /// Submission record store.
    #[must_use]
    pub fn submissions(&self) -> &SubmissionStore {
        &self.inner.submissions
    }

    /// Uploaded file store.
    #[must_use]
    pub fn uploads(&self) -> &UploadStore {
        &self.inner.uploads
    }
}

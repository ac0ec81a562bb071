//! Integration tests for the AIChatFlows site.
//!
//! Each test spawns the real router on an ephemeral port with temporary
//! storage directories, a recording mailer and an optional fake chat
//! backend, then talks to it over HTTP with reqwest.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p aichatflows-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use aichatflows_core::Email;
use aichatflows_site::config::{CheckoutConfig, EmailConfig, SiteConfig};
use aichatflows_site::services::chat::{ChatCompletion, ChatError};
use aichatflows_site::services::email::{EmailError, Mailer, OutgoingEmail};
use aichatflows_site::state::AppState;
use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;

pub const ADMIN_EMAIL: &str = "admin@aichatflows.com";
pub const SUPPORT_EMAIL: &str = "support@aichatflows.com";
pub const STARTER_CHECKOUT: &str = "https://buy.stripe.com/test_starter";
pub const PRO_CHECKOUT: &str = "https://buy.stripe.com/test_pro";

/// Mailer that keeps every message, optionally failing each send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

impl RecordingMailer {
    /// A mailer whose every send fails after being recorded.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    /// Messages handed to the mailer so far.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Messages rendered from `template`.
    pub fn with_template(&self, template: &str) -> Vec<OutgoingEmail> {
        self.sent()
            .into_iter()
            .filter(|e| e.template == template)
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(email.clone());
        if self.fail {
            return Err(EmailError::InvalidAddress(email.to.to_string()));
        }
        Ok(())
    }
}

/// Chat backend with a fixed answer.
pub struct FixedChat(pub &'static str);

#[async_trait]
impl ChatCompletion for FixedChat {
    async fn reply(&self, _message: &str) -> Result<String, ChatError> {
        Ok(self.0.to_string())
    }
}

/// Chat backend that always fails.
pub struct FailingChat;

#[async_trait]
impl ChatCompletion for FailingChat {
    async fn reply(&self, _message: &str) -> Result<String, ChatError> {
        Err(ChatError::Api {
            error_type: "overloaded_error".to_string(),
            message: "Overloaded".to_string(),
        })
    }
}

/// Site configuration rooted in `root`, with no SMTP, LLM or Sentry.
#[must_use]
pub fn test_config(root: &Path) -> SiteConfig {
    SiteConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:8000".to_string(),
        submissions_dir: root.join("submissions"),
        submissions_fallback_dir: root.join("submissions-fallback"),
        uploads_dir: root.join("uploads"),
        static_dir: Path::new(env!("CARGO_MANIFEST_DIR")).join("../site/static"),
        allowed_origins: Vec::new(),
        allowed_hosts: Vec::new(),
        email: EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 2525,
            smtp_credentials: None,
            from_address: Email::parse("noreply@aichatflows.com").unwrap(),
            admin_address: Some(Email::parse(ADMIN_EMAIL).unwrap()),
            support_address: Some(Email::parse(SUPPORT_EMAIL).unwrap()),
        },
        llm: None,
        checkout: CheckoutConfig {
            starter_url: Some(STARTER_CHECKOUT.to_string()),
            pro_url: Some(PRO_CHECKOUT.to_string()),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Knobs for [`TestApp::spawn_with`].
pub struct TestOptions {
    pub mailer: Arc<RecordingMailer>,
    pub chat: Option<Arc<dyn ChatCompletion>>,
    pub rate_limits: bool,
    pub configure: fn(&mut SiteConfig),
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            mailer: Arc::new(RecordingMailer::default()),
            chat: None,
            rate_limits: false,
            configure: |_| {},
        }
    }
}

/// A running site with its own storage.
pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub mailer: Arc<RecordingMailer>,
    pub config: SiteConfig,
    _root: TempDir,
}

impl TestApp {
    /// Spawn with default options.
    pub async fn spawn() -> Self {
        Self::spawn_with(TestOptions::default()).await
    }

    /// Spawn the router on an ephemeral port.
    pub async fn spawn_with(options: TestOptions) -> Self {
        let root = tempfile::tempdir().unwrap();
        let mut config = test_config(root.path());
        (options.configure)(&mut config);

        let mailer_handle: Arc<dyn Mailer> = options.mailer.clone();
        let state = AppState::new(config.clone(), mailer_handle, options.chat);
        let app = if options.rate_limits {
            aichatflows_site::app_with_rate_limits(state)
        } else {
            aichatflows_site::app(state)
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            mailer: options.mailer,
            config,
            _root: root,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    /// JSON files written to the submissions directory.
    #[must_use]
    pub fn stored_submissions(&self) -> Vec<PathBuf> {
        json_files(&self.config.submissions_dir)
    }

    /// JSON files written to the fallback directory.
    #[must_use]
    pub fn fallback_submissions(&self) -> Vec<PathBuf> {
        json_files(&self.config.submissions_fallback_dir)
    }
}

fn json_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|e| e == "json"))
                .collect()
        })
        .unwrap_or_default()
}

/// Starter plan, in-person setup, no logins.
#[must_use]
pub fn starter_payload() -> Value {
    json!({
        "business_name": "Sunrise Coffee",
        "instagram_handle": "@sunrisecoffee",
        "business_type": "Cafe",
        "product_service_description": "Espresso drinks and fresh pastries",
        "common_customer_question": "What time do you open on Sundays?",
        "delivery_pickup": "Pickup",
        "pickup_method": "Counter pickup",
        "has_faqs": false,
        "plan": "Starter",
        "submission_method": "Request In-Person Setup",
        "consent_to_share": true,
        "confirm_accurate": true,
        "consent_automation": true,
        "contact_email": "owner@sunrise.coffee",
        "submission_timestamp": "2025-03-14T09:30:00Z"
    })
}

/// Pro plan, online setup, with platform logins.
#[must_use]
pub fn pro_online_payload() -> Value {
    json!({
        "business_name": "Bella Pizza",
        "instagram_handle": "@bellapizza",
        "business_type": "Restaurant",
        "product_service_description": "Wood-fired pizza",
        "common_customer_question": "Do you deliver downtown?",
        "delivery_pickup": "Both",
        "delivery_services": ["DoorDash", "Uber Eats"],
        "pickup_method": "Front counter",
        "has_faqs": true,
        "faq_content": "Open 11-10 daily.",
        "plan": "Pro",
        "submission_method": "Submit through this page",
        "instagram_email": "bella_ig",
        "instagram_password": "ig-Secret-Passw0rd!",
        "facebook_email": "bella@facebook.example",
        "facebook_password": "fb-Secret-Passw0rd!",
        "tiktok_email": "bella_tt",
        "tiktok_password": "tt-Secret-Passw0rd!",
        "consent_to_share": true,
        "confirm_accurate": true,
        "consent_automation": true,
        "contact_email": "owner@bella.pizza"
    })
}

/// Every credential value in [`pro_online_payload`].
pub const PRO_PASSWORDS: &[&str] = &[
    "ig-Secret-Passw0rd!",
    "fb-Secret-Passw0rd!",
    "tt-Secret-Passw0rd!",
];

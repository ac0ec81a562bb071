//! Site configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; the site runs locally with none set.
//!
//! ## Server
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 8000)
//! - `BASE_URL` - Public URL used in emails and upload links (default: <http://localhost:8000>)
//! - `SUBMISSIONS_DIR` - Where onboarding records are written (default: submissions)
//! - `SUBMISSIONS_FALLBACK_DIR` - Used when `SUBMISSIONS_DIR` is not writable
//!   (default: `aichatflows-submissions` under the system temp dir)
//! - `UPLOADS_DIR` - Where uploaded files are written (default: uploads)
//! - `STATIC_DIR` - Static assets served under `/static` (default: crates/site/static)
//! - `ALLOWED_ORIGINS` - Comma-separated CORS origins (default: any)
//! - `ALLOWED_HOSTS` - Comma-separated `Host` header allow-list (default: any)
//!
//! ## Email
//! - `SMTP_SERVER` - SMTP relay hostname (default: smtp.gmail.com)
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `SMTP_USERNAME` / `SMTP_PASSWORD` - Relay credentials; email is disabled without both
//! - `ADMIN_EMAIL` - Receives submission and credential notifications
//! - `FROM_EMAIL` - Sender address (default: noreply@aichatflows.com)
//! - `SUPPORT_EMAIL` - Reply-to address shown to clients (default: `ADMIN_EMAIL`)
//!
//! ## Chat and checkout
//! - `LLM_API_KEY` - Anthropic API key; the chat widget answers with a demo reply without it
//! - `LLM_MODEL` - Model ID (default: claude-3-5-haiku-latest)
//! - `STRIPE_STARTER_URL` / `STRIPE_PRO_URL` - Checkout links returned after submission
//!
//! ## Error tracking
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use aichatflows_core::{Email, Plan};
use secrecy::SecretString;
use thiserror::Error;

use crate::services::store::FALLBACK_DIR_NAME;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default Anthropic model for the chat widget.
pub const DEFAULT_LLM_MODEL: &str = "claude-3-5-haiku-latest";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Site configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    /// Onboarding records directory
    pub submissions_dir: PathBuf,
    /// Where records go when `submissions_dir` cannot be written
    pub submissions_fallback_dir: PathBuf,
    /// Uploaded files directory
    pub uploads_dir: PathBuf,
    /// Static assets directory
    pub static_dir: PathBuf,
    /// CORS origins; empty allows any
    pub allowed_origins: Vec<String>,
    /// Accepted `Host` header values; empty allows any
    pub allowed_hosts: Vec<String>,
    /// Email configuration
    pub email: EmailConfig,
    /// LLM configuration (None serves demo replies)
    pub llm: Option<LlmConfig>,
    /// Checkout links per plan
    pub checkout: CheckoutConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// SMTP and notification address configuration.
///
/// Implements `Debug` manually to redact the SMTP password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP relay credentials; sending is disabled without them
    pub smtp_credentials: Option<SmtpCredentials>,
    /// Email sender address (From header)
    pub from_address: Email,
    /// Recipient of admin notifications and credential deliveries
    pub admin_address: Option<Email>,
    /// Contact address shown to clients
    pub support_address: Option<Email>,
}

/// SMTP username and password.
#[derive(Clone)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: SecretString,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field(
                "smtp_username",
                &self.smtp_credentials.as_ref().map(|c| c.username.as_str()),
            )
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("admin_address", &self.admin_address)
            .field("support_address", &self.support_address)
            .finish()
    }
}

/// Anthropic API configuration for the chat widget.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct LlmConfig {
    /// Anthropic API key
    pub api_key: SecretString,
    /// Model ID
    pub model: String,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

/// Stripe checkout links.
#[derive(Debug, Clone, Default)]
pub struct CheckoutConfig {
    pub starter_url: Option<String>,
    pub pro_url: Option<String>,
}

impl CheckoutConfig {
    /// The checkout link for `plan`, if configured.
    #[must_use]
    pub fn url_for(&self, plan: Plan) -> Option<&str> {
        match plan {
            Plan::Starter => self.starter_url.as_deref(),
            Plan::Pro => self.pro_url.as_deref(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed or if the LLM key
    /// fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "8000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let base_url = get_env_or_default("BASE_URL", "http://localhost:8000")
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("BASE_URL".to_string(), e.to_string()))?;

        let email = EmailConfig::from_env()?;
        let llm = LlmConfig::from_env()?;
        let checkout = CheckoutConfig {
            starter_url: get_optional_env("STRIPE_STARTER_URL"),
            pro_url: get_optional_env("STRIPE_PRO_URL"),
        };

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            host,
            port,
            base_url,
            submissions_dir: get_env_or_default("SUBMISSIONS_DIR", "submissions").into(),
            submissions_fallback_dir: get_optional_env("SUBMISSIONS_FALLBACK_DIR").map_or_else(
                || std::env::temp_dir().join(FALLBACK_DIR_NAME),
                PathBuf::from,
            ),
            uploads_dir: get_env_or_default("UPLOADS_DIR", "uploads").into(),
            static_dir: get_env_or_default("STATIC_DIR", "crates/site/static").into(),
            allowed_origins: split_list(get_optional_env("ALLOWED_ORIGINS").as_deref()),
            allowed_hosts: split_list(get_optional_env("ALLOWED_HOSTS").as_deref()),
            email,
            llm,
            checkout,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let smtp_port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        let smtp_credentials = match (
            get_optional_env("SMTP_USERNAME"),
            get_optional_env("SMTP_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some(SmtpCredentials {
                username,
                password: SecretString::from(password),
            }),
            _ => None,
        };

        let from_address = get_email("FROM_EMAIL")?
            .map_or_else(|| Email::parse("noreply@aichatflows.com"), Ok)
            .map_err(|e| ConfigError::InvalidEnvVar("FROM_EMAIL".to_string(), e.to_string()))?;
        let admin_address = get_email("ADMIN_EMAIL")?;
        let support_address = get_email("SUPPORT_EMAIL")?.or_else(|| admin_address.clone());

        Ok(Self {
            smtp_host: get_env_or_default("SMTP_SERVER", "smtp.gmail.com"),
            smtp_port,
            smtp_credentials,
            from_address,
            admin_address,
            support_address,
        })
    }
}

impl LlmConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        if get_optional_env("LLM_API_KEY").is_none() {
            return Ok(None);
        }
        Ok(Some(Self {
            api_key: get_validated_secret("LLM_API_KEY")?,
            model: get_env_or_default("LLM_MODEL", DEFAULT_LLM_MODEL),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get an optional environment variable holding an email address.
fn get_email(key: &str) -> Result<Option<Email>, ConfigError> {
    get_optional_env(key)
        .map(|v| Email::parse(&v))
        .transpose()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Split a comma-separated list, dropping blanks.
fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

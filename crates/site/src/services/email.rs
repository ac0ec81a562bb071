//! Email delivery and onboarding notifications.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and plain-text
//! templates. Handlers talk to [`NotificationDispatcher`], which renders
//! each message and hands it to a [`Mailer`].

use std::sync::Arc;

use aichatflows_core::{CredentialBundle, Email, Field, StoredSubmission, is_file_link};
use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Template name, for logging.
    pub template: &'static str,
    pub to: Email,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Delivers rendered messages.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one message.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError>;
}

/// SMTP mailer using a STARTTLS relay.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create a mailer from configuration.
    ///
    /// Returns `Ok(None)` when no SMTP credentials are configured.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be set up or the sender is unusable.
    pub fn from_config(config: &EmailConfig) -> Result<Option<Self>, EmailError> {
        let Some(smtp) = config.smtp_credentials.as_ref() else {
            return Ok(None);
        };

        let credentials = Credentials::new(
            smtp.username.clone(),
            smtp.password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        let from = format!("AIChatFlows <{}>", config.from_address)
            .parse()
            .map_err(|_| EmailError::InvalidAddress(config.from_address.to_string()))?;

        Ok(Some(Self { transport, from }))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let to: Mailbox = email
            .to
            .as_str()
            .parse()
            .map_err(|_| EmailError::InvalidAddress(email.to.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body.clone()),
                    ),
            )?;

        self.transport.send(message).await?;

        tracing::info!(to = %email.to, template = email.template, "Email sent successfully");
        Ok(())
    }
}

/// Mailer used when SMTP is not configured: logs and drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        tracing::info!(
            to = %email.to,
            template = email.template,
            "SMTP not configured, skipping email"
        );
        Ok(())
    }
}

// =============================================================================
// Templates
// =============================================================================

/// One labelled answer in the admin summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    pub label: &'static str,
    pub value: String,
}

/// An uploaded file linked from the admin summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLink {
    pub label: &'static str,
    pub url: String,
    pub filename: String,
    pub is_image: bool,
}

/// A credential line in the one-time delivery email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialLine<'a> {
    pub label: &'static str,
    pub value: &'a str,
}

#[derive(Template)]
#[template(path = "email/user_confirmation.html")]
struct UserConfirmationHtml<'a> {
    business_name: &'a str,
    plan: &'a str,
    support_email: Option<&'a str>,
    base_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/user_confirmation.txt")]
struct UserConfirmationText<'a> {
    business_name: &'a str,
    plan: &'a str,
    support_email: Option<&'a str>,
    base_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/admin_notification.html")]
struct AdminNotificationHtml<'a> {
    business_name: &'a str,
    request_id: String,
    submitted_at: String,
    rows: &'a [DetailRow],
    files: &'a [FileLink],
    credentials_handling: &'a str,
    credentials_provided: String,
}

#[derive(Template)]
#[template(path = "email/admin_notification.txt")]
struct AdminNotificationText<'a> {
    business_name: &'a str,
    request_id: String,
    submitted_at: String,
    rows: &'a [DetailRow],
    files: &'a [FileLink],
    credentials_handling: &'a str,
    credentials_provided: String,
}

#[derive(Template)]
#[template(path = "email/credentials.html")]
struct CredentialsHtml<'a> {
    business_name: &'a str,
    plan: &'a str,
    contact_email: &'a str,
    request_id: String,
    lines: &'a [CredentialLine<'a>],
}

#[derive(Template)]
#[template(path = "email/credentials.txt")]
struct CredentialsText<'a> {
    business_name: &'a str,
    plan: &'a str,
    contact_email: &'a str,
    request_id: String,
    lines: &'a [CredentialLine<'a>],
}

#[derive(Template)]
#[template(path = "email/payment_confirmation.html")]
struct PaymentConfirmationHtml<'a> {
    business_name: &'a str,
    plan: &'a str,
    support_email: Option<&'a str>,
    base_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/payment_confirmation.txt")]
struct PaymentConfirmationText<'a> {
    business_name: &'a str,
    plan: &'a str,
    support_email: Option<&'a str>,
    base_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/admin_payment.html")]
struct AdminPaymentHtml<'a> {
    business_name: &'a str,
    plan: &'a str,
    contact_email: &'a str,
    request_id: String,
}

#[derive(Template)]
#[template(path = "email/admin_payment.txt")]
struct AdminPaymentText<'a> {
    business_name: &'a str,
    plan: &'a str,
    contact_email: &'a str,
    request_id: String,
}

// =============================================================================
// Dispatcher
// =============================================================================

/// How many notifications for one event went out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Messages handed to the mailer successfully.
    pub sent: usize,
    /// Messages that failed to render or send.
    pub failed: usize,
    /// Messages skipped because no recipient is configured.
    pub skipped: usize,
}

impl DispatchReport {
    fn record(&mut self, outcome: Option<bool>) {
        match outcome {
            Some(true) => self.sent += 1,
            Some(false) => self.failed += 1,
            None => self.skipped += 1,
        }
    }
}

/// Composes and sends onboarding notifications.
///
/// Every send is independent: a failure is logged with the recipient and
/// template name and never propagates to the caller.
#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
    admin_address: Option<Email>,
    support_address: Option<Email>,
    base_url: String,
}

impl NotificationDispatcher {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(
        mailer: Arc<dyn Mailer>,
        admin_address: Option<Email>,
        support_address: Option<Email>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            mailer,
            admin_address,
            support_address,
            base_url: base_url.into(),
        }
    }

    /// Send the user confirmation, the admin summary and, when present, the
    /// one-time credential delivery. The three sends run concurrently.
    #[tracing::instrument(skip_all, fields(request_id = %record.request_id))]
    pub async fn submission_received(
        &self,
        record: &StoredSubmission,
        bundle: Option<&CredentialBundle>,
    ) -> DispatchReport {
        let user = self.deliver(Some(&record.details.contact_email), "user_confirmation", |to| {
            self.user_confirmation(to, record)
        });
        let admin = self.deliver(self.admin_address.as_ref(), "admin_notification", |to| {
            self.admin_notification(to, record)
        });
        let credentials = async {
            match bundle {
                Some(bundle) => {
                    self.deliver(self.admin_address.as_ref(), "credentials", |to| {
                        credential_delivery(to, bundle)
                    })
                    .await
                }
                None => None,
            }
        };

        let (user, admin, credentials) = tokio::join!(user, admin, credentials);

        let mut report = DispatchReport::default();
        report.record(user);
        report.record(admin);
        if bundle.is_some() {
            report.record(credentials);
        }
        report
    }

    /// Send the payment confirmation to the client and the admin.
    #[tracing::instrument(skip_all, fields(request_id = %record.request_id))]
    pub async fn payment_confirmed(&self, record: &StoredSubmission) -> DispatchReport {
        let user = self.deliver(
            Some(&record.details.contact_email),
            "payment_confirmation",
            |to| self.payment_confirmation(to, record),
        );
        let admin = self.deliver(self.admin_address.as_ref(), "admin_payment", |to| {
            admin_payment(to, record)
        });

        let (user, admin) = tokio::join!(user, admin);

        let mut report = DispatchReport::default();
        report.record(user);
        report.record(admin);
        report
    }

    /// Render and send one message. `None` when there is no recipient,
    /// otherwise whether delivery succeeded.
    async fn deliver(
        &self,
        to: Option<&Email>,
        template: &'static str,
        compose: impl FnOnce(&Email) -> Result<OutgoingEmail, EmailError>,
    ) -> Option<bool> {
        let Some(to) = to else {
            tracing::warn!(template, "No recipient configured, skipping email");
            return None;
        };

        let result = match compose(to) {
            Ok(email) => self.mailer.send(&email).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => Some(true),
            Err(e) => {
                tracing::warn!(recipient = %to, template, error = %e, "Failed to send notification");
                Some(false)
            }
        }
    }

    fn support_email(&self) -> Option<&str> {
        self.support_address.as_ref().map(Email::as_str)
    }

    fn user_confirmation(
        &self,
        to: &Email,
        record: &StoredSubmission,
    ) -> Result<OutgoingEmail, EmailError> {
        let details = &record.details;
        let plan = details.plan.as_str();
        let html = UserConfirmationHtml {
            business_name: &details.business_name,
            plan,
            support_email: self.support_email(),
            base_url: &self.base_url,
        }
        .render()?;
        let text = UserConfirmationText {
            business_name: &details.business_name,
            plan,
            support_email: self.support_email(),
            base_url: &self.base_url,
        }
        .render()?;

        Ok(OutgoingEmail {
            template: "user_confirmation",
            to: to.clone(),
            subject: "Welcome to AIChatFlows - Your Setup Has Begun".to_string(),
            text_body: text,
            html_body: html,
        })
    }

    fn admin_notification(
        &self,
        to: &Email,
        record: &StoredSubmission,
    ) -> Result<OutgoingEmail, EmailError> {
        let rows = detail_rows(record);
        let files = file_links(record, &self.base_url);
        let request_id = record.request_id.to_string();
        let submitted_at = record
            .details
            .submission_timestamp
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string();
        let credentials_provided = platform_list(record);
        let business_name = record.details.business_name.as_str();
        let credentials_handling = record.credentials_handling.as_str();

        let html = AdminNotificationHtml {
            business_name,
            request_id: request_id.clone(),
            submitted_at: submitted_at.clone(),
            rows: &rows,
            files: &files,
            credentials_handling,
            credentials_provided: credentials_provided.clone(),
        }
        .render()?;
        let text = AdminNotificationText {
            business_name,
            request_id,
            submitted_at,
            rows: &rows,
            files: &files,
            credentials_handling,
            credentials_provided,
        }
        .render()?;

        Ok(OutgoingEmail {
            template: "admin_notification",
            to: to.clone(),
            subject: format!("New Signup Submitted on AIChatFlows - {business_name}"),
            text_body: text,
            html_body: html,
        })
    }

    fn payment_confirmation(
        &self,
        to: &Email,
        record: &StoredSubmission,
    ) -> Result<OutgoingEmail, EmailError> {
        let details = &record.details;
        let plan = details.plan.as_str();
        let html = PaymentConfirmationHtml {
            business_name: &details.business_name,
            plan,
            support_email: self.support_email(),
            base_url: &self.base_url,
        }
        .render()?;
        let text = PaymentConfirmationText {
            business_name: &details.business_name,
            plan,
            support_email: self.support_email(),
            base_url: &self.base_url,
        }
        .render()?;

        Ok(OutgoingEmail {
            template: "payment_confirmation",
            to: to.clone(),
            subject: "You're all set - Welcome to AIChatFlows".to_string(),
            text_body: text,
            html_body: html,
        })
    }
}

fn credential_delivery(to: &Email, bundle: &CredentialBundle) -> Result<OutgoingEmail, EmailError> {
    let lines: Vec<CredentialLine<'_>> = bundle
        .entries
        .iter()
        .map(|e| CredentialLine {
            label: e.field.label(),
            value: &e.value,
        })
        .collect();
    let request_id = bundle.request_id.to_string();

    let html = CredentialsHtml {
        business_name: &bundle.business_name,
        plan: bundle.plan.as_str(),
        contact_email: bundle.contact_email.as_str(),
        request_id: request_id.clone(),
        lines: &lines,
    }
    .render()?;
    let text = CredentialsText {
        business_name: &bundle.business_name,
        plan: bundle.plan.as_str(),
        contact_email: bundle.contact_email.as_str(),
        request_id,
        lines: &lines,
    }
    .render()?;

    Ok(OutgoingEmail {
        template: "credentials",
        to: to.clone(),
        subject: format!("AIChatFlows - Login Credentials (Secure) - {}", bundle.business_name),
        text_body: text,
        html_body: html,
    })
}

fn admin_payment(to: &Email, record: &StoredSubmission) -> Result<OutgoingEmail, EmailError> {
    let details = &record.details;
    let html = AdminPaymentHtml {
        business_name: &details.business_name,
        plan: details.plan.as_str(),
        contact_email: details.contact_email.as_str(),
        request_id: record.request_id.to_string(),
    }
    .render()?;
    let text = AdminPaymentText {
        business_name: &details.business_name,
        plan: details.plan.as_str(),
        contact_email: details.contact_email.as_str(),
        request_id: record.request_id.to_string(),
    }
    .render()?;

    Ok(OutgoingEmail {
        template: "admin_payment",
        to: to.clone(),
        subject: format!(
            "New Client Submission + Payment Completed - {}",
            details.business_name
        ),
        text_body: text,
        html_body: html,
    })
}

/// Labelled answers for the admin summary, skipping uploads and blanks.
fn detail_rows(record: &StoredSubmission) -> Vec<DetailRow> {
    let d = &record.details;
    let yes_no = |b: bool| if b { "Yes" } else { "No" }.to_string();

    let rows: [(Field, Option<String>); 22] = [
        (Field::BusinessName, Some(d.business_name.clone())),
        (Field::InstagramHandle, Some(d.instagram_handle.clone())),
        (Field::OtherPlatforms, d.other_platforms.clone()),
        (Field::BusinessType, Some(d.business_type.clone())),
        (Field::OtherBusinessType, d.other_business_type.clone()),
        (
            Field::ProductServiceDescription,
            Some(d.product_service_description.clone()),
        ),
        (
            Field::CommonCustomerQuestion,
            Some(d.common_customer_question.clone()),
        ),
        (Field::DeliveryPickup, Some(d.delivery_pickup.to_string())),
        (Field::DeliveryServices, d.delivery_services.clone()),
        (Field::DeliveryOther, d.delivery_other.clone()),
        (Field::PickupMethod, d.pickup_method.clone()),
        (Field::PickupDetails, d.pickup_details.clone()),
        (Field::MenuText, d.menu_text.clone()),
        (Field::HasFaqs, Some(yes_no(d.has_faqs))),
        (Field::FaqContent, d.faq_content.clone()),
        (Field::Plan, Some(d.plan.to_string())),
        (Field::SubmissionMethod, Some(d.submission_method.to_string())),
        (Field::ConsentToShare, Some(yes_no(d.consent_to_share))),
        (Field::ConfirmAccurate, Some(yes_no(d.confirm_accurate))),
        (Field::ConsentAutomation, Some(yes_no(d.consent_automation))),
        (Field::ContactEmail, Some(d.contact_email.to_string())),
        (
            Field::SubmissionTimestamp,
            Some(d.submission_timestamp.to_rfc3339()),
        ),
    ];

    rows.into_iter()
        .filter_map(|(field, value)| {
            value.map(|value| DetailRow {
                label: field.label(),
                value,
            })
        })
        .collect()
}

/// Links to uploaded files, made absolute against `base_url`.
fn file_links(record: &StoredSubmission, base_url: &str) -> Vec<FileLink> {
    let d = &record.details;
    [
        (Field::MenuUpload, d.menu_upload.as_deref()),
        (Field::FaqUpload, d.faq_upload.as_deref()),
        (Field::AdditionalDocs, d.additional_docs.as_deref()),
    ]
    .into_iter()
    .filter_map(|(field, url)| {
        let url = url.filter(|url| is_file_link(url))?;
        let absolute = if url.starts_with('/') {
            format!("{base_url}{url}")
        } else {
            url.to_string()
        };
        let filename = url.rsplit('/').next().unwrap_or(url).to_string();
        let lower = url.to_ascii_lowercase();
        Some(FileLink {
            label: field.label(),
            url: absolute,
            filename,
            is_image: IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)),
        })
    })
    .collect()
}

fn platform_list(record: &StoredSubmission) -> String {
    if record.credentials_provided.is_empty() {
        return "None".to_string();
    }
    record
        .credentials_provided
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

//! Onboarding submission records.
//!
//! A validated [`OnboardingSubmission`] is split into the storage-safe
//! [`SubmissionDetails`] and the [`PlatformCredentials`] that must never be
//! persisted. [`StoredSubmission`] has no credential fields at all, so a
//! stored record cannot leak a password whatever path produced it.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::choice::{CredentialsHandling, DeliveryPickup, Plan, Platform, SubmissionMethod};
use super::email::Email;
use crate::schema::Field;

/// Every non-credential answer from the onboarding form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDetails {
    pub business_name: String,
    pub instagram_handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_platforms: Option<String>,
    pub business_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_business_type: Option<String>,
    pub product_service_description: String,
    pub common_customer_question: String,
    pub delivery_pickup: DeliveryPickup,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_services: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_other: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_upload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_docs: Option<String>,
    pub has_faqs: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faq_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faq_upload: Option<String>,
    pub plan: Plan,
    pub submission_method: SubmissionMethod,
    pub consent_to_share: bool,
    pub confirm_accurate: bool,
    pub consent_automation: bool,
    pub contact_email: Email,
    pub submission_timestamp: DateTime<Utc>,
}

/// One supplied platform login value.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialEntry {
    /// Which credential field the value came from.
    pub field: Field,
    /// The value exactly as supplied (trimmed).
    pub value: String,
}

impl fmt::Debug for CredentialEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialEntry")
            .field("field", &self.field)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Platform logins captured from the form, in form order.
///
/// Deliberately not `Serialize`: the only way out of the process is the
/// one-time credential email.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformCredentials {
    entries: Vec<CredentialEntry>,
}

impl PlatformCredentials {
    /// Record a credential value. Non-credential fields and empty values are ignored.
    pub fn insert(&mut self, field: Field, value: String) {
        if !field.is_credential() || value.is_empty() {
            return;
        }
        self.entries.retain(|e| e.field != field);
        self.entries.push(CredentialEntry { field, value });
        self.entries
            .sort_by_key(|e| Field::ALL.iter().position(|f| *f == e.field));
    }

    /// The value supplied for `field`, if any.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.value.as_str())
    }

    /// Whether no credential was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Supplied entries in form order.
    #[must_use]
    pub fn entries(&self) -> &[CredentialEntry] {
        &self.entries
    }

    /// Distinct platforms with at least one supplied value, in form order.
    #[must_use]
    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms = Vec::new();
        for platform in self.entries.iter().filter_map(|e| e.field.platform()) {
            if !platforms.contains(&platform) {
                platforms.push(platform);
            }
        }
        platforms
    }

    /// Consume into the entry list.
    #[must_use]
    pub fn into_entries(self) -> Vec<CredentialEntry> {
        self.entries
    }
}

/// A fully validated and sanitized onboarding form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingSubmission {
    pub details: SubmissionDetails,
    pub credentials: PlatformCredentials,
}

/// The record written to the submissions directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSubmission {
    pub request_id: Uuid,
    #[serde(flatten)]
    pub details: SubmissionDetails,
    pub credentials_handling: CredentialsHandling,
    /// Platforms for which a login was supplied; never the values themselves.
    #[serde(default)]
    pub credentials_provided: Vec<Platform>,
}

/// Logins to deliver once by email, then drop.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    pub request_id: Uuid,
    pub business_name: String,
    pub plan: Plan,
    pub contact_email: Email,
    pub entries: Vec<CredentialEntry>,
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("request_id", &self.request_id)
            .field("business_name", &self.business_name)
            .field("plan", &self.plan)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

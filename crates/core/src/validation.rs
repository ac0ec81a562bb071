//! Onboarding form validation.
//!
//! The form's conditional requirements are expressed as a flat list of
//! [`Rule`]s. Every rule is evaluated against the sanitized payload and all
//! failures are reported together, at most one per field.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::sanitize::sanitize_field;
use crate::schema::{Field, FieldKind};
use crate::types::{
    DeliveryPickup, Email, OnboardingSubmission, Plan, PlatformCredentials, SubmissionDetails,
    SubmissionMethod,
};

/// A failure attached to one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// JSON key of the offending field.
    pub field: &'static str,
    /// Human-readable explanation.
    pub message: String,
}

impl FieldError {
    /// Failure on `field` with a custom message.
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field: field.key(),
            message: message.into(),
        }
    }

    /// `"<Label> is required"`.
    #[must_use]
    pub fn required(field: Field) -> Self {
        Self::new(field, format!("{} is required", field.label()))
    }
}

/// Every rule the payload violated.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{} field(s) failed validation", .0.len())]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    /// The individual failures in rule order.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// The failure reported for `field`, if any.
    #[must_use]
    pub fn for_field(&self, field: Field) -> Option<&FieldError> {
        self.0.iter().find(|e| e.field == field.key())
    }
}

/// When a rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    /// The field's text equals the value, ignoring ASCII case.
    Equals(Field, &'static str),
    /// The boolean field is true.
    IsTrue(Field),
    OffersDelivery,
    OffersPickup,
    /// Logins are typed into the onboarding page.
    OnlineSetup,
    /// Online setup on the Pro plan.
    OnlineProSetup,
}

/// What a rule checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Required(Field),
    /// At least one of the fields must be present; the error goes on the first.
    RequiredAnyOf(&'static [Field], &'static str),
    /// Both fields present or both absent.
    Paired(Field, Field),
    /// When present, the value must be an email address.
    ValidEmail(Field),
    /// When present, the value must be one of the field's fixed choices.
    OneOf(Field),
    /// When present, the value must be a recognizable boolean.
    Boolean(Field),
    /// The boolean field must be true.
    Accepted(Field, &'static str),
    /// When present, the value must be an RFC 3339 timestamp.
    Timestamp(Field),
    /// When present, the value must pass [`is_file_link`].
    FileLink(Field),
}

/// A check and the condition under which it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub when: Condition,
    pub check: Check,
}

const fn always(check: Check) -> Rule {
    Rule {
        when: Condition::Always,
        check,
    }
}

const fn when(when: Condition, check: Check) -> Rule {
    Rule { when, check }
}

/// The onboarding form's rule set, in reporting order.
pub const RULES: &[Rule] = &[
    always(Check::Required(Field::BusinessName)),
    always(Check::Required(Field::InstagramHandle)),
    always(Check::Required(Field::BusinessType)),
    when(
        Condition::Equals(Field::BusinessType, "Other"),
        Check::Required(Field::OtherBusinessType),
    ),
    always(Check::Required(Field::ProductServiceDescription)),
    always(Check::Required(Field::CommonCustomerQuestion)),
    always(Check::Required(Field::DeliveryPickup)),
    always(Check::OneOf(Field::DeliveryPickup)),
    when(
        Condition::OffersDelivery,
        Check::RequiredAnyOf(
            &[Field::DeliveryServices, Field::DeliveryOther],
            "Delivery services are required when delivery is offered",
        ),
    ),
    when(Condition::OffersPickup, Check::Required(Field::PickupMethod)),
    always(Check::FileLink(Field::MenuUpload)),
    always(Check::FileLink(Field::AdditionalDocs)),
    always(Check::Boolean(Field::HasFaqs)),
    when(
        Condition::IsTrue(Field::HasFaqs),
        Check::RequiredAnyOf(
            &[Field::FaqContent, Field::FaqUpload],
            "FAQ content or an FAQ document is required when FAQs are selected",
        ),
    ),
    always(Check::FileLink(Field::FaqUpload)),
    always(Check::Required(Field::Plan)),
    always(Check::OneOf(Field::Plan)),
    always(Check::Required(Field::SubmissionMethod)),
    always(Check::OneOf(Field::SubmissionMethod)),
    when(Condition::OnlineSetup, Check::Required(Field::InstagramLogin)),
    when(Condition::OnlineSetup, Check::Required(Field::InstagramPassword)),
    when(Condition::OnlineProSetup, Check::Required(Field::FacebookLogin)),
    when(Condition::OnlineProSetup, Check::Required(Field::FacebookPassword)),
    when(
        Condition::OnlineSetup,
        Check::Paired(Field::TikTokLogin, Field::TikTokPassword),
    ),
    when(
        Condition::OnlineSetup,
        Check::Paired(Field::WhatsAppNumber, Field::WhatsAppPassword),
    ),
    always(Check::Accepted(
        Field::ConsentToShare,
        "You must consent to share information to proceed",
    )),
    always(Check::Boolean(Field::ConfirmAccurate)),
    always(Check::Boolean(Field::ConsentAutomation)),
    always(Check::Required(Field::ContactEmail)),
    always(Check::ValidEmail(Field::ContactEmail)),
    always(Check::Timestamp(Field::SubmissionTimestamp)),
];

/// Path prefix of files served back from the uploads directory.
pub const FILE_PATH_PREFIX: &str = "/api/files/";

/// Whether `url` may be rendered as a link: an uploaded file path on this
/// site or an absolute `http(s)` URL without whitespace.
#[must_use]
pub fn is_file_link(url: &str) -> bool {
    if url.is_empty() || url.chars().any(char::is_whitespace) {
        return false;
    }
    if url.starts_with(FILE_PATH_PREFIX) {
        return true;
    }
    let lower = url.to_ascii_lowercase();
    ["http://", "https://"]
        .iter()
        .any(|scheme| lower.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty()))
}

/// Validate a raw JSON payload from the onboarding form.
///
/// Text is sanitized before any rule runs, so whitespace-only or
/// markup-only input counts as missing. Unknown keys are ignored. A missing
/// timestamp defaults to `received_at`.
///
/// # Errors
///
/// Returns every violated rule as a [`ValidationErrors`].
pub fn validate_submission(
    payload: &Map<String, Value>,
    received_at: DateTime<Utc>,
) -> Result<OnboardingSubmission, ValidationErrors> {
    let values = FormValues::collect(payload);

    let mut errors: Vec<FieldError> = Vec::new();
    for rule in RULES {
        if !values.holds(rule.when) {
            continue;
        }
        if let Some(error) = values.check(rule.check)
            && !errors.iter().any(|e| e.field == error.field)
        {
            errors.push(error);
        }
    }

    if !errors.is_empty() {
        return Err(ValidationErrors(errors));
    }

    values.build(received_at)
}

/// Sanitized view of the payload.
struct FormValues {
    text: HashMap<Field, String>,
    flags: HashMap<Field, Option<bool>>,
}

impl FormValues {
    fn collect(payload: &Map<String, Value>) -> Self {
        let mut text = HashMap::new();
        let mut flags = HashMap::new();

        for &field in Field::ALL {
            let Some(value) = payload.get(field.key()) else {
                continue;
            };
            if field.kind() == FieldKind::Bool {
                flags.insert(field, parse_flag(value));
                continue;
            }
            if let Some(raw) = raw_text(value) {
                let cleaned = sanitize_field(field, &raw);
                if !cleaned.is_empty() {
                    text.insert(field, cleaned);
                }
            }
        }

        Self { text, flags }
    }

    fn text(&self, field: Field) -> Option<&str> {
        self.text.get(&field).map(String::as_str)
    }

    fn owned(&self, field: Field) -> Option<String> {
        self.text.get(&field).cloned()
    }

    /// Missing flags are false; unrecognizable ones are `None`.
    fn flag(&self, field: Field) -> Option<bool> {
        self.flags.get(&field).copied().unwrap_or(Some(false))
    }

    fn choice<T: FromStr>(&self, field: Field) -> Option<T> {
        self.text(field).and_then(|v| v.parse().ok())
    }

    fn holds(&self, condition: Condition) -> bool {
        match condition {
            Condition::Always => true,
            Condition::Equals(field, expected) => self
                .text(field)
                .is_some_and(|v| v.eq_ignore_ascii_case(expected)),
            Condition::IsTrue(field) => self.flag(field) == Some(true),
            Condition::OffersDelivery => self
                .choice::<DeliveryPickup>(Field::DeliveryPickup)
                .is_some_and(DeliveryPickup::offers_delivery),
            Condition::OffersPickup => self
                .choice::<DeliveryPickup>(Field::DeliveryPickup)
                .is_some_and(DeliveryPickup::offers_pickup),
            Condition::OnlineSetup => self.online(),
            Condition::OnlineProSetup => {
                self.online() && self.choice::<Plan>(Field::Plan).is_some_and(Plan::is_pro)
            }
        }
    }

    fn online(&self) -> bool {
        self.choice::<SubmissionMethod>(Field::SubmissionMethod)
            .is_some_and(SubmissionMethod::captures_credentials)
    }

    fn check(&self, check: Check) -> Option<FieldError> {
        match check {
            Check::Required(field) => self
                .text(field)
                .is_none()
                .then(|| FieldError::required(field)),
            Check::RequiredAnyOf(fields, message) => {
                let any = fields.iter().any(|f| self.text(*f).is_some());
                match fields.first() {
                    Some(first) if !any => Some(FieldError::new(*first, message)),
                    _ => None,
                }
            }
            Check::Paired(a, b) => match (self.text(a), self.text(b)) {
                (Some(_), None) => Some(FieldError::new(
                    b,
                    format!("{} is required when {} is provided", b.label(), a.label()),
                )),
                (None, Some(_)) => Some(FieldError::new(
                    a,
                    format!("{} is required when {} is provided", a.label(), b.label()),
                )),
                _ => None,
            },
            Check::ValidEmail(field) => {
                let value = self.text(field)?;
                Email::parse(value).is_err().then(|| {
                    FieldError::new(
                        field,
                        format!("{} must be a valid email address", field.label()),
                    )
                })
            }
            Check::OneOf(field) => {
                let value = self.text(field)?;
                let allowed = allowed_choices(field, value)?;
                Some(FieldError::new(
                    field,
                    format!("{} must be one of: {allowed}", field.label()),
                ))
            }
            Check::Boolean(field) => self.flag(field).is_none().then(|| {
                FieldError::new(field, format!("{} must be true or false", field.label()))
            }),
            Check::Accepted(field, message) => {
                (self.flag(field) != Some(true)).then(|| FieldError::new(field, message))
            }
            Check::Timestamp(field) => {
                let value = self.text(field)?;
                parse_timestamp(value).is_none().then(|| {
                    FieldError::new(
                        field,
                        format!("{} must be an RFC 3339 timestamp", field.label()),
                    )
                })
            }
            Check::FileLink(field) => {
                let value = self.text(field)?;
                (!is_file_link(value)).then(|| {
                    FieldError::new(
                        field,
                        format!("{} must be an uploaded file or an http(s) link", field.label()),
                    )
                })
            }
        }
    }

    fn build(&self, received_at: DateTime<Utc>) -> Result<OnboardingSubmission, ValidationErrors> {
        let missing = |field: Field| ValidationErrors(vec![FieldError::required(field)]);
        let required = |field: Field| self.owned(field).ok_or_else(|| missing(field));

        let contact_email = self
            .text(Field::ContactEmail)
            .and_then(|v| Email::parse(v).ok())
            .ok_or_else(|| missing(Field::ContactEmail))?;

        let submission_timestamp = self
            .text(Field::SubmissionTimestamp)
            .and_then(parse_timestamp)
            .unwrap_or(received_at);

        let details = SubmissionDetails {
            business_name: required(Field::BusinessName)?,
            instagram_handle: required(Field::InstagramHandle)?,
            other_platforms: self.owned(Field::OtherPlatforms),
            business_type: required(Field::BusinessType)?,
            other_business_type: self.owned(Field::OtherBusinessType),
            product_service_description: required(Field::ProductServiceDescription)?,
            common_customer_question: required(Field::CommonCustomerQuestion)?,
            delivery_pickup: self
                .choice(Field::DeliveryPickup)
                .ok_or_else(|| missing(Field::DeliveryPickup))?,
            delivery_services: self.owned(Field::DeliveryServices),
            delivery_other: self.owned(Field::DeliveryOther),
            pickup_method: self.owned(Field::PickupMethod),
            pickup_details: self.owned(Field::PickupDetails),
            menu_text: self.owned(Field::MenuText),
            menu_upload: self.owned(Field::MenuUpload),
            additional_docs: self.owned(Field::AdditionalDocs),
            has_faqs: self.flag(Field::HasFaqs) == Some(true),
            faq_content: self.owned(Field::FaqContent),
            faq_upload: self.owned(Field::FaqUpload),
            plan: self.choice(Field::Plan).ok_or_else(|| missing(Field::Plan))?,
            submission_method: self
                .choice(Field::SubmissionMethod)
                .ok_or_else(|| missing(Field::SubmissionMethod))?,
            consent_to_share: self.flag(Field::ConsentToShare) == Some(true),
            confirm_accurate: self.flag(Field::ConfirmAccurate) == Some(true),
            consent_automation: self.flag(Field::ConsentAutomation) == Some(true),
            contact_email,
            submission_timestamp,
        };

        let mut credentials = PlatformCredentials::default();
        for field in Field::credentials() {
            if let Some(value) = self.owned(field) {
                credentials.insert(field, value);
            }
        }

        Ok(OnboardingSubmission {
            details,
            credentials,
        })
    }
}

/// Allowed values for a choice field when `value` is not one of them.
fn allowed_choices(field: Field, value: &str) -> Option<String> {
    let valid = match field {
        Field::Plan => value.parse::<Plan>().map(drop),
        Field::SubmissionMethod => value.parse::<SubmissionMethod>().map(drop),
        Field::DeliveryPickup => value.parse::<DeliveryPickup>().map(drop),
        _ => return None,
    };
    valid.err().map(|e| e.allowed)
}

fn raw_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter(|v| !v.is_array() && !v.is_object())
                .filter_map(raw_text)
                .filter(|s| !s.trim().is_empty())
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Null => Some(false),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Some(true),
            "false" | "off" | "no" | "0" | "" => Some(false),
            _ => None,
        },
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

//! Typed schema of the onboarding form.
//!
//! Every key the onboarding page can submit is a [`Field`]. The validator,
//! sanitizer, credential router and notification views all read labels,
//! kinds, limits and credential status from here.

use crate::types::Platform;

/// How a field's raw value is interpreted and cleaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single-line free text.
    Text,
    /// Multi-line free text; line breaks are preserved.
    LongText,
    /// Contact email address.
    Email,
    /// Checkbox-style boolean.
    Bool,
    /// One of a fixed set of strings.
    Choice,
    /// Link to an uploaded file.
    Url,
    /// Login secret or identifier; trimmed and capped, never rewritten.
    Secret,
    /// RFC 3339 timestamp.
    Timestamp,
}

macro_rules! fields {
    ($($variant:ident => ($key:literal, $label:literal, $kind:ident, $max:expr)),+ $(,)?) => {
        /// A key of the onboarding form.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Field {
            $($variant,)+
        }

        impl Field {
            /// Every field, in form order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The JSON key submitted by the form.
            #[must_use]
            pub const fn key(self) -> &'static str {
                match self {
                    $(Self::$variant => $key,)+
                }
            }

            /// Human-readable label used in error messages and emails.
            #[must_use]
            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }

            /// How the raw value is interpreted.
            #[must_use]
            pub const fn kind(self) -> FieldKind {
                match self {
                    $(Self::$variant => FieldKind::$kind,)+
                }
            }

            /// Maximum length in characters after cleaning.
            #[must_use]
            pub const fn max_len(self) -> usize {
                match self {
                    $(Self::$variant => $max,)+
                }
            }
        }
    };
}

fields! {
    BusinessName => ("business_name", "Business name", Text, 200),
    InstagramHandle => ("instagram_handle", "Instagram handle", Text, 100),
    OtherPlatforms => ("other_platforms", "Other platforms", Text, 500),
    BusinessType => ("business_type", "Business type", Text, 100),
    OtherBusinessType => ("other_business_type", "Specified business type", Text, 100),
    ProductServiceDescription => ("product_service_description", "Product/service description", LongText, 2000),
    CommonCustomerQuestion => ("common_customer_question", "Common customer questions", LongText, 2000),
    DeliveryPickup => ("delivery_pickup", "Delivery or pickup", Choice, 20),
    DeliveryServices => ("delivery_services", "Delivery services", Text, 500),
    DeliveryOther => ("delivery_other", "Other delivery service", Text, 200),
    PickupMethod => ("pickup_method", "Pickup method", Text, 200),
    PickupDetails => ("pickup_details", "Pickup details", LongText, 1000),
    MenuText => ("menu_text", "Menu text", LongText, 5000),
    MenuUpload => ("menu_upload", "Uploaded menu", Url, 500),
    AdditionalDocs => ("additional_docs", "Additional documents", Url, 500),
    HasFaqs => ("has_faqs", "Has FAQs", Bool, 5),
    FaqContent => ("faq_content", "FAQ content", LongText, 5000),
    FaqUpload => ("faq_upload", "FAQ document", Url, 500),
    Plan => ("plan", "Plan", Choice, 20),
    SubmissionMethod => ("submission_method", "Submission method", Choice, 40),
    InstagramLogin => ("instagram_email", "Instagram login", Secret, 254),
    InstagramPassword => ("instagram_password", "Instagram password", Secret, 256),
    FacebookLogin => ("facebook_email", "Facebook login", Secret, 254),
    FacebookPassword => ("facebook_password", "Facebook password", Secret, 256),
    TikTokLogin => ("tiktok_email", "TikTok login", Secret, 254),
    TikTokPassword => ("tiktok_password", "TikTok password", Secret, 256),
    WhatsAppNumber => ("whatsapp_number", "WhatsApp number", Secret, 50),
    WhatsAppPassword => ("whatsapp_password", "WhatsApp password", Secret, 256),
    OtherPlatformCredentials => ("other_platform_credentials", "Other platform credentials", Secret, 1000),
    ConsentToShare => ("consent_to_share", "Consent to share", Bool, 5),
    ConfirmAccurate => ("confirm_accurate", "Confirm accurate", Bool, 5),
    ConsentAutomation => ("consent_automation", "Consent automation", Bool, 5),
    ContactEmail => ("contact_email", "Contact email", Email, 254),
    SubmissionTimestamp => ("submission_timestamp", "Submission time", Timestamp, 64),
}

impl Field {
    /// Look a field up by its JSON key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.key() == key)
    }

    /// Whether the field carries a platform login and must never be persisted.
    #[must_use]
    pub const fn is_credential(self) -> bool {
        matches!(self.kind(), FieldKind::Secret)
    }

    /// The platform a credential field belongs to.
    #[must_use]
    pub const fn platform(self) -> Option<Platform> {
        match self {
            Self::InstagramLogin | Self::InstagramPassword => Some(Platform::Instagram),
            Self::FacebookLogin | Self::FacebookPassword => Some(Platform::Facebook),
            Self::TikTokLogin | Self::TikTokPassword => Some(Platform::TikTok),
            Self::WhatsAppNumber | Self::WhatsAppPassword => Some(Platform::WhatsApp),
            Self::OtherPlatformCredentials => Some(Platform::Other),
            _ => None,
        }
    }

    /// Every credential field, in form order.
    pub fn credentials() -> impl Iterator<Item = Self> {
        Self::ALL.iter().copied().filter(|f| f.is_credential())
    }

    /// Whether the field holds free text that the sanitizer rewrites.
    #[must_use]
    pub const fn is_free_text(self) -> bool {
        matches!(
            self.kind(),
            FieldKind::Text | FieldKind::LongText | FieldKind::Url
        )
    }
}

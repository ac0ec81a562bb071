//! Credential routing.
//!
//! Splits a validated submission into the logins that are emailed once and
//! the record that is safe to persist.

use uuid::Uuid;

use crate::types::{CredentialBundle, OnboardingSubmission, StoredSubmission};

/// Output of [`route_credentials`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedSubmission {
    /// Logins to deliver by email, present only for online setup with at
    /// least one supplied value.
    pub bundle: Option<CredentialBundle>,
    /// Storage-safe record with no credential values.
    pub record: StoredSubmission,
}

/// Route a submission's credentials according to its submission method.
///
/// Logins typed into the page while another method was chosen are dropped.
#[must_use]
pub fn route_credentials(submission: OnboardingSubmission, request_id: Uuid) -> RoutedSubmission {
    let OnboardingSubmission {
        details,
        credentials,
    } = submission;

    let method = details.submission_method;
    let captured = method.captures_credentials() && !credentials.is_empty();

    let credentials_provided = if captured {
        credentials.platforms()
    } else {
        Vec::new()
    };

    let bundle = captured.then(|| CredentialBundle {
        request_id,
        business_name: details.business_name.clone(),
        plan: details.plan,
        contact_email: details.contact_email.clone(),
        entries: credentials.into_entries(),
    });

    RoutedSubmission {
        bundle,
        record: StoredSubmission {
            request_id,
            details,
            credentials_handling: method.credentials_handling(),
            credentials_provided,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use serde_json::{Value, json};

    use super::*;
    use crate::schema::Field;
    use crate::types::{CredentialsHandling, Platform};
    use crate::validation::validate_submission;

    fn submission(extra: Value) -> OnboardingSubmission {
        let mut payload = json!({
            "business_name": "Sunrise Coffee",
            "instagram_handle": "@sunrisecoffee",
            "business_type": "Cafe",
            "product_service_description": "Espresso drinks",
            "common_customer_question": "Are you open Sundays?",
            "delivery_pickup": "None",
            "plan": "Pro",
            "consent_to_share": true,
            "contact_email": "owner@sunrise.coffee",
            "instagram_email": "sunrise_ig",
            "instagram_password": "ig-secret-1",
            "facebook_email": "sunrise_fb",
            "facebook_password": "fb-secret-2"
        });
        if let (Value::Object(base), Value::Object(extra)) = (&mut payload, extra) {
            base.extend(extra);
        }
        let Value::Object(map) = payload else {
            panic!("payload must be an object");
        };
        validate_submission(&map, Utc::now()).unwrap()
    }

    #[test]
    fn test_online_setup_produces_bundle() {
        let id = Uuid::new_v4();
        let routed = route_credentials(
            submission(json!({"submission_method": "Submit through this page"})),
            id,
        );

        let bundle = routed.bundle.unwrap();
        assert_eq!(bundle.request_id, id);
        assert_eq!(bundle.entries.len(), 4);
        assert_eq!(bundle.entries[0].field, Field::InstagramLogin);

        assert_eq!(
            routed.record.credentials_handling,
            CredentialsHandling::SecureEmail
        );
        assert_eq!(
            routed.record.credentials_provided,
            vec![Platform::Instagram, Platform::Facebook]
        );
    }

    #[test]
    fn test_stored_record_never_contains_secrets() {
        let routed = route_credentials(
            submission(json!({"submission_method": "Submit through this page"})),
            Uuid::new_v4(),
        );
        let json = serde_json::to_string(&routed.record).unwrap();
        assert!(!json.contains("ig-secret-1"));
        assert!(!json.contains("fb-secret-2"));
        for field in Field::credentials() {
            assert!(!json.contains(&format!("\"{}\"", field.key())), "{field:?}");
        }
    }

    #[test]
    fn test_other_methods_drop_typed_logins() {
        let routed = route_credentials(
            submission(json!({"submission_method": "Use sendsecure.ly"})),
            Uuid::new_v4(),
        );
        assert!(routed.bundle.is_none());
        assert!(routed.record.credentials_provided.is_empty());
        assert_eq!(
            routed.record.credentials_handling.as_str(),
            "Client sharing via secure link"
        );

        let routed = route_credentials(
            submission(json!({"submission_method": "Request In-Person Setup"})),
            Uuid::new_v4(),
        );
        assert!(routed.bundle.is_none());
        assert_eq!(
            routed.record.credentials_handling.as_str(),
            "In-person setup requested"
        );
    }

    #[test]
    fn test_bundle_debug_is_redacted() {
        let routed = route_credentials(
            submission(json!({"submission_method": "Submit through this page"})),
            Uuid::new_v4(),
        );
        let debug = format!("{:?}", routed.bundle.unwrap());
        assert!(!debug.contains("ig-secret-1"));
        assert!(debug.contains("Sunrise Coffee"));
    }
}

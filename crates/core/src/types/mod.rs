//! Core types for AIChatFlows onboarding.
//!
//! This module provides type-safe wrappers for the values the onboarding
//! form collects and the records derived from it.

pub mod choice;
pub mod email;
pub mod submission;

pub use choice::{ChoiceError, CredentialsHandling, DeliveryPickup, Plan, Platform, SubmissionMethod};
pub use email::{Email, EmailError};
pub use submission::{
    CredentialBundle, CredentialEntry, OnboardingSubmission, PlatformCredentials,
    StoredSubmission, SubmissionDetails,
};

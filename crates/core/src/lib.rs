//! AIChatFlows Core - Onboarding types and rules.
//!
//! This crate provides the pure logic behind the onboarding site:
//! - the typed form schema and the values it accepts
//! - free-text sanitization
//! - conditional form validation
//! - credential routing (what is emailed once, what is stored)
//!
//! # Architecture
//!
//! The core crate contains only types and logic - no I/O, no HTTP clients,
//! no filesystem access. The `aichatflows-site` crate wires it to the web.
//!
//! # Modules
//!
//! - [`types`] - Email, form choices and submission records
//! - [`schema`] - Every form key with its label, kind and limit
//! - [`sanitize`] - Markup stripping and whitespace normalization
//! - [`validation`] - Declarative rule set producing field errors
//! - [`credentials`] - Split a submission into a credential bundle and a storage-safe record
//! - [`slug`] - Filesystem-safe names derived from business names

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod credentials;
pub mod sanitize;
pub mod schema;
pub mod slug;
pub mod types;
pub mod validation;

pub use credentials::{RoutedSubmission, route_credentials};
pub use schema::{Field, FieldKind};
pub use types::*;
pub use validation::{FieldError, ValidationErrors, is_file_link, validate_submission};

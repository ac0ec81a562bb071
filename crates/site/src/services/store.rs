//! File-backed submission storage.
//!
//! Each stored submission is one pretty-printed JSON file named
//! `<slug>_<timestamp>_<request id prefix>.json`. Files are only ever
//! created, never rewritten.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use aichatflows_core::StoredSubmission;
use aichatflows_core::slug::slugify;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Default fallback directory name under the system temp dir.
pub const FALLBACK_DIR_NAME: &str = "aichatflows-submissions";

/// Errors from the submission store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Append-only JSON store with a temp-dir fallback.
#[derive(Debug, Clone)]
pub struct SubmissionStore {
    primary: PathBuf,
    fallback: PathBuf,
}

impl SubmissionStore {
    /// Store rooted at `primary`, writing to `fallback` when `primary` fails.
    #[must_use]
    pub fn with_fallback(primary: impl Into<PathBuf>, fallback: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }

    /// The primary directory.
    #[must_use]
    pub fn primary_dir(&self) -> &Path {
        &self.primary
    }

    /// Write a record, trying the primary directory then the fallback.
    ///
    /// # Errors
    ///
    /// Returns the fallback's error when neither directory is writable.
    #[tracing::instrument(skip_all, fields(request_id = %record.request_id))]
    pub async fn save(&self, record: &StoredSubmission) -> Result<PathBuf, StoreError> {
        let body = serde_json::to_vec_pretty(record)?;
        let name = file_name(&record.details.business_name, Utc::now(), record.request_id);

        match write_new(&self.primary, &name, &body).await {
            Ok(path) => {
                tracing::info!(path = %path.display(), "Submission stored");
                return Ok(path);
            }
            Err(e) => {
                tracing::warn!(
                    dir = %self.primary.display(),
                    error = %e,
                    "Primary submissions directory unwritable, using fallback"
                );
            }
        }

        let path = write_new(&self.fallback, &name, &body).await?;
        tracing::info!(path = %path.display(), "Submission stored in fallback directory");
        Ok(path)
    }

    /// The most recently written record across both directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the newest file cannot be read or parsed.
    pub async fn latest(&self) -> Result<Option<StoredSubmission>, StoreError> {
        let mut newest: Option<(SystemTime, PathBuf)> = None;
        for dir in self.dirs() {
            for (modified, path) in list_json(dir).await {
                if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
                    newest = Some((modified, path));
                }
            }
        }

        match newest {
            Some((_, path)) => read_record(&path).await.map(Some),
            None => Ok(None),
        }
    }

    /// Look a record up by request id.
    ///
    /// # Errors
    ///
    /// Returns an error if the matching file cannot be read or parsed.
    pub async fn find(&self, request_id: Uuid) -> Result<Option<StoredSubmission>, StoreError> {
        let suffix = format!("_{}.json", short_id(request_id));
        for dir in self.dirs() {
            for (_, path) in list_json(dir).await {
                let matches = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(&suffix));
                if !matches {
                    continue;
                }
                let record = read_record(&path).await?;
                if record.request_id == request_id {
                    return Ok(Some(record));
                }
            }
        }
        Ok(None)
    }

    fn dirs(&self) -> [&Path; 2] {
        [&self.primary, &self.fallback]
    }
}

/// `<slug>_<YYYYMMDDTHHMMSS.ffffffZ>_<first 8 of id>.json`
fn file_name(business_name: &str, at: DateTime<Utc>, request_id: Uuid) -> String {
    format!(
        "{}_{}_{}.json",
        slugify(business_name),
        at.format("%Y%m%dT%H%M%S%.6fZ"),
        short_id(request_id)
    )
}

fn short_id(request_id: Uuid) -> String {
    request_id.simple().to_string().chars().take(8).collect()
}

async fn write_new(dir: &Path, name: &str, body: &[u8]) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(name);
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await?;
    file.write_all(body).await?;
    file.flush().await?;
    Ok(path)
}

/// JSON files in `dir` with their modification times. Missing dirs are empty.
async fn list_json(dir: &Path) -> Vec<(SystemTime, PathBuf)> {
    let mut found = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return found;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Ok(modified) = entry.metadata().await.and_then(|m| m.modified()) {
            found.push((modified, path));
        }
    }
    found
}

async fn read_record(path: &Path) -> Result<StoredSubmission, StoreError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aichatflows_core::{route_credentials, validate_submission};
    use serde_json::{Value, json};

    use super::*;

    fn record(name: &str) -> StoredSubmission {
        let payload = json!({
            "business_name": name,
            "instagram_handle": "@shop",
            "business_type": "Retail",
            "product_service_description": "Things",
            "common_customer_question": "Hours?",
            "delivery_pickup": "None",
            "plan": "Pro",
            "submission_method": "Submit through this page",
            "instagram_email": "shop_ig",
            "instagram_password": "ig-pass-123",
            "facebook_email": "shop_fb",
            "facebook_password": "fb-pass-456",
            "consent_to_share": true,
            "contact_email": "owner@shop.example"
        });
        let Value::Object(map) = payload else {
            panic!("payload must be an object");
        };
        route_credentials(validate_submission(&map, Utc::now()).unwrap(), Uuid::new_v4()).record
    }

    #[test]
    fn test_file_name_format() {
        let at = DateTime::parse_from_rfc3339("2025-03-04T05:06:07.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        let id = Uuid::parse_str("a1b2c3d4-0000-4000-8000-000000000000").unwrap();
        assert_eq!(
            file_name("Sunrise Coffee!", at, id),
            "sunrise-coffee_20250304T050607.123456Z_a1b2c3d4.json"
        );
    }

    #[tokio::test]
    async fn test_save_writes_pretty_json_without_passwords() {
        let dir = tempfile::tempdir().unwrap();
        let store = SubmissionStore::with_fallback(dir.path().join("subs"), dir.path().join("fb"));
        let record = record("Corner Shop");

        let path = store.save(&record).await.unwrap();
        assert!(path.starts_with(dir.path().join("subs")));

        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("\n  \"business_name\": \"Corner Shop\""));
        assert!(!body.contains("ig-pass-123"));
        assert!(!body.contains("fb-pass-456"));
        assert!(!body.contains("password"));
        assert!(body.contains("Sent via secure email"));
    }

    #[tokio::test]
    async fn test_save_falls_back_when_primary_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let store = SubmissionStore::with_fallback(&blocker, dir.path().join("fb"));

        let path = store.save(&record("Fallback Cafe")).await.unwrap();
        assert!(path.starts_with(dir.path().join("fb")));
    }

    #[tokio::test]
    async fn test_save_fails_when_both_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();
        let store = SubmissionStore::with_fallback(blocker.join("a"), blocker.join("b"));

        assert!(matches!(
            store.save(&record("Nowhere")).await,
            Err(StoreError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_latest_and_find() {
        let dir = tempfile::tempdir().unwrap();
        let store = SubmissionStore::with_fallback(dir.path().join("subs"), dir.path().join("fb"));
        assert!(store.latest().await.unwrap().is_none());

        let first = record("First");
        store.save(&first).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let second = record("Second");
        store.save(&second).await.unwrap();

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.request_id, second.request_id);

        let found = store.find(first.request_id).await.unwrap().unwrap();
        assert_eq!(found.details.business_name, "First");
        assert!(store.find(Uuid::new_v4()).await.unwrap().is_none());
    }
}

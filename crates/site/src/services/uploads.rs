//! Uploaded onboarding documents.
//!
//! Files live at `<root>/<business slug>/<kind>_<timestamp>_<id>.<ext>` and
//! are served back through `/api/files/{business}/{filename}`.

use std::path::{Path, PathBuf};

use aichatflows_core::slug::slugify;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Largest accepted upload in bytes.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Accepted extensions and the content types each may be sent with.
const ALLOWED: &[(&str, &[&str])] = &[
    ("pdf", &["application/pdf"]),
    ("jpg", &["image/jpeg"]),
    ("jpeg", &["image/jpeg"]),
    ("png", &["image/png"]),
    ("gif", &["image/gif"]),
    ("webp", &["image/webp"]),
    ("doc", &["application/msword"]),
    (
        "docx",
        &["application/vnd.openxmlformats-officedocument.wordprocessingml.document"],
    ),
    ("txt", &["text/plain"]),
];

/// Content type browsers send when they don't know better.
const GENERIC_CONTENT_TYPE: &str = "application/octet-stream";

/// Errors from the upload store.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file was uploaded")]
    Empty,

    #[error("File is larger than the 10 MB limit")]
    TooLarge,

    #[error("File type not allowed: {0}")]
    UnsupportedType(String),

    #[error("Content type {content_type} does not match .{extension} files")]
    ContentTypeMismatch {
        extension: String,
        content_type: String,
    },

    #[error("Unknown file_type: {0}")]
    InvalidKind(String),

    #[error("File not found")]
    NotFound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

aichatflows_core::define_choice!(UploadKind {
    Menu => "menu",
    Faq => "faq",
    AdditionalDocs => "additional_docs",
});

impl UploadKind {
    /// Parse the multipart `file_type` field.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidKind`] for anything else.
    pub fn parse(raw: &str) -> Result<Self, UploadError> {
        raw.trim()
            .parse()
            .map_err(|_| UploadError::InvalidKind(raw.trim().to_string()))
    }
}

/// A file accepted into the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredUpload {
    /// Site-relative URL that serves the file.
    pub file_url: String,
    /// Stored file name.
    pub filename: String,
    pub file_type: UploadKind,
    /// Size in bytes.
    pub size: usize,
}

/// A file read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Upload directory rooted at one path.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate and persist an uploaded file.
    ///
    /// # Errors
    ///
    /// Returns an error for empty, oversized or disallowed files, or if the
    /// file cannot be written.
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn save(
        &self,
        business_name: &str,
        kind: UploadKind,
        original_name: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<StoredUpload, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge);
        }

        let extension = extension_of(original_name)
            .ok_or_else(|| UploadError::UnsupportedType(original_name.to_string()))?;
        check_content_type(&extension, content_type)?;

        let business = slugify(business_name);
        let id: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
        let filename = format!(
            "{}_{}_{id}.{extension}",
            kind.as_str(),
            Utc::now().format("%Y%m%dT%H%M%S"),
        );

        let dir = self.root.join(&business);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&filename), bytes).await?;

        tracing::info!(business = %business, filename = %filename, "Upload stored");

        Ok(StoredUpload {
            file_url: format!("/api/files/{business}/{filename}"),
            filename,
            file_type: kind,
            size: bytes.len(),
        })
    }

    /// Read a stored file back.
    ///
    /// Both path components must look like names this store generates;
    /// anything else is reported as not found.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::NotFound`] for unknown or unsafe paths.
    pub async fn open(&self, business: &str, filename: &str) -> Result<UploadedFile, UploadError> {
        if !is_safe_component(business) || !is_safe_component(filename) {
            tracing::warn!(business, filename, "Rejected unsafe upload path");
            return Err(UploadError::NotFound);
        }
        let extension = extension_of(filename).ok_or(UploadError::NotFound)?;
        let content_type = content_type_for(&extension).ok_or(UploadError::NotFound)?;

        match tokio::fs::read(self.root.join(business).join(filename)).await {
            Ok(bytes) => Ok(UploadedFile {
                bytes,
                content_type,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(UploadError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

/// Lower-cased extension, if it is on the allow-list.
fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED.iter().any(|(e, _)| *e == ext).then_some(ext)
}

fn content_type_for(extension: &str) -> Option<&'static str> {
    ALLOWED
        .iter()
        .find(|(e, _)| *e == extension)
        .and_then(|(_, types)| types.first().copied())
}

fn check_content_type(extension: &str, content_type: Option<&str>) -> Result<(), UploadError> {
    let Some(raw) = content_type else {
        return Ok(());
    };
    let essence = raw
        .split(';')
        .next()
        .unwrap_or(raw)
        .trim()
        .to_ascii_lowercase();
    if essence.is_empty() || essence == GENERIC_CONTENT_TYPE {
        return Ok(());
    }

    let accepted = ALLOWED
        .iter()
        .find(|(e, _)| *e == extension)
        .is_some_and(|(_, types)| types.contains(&essence.as_str()));
    if accepted {
        Ok(())
    } else {
        Err(UploadError::ContentTypeMismatch {
            extension: extension.to_string(),
            content_type: essence,
        })
    }
}

/// ASCII alphanumerics, `-`, `_` and inner dots; no traversal.
fn is_safe_component(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 255
        && !s.starts_with('.')
        && !s.contains("..")
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

//! File upload and download handlers.
//!
//! POST /api/upload-file                      - multipart upload
//! GET  /api/files/{business}/{filename}      - serve an uploaded file

use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequestId;
use crate::services::uploads::{StoredUpload, UploadError, UploadKind};
use crate::state::AppState;

/// Upload response body.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(flatten)]
    pub upload: StoredUpload,
}

/// Accept one file for the onboarding form.
///
/// Multipart fields: `file`, `business_name`, `file_type`.
///
/// # Errors
///
/// Returns 400 for missing or disallowed files and 413 above the size cap.
#[instrument(skip_all, fields(request_id = %request_id))]
pub async fn upload_file(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut business_name = String::new();
    let mut kind: Option<String> = None;
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((name, content_type, bytes.to_vec()));
            }
            Some("business_name") => {
                business_name = field.text().await.map_err(multipart_error)?;
            }
            Some("file_type") => {
                kind = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let kind = UploadKind::parse(kind.as_deref().unwrap_or_default())?;
    let (name, content_type, bytes) = file.ok_or(UploadError::Empty)?;

    let upload = state
        .uploads()
        .save(&business_name, kind, &name, content_type.as_deref(), &bytes)
        .await
        .map_err(|e| match e {
            UploadError::Io(io) => AppError::internal(io.to_string(), Some(request_id)),
            other => other.into(),
        })?;

    Ok(Json(UploadResponse {
        success: true,
        upload,
    }))
}

/// Serve a previously uploaded file.
///
/// # Errors
///
/// Returns 404 for unknown files and for any path outside the upload root.
#[instrument(skip(state))]
pub async fn serve_file(
    State(state): State<AppState>,
    Path((business, filename)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let file = state.uploads().open(&business, &filename).await?;
    let disposition = if file.content_type.starts_with("image/") {
        "inline".to_string()
    } else {
        format!("attachment; filename=\"{filename}\"")
    };

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    ))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::Upload(UploadError::TooLarge)
    } else {
        AppError::BadRequest(err.body_text())
    }
}

use crate::error::ApiError;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const MAX_ID_DOCUMENT_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "pdf"];
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "application/pdf"];

/// Validates an identity-document upload and returns its normalized
/// extension. Size and type limits are part of the booking contract.
pub fn validate_id_document(
    file_name: &str,
    content_type: Option<&str>,
    len: usize,
) -> Result<String, ApiError> {
    if len == 0 {
        return Err(ApiError::bad_request("idDocument is empty"));
    }
    if len > MAX_ID_DOCUMENT_BYTES {
        return Err(ApiError::bad_request("idDocument exceeds the 5MB limit"));
    }

    let ext = Path::new(file_name.trim())
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ApiError::bad_request(
            "idDocument must be a jpeg, jpg, png or pdf file",
        ));
    }

    if let Some(ct) = content_type {
        // Strip any charset suffix before comparing.
        let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        if !mime.is_empty() && !ALLOWED_CONTENT_TYPES.contains(&mime.as_str()) {
            return Err(ApiError::bad_request(
                "idDocument must be a jpeg, jpg, png or pdf file",
            ));
        }
    }

    Ok(ext)
}

/// Writes a validated document under `upload_dir` with a uuid filename and
/// returns the stored path, which the booking records verbatim.
pub async fn store_id_document(
    upload_dir: &str,
    file_name: &str,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<String, ApiError> {
    let ext = validate_id_document(file_name, content_type, bytes.len())?;

    let dir = PathBuf::from(upload_dir);
    tokio::fs::create_dir_all(&dir).await.map_err(|e| {
        tracing::error!(error = %e, "upload dir creation failed");
        ApiError::internal("document storage failed")
    })?;

    let stored_name = format!("{}.{ext}", Uuid::new_v4().simple());
    let target = dir.join(&stored_name);
    tokio::fs::write(&target, bytes).await.map_err(|e| {
        tracing::error!(error = %e, "document write failed");
        ApiError::internal("document storage failed")
    })?;

    Ok(target.to_string_lossy().into_owned())
}

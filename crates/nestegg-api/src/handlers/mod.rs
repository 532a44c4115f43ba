pub mod blob_upload;
pub mod local_file;
pub mod local_upload;
pub mod upload_target;

use axum::http::{header, HeaderMap};
use nestegg_core::constants::{is_allowed_image_content_type, MAX_UPLOAD_BYTES};
use nestegg_core::AppError;

/// Lowercased `Content-Type` of an upload PUT, if it is an allowed image type.
pub(crate) fn upload_content_type(headers: &HeaderMap) -> Result<String, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_lowercase())
        .unwrap_or_default();

    if content_type.is_empty() || !is_allowed_image_content_type(&content_type) {
        return Err(AppError::UnsupportedMediaType(
            "Unsupported file type.".to_string(),
        ));
    }

    Ok(content_type)
}

pub(crate) fn check_upload_size(len: usize) -> Result<(), AppError> {
    if len as u64 > MAX_UPLOAD_BYTES {
        return Err(AppError::PayloadTooLarge("Image is too large.".to_string()));
    }
    Ok(())
}

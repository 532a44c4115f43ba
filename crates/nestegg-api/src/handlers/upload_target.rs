//! Upload-target issuance for goal cover images.

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, Json};
use nestegg_core::constants::{is_allowed_image_content_type, DEFAULT_CACHE_CONTROL, MAX_UPLOAD_BYTES};
use nestegg_core::AppError;
use nestegg_storage::{cover_image_key, CreateUploadTarget, UploadTarget};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTargetRequest {
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content_length: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct UploadTargetResponse {
    pub target: UploadTarget,
}

/// Validated content type (lowercased) and byte length.
fn validate_request(request: &UploadTargetRequest) -> Result<(String, u64), AppError> {
    let content_type = match request.content_type.as_deref() {
        Some(value) if !value.is_empty() => value.to_lowercase(),
        _ => {
            return Err(AppError::InvalidInput(
                "contentType is required.".to_string(),
            ))
        }
    };

    if !is_allowed_image_content_type(&content_type) {
        return Err(AppError::UnsupportedMediaType(
            "Unsupported image type.".to_string(),
        ));
    }

    let content_length = match request.content_length {
        Some(length) if length.is_finite() && length > 0.0 => length,
        _ => {
            return Err(AppError::InvalidInput(
                "contentLength must be provided.".to_string(),
            ))
        }
    };

    if content_length > MAX_UPLOAD_BYTES as f64 {
        return Err(AppError::PayloadTooLarge("Image is too large.".to_string()));
    }

    Ok((content_type, content_length.ceil() as u64))
}

/// Issue an upload target under a fresh `goals/covers/` key.
#[tracing::instrument(skip(state, request), fields(operation = "create_upload_target"))]
pub async fn create_upload_target(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<UploadTargetRequest>,
) -> Result<Json<UploadTargetResponse>, HttpAppError> {
    let (content_type, content_length) = validate_request(&request)?;

    let key = cover_image_key(&content_type)?;
    let input = CreateUploadTarget::new(key.into_string(), content_type)
        .with_content_length(content_length)
        .with_cache_control(DEFAULT_CACHE_CONTROL);

    let target = state
        .storage
        .adapter()
        .create_upload_target(&input)
        .await?;

    tracing::info!(
        provider = %target.provider,
        key = %target.key,
        content_length,
        "Issued upload target"
    );

    Ok(Json(UploadTargetResponse { target }))
}

//! Same-origin upload route for the local filesystem provider.

use crate::error::HttpAppError;
use crate::handlers::{check_upload_size, upload_content_type};
use crate::state::AppState;
use axum::{
    extract::{rejection::BytesRejection, Path, State},
    http::HeaderMap,
    Json,
};
use bytes::Bytes;
use nestegg_core::AppError;
use nestegg_storage::{StorageAdapter, StorageKey};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalUploadResponse {
    pub key: String,
    pub public_url: String,
}

#[tracing::instrument(skip(state, headers, body), fields(operation = "local_upload"))]
pub async fn put_local_upload(
    State(state): State<Arc<AppState>>,
    Path(raw_key): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<LocalUploadResponse>, HttpAppError> {
    let local = state.storage.local().ok_or_else(|| {
        AppError::BadRequest("Local storage provider is not enabled.".to_string())
    })?;

    let key = StorageKey::normalize(&raw_key)?;
    let content_type = upload_content_type(&headers)?;
    let body = body?;
    check_upload_size(body.len())?;

    let key = local.write_object(key.as_str(), &body).await?;
    let public_url = local.public_url(key.as_str())?;

    tracing::debug!(key = %key, content_type = %content_type, "Local upload stored");

    Ok(Json(LocalUploadResponse {
        key: key.into_string(),
        public_url,
    }))
}

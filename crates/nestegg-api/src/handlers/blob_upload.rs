//! Upload proxy for the blob provider. The browser PUTs here and the
//! server forwards the bytes with its read-write token.

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
use nestegg_storage::StorageKey;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct BlobUploadResponse {
    pub url: String,
}

#[tracing::instrument(skip(state, headers, body), fields(operation = "blob_upload"))]
pub async fn put_blob_upload(
    State(state): State<Arc<AppState>>,
    Path(raw_key): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<BlobUploadResponse>, HttpAppError> {
    let blob = state.storage.blob().ok_or_else(|| {
        AppError::BadRequest("Vercel Blob provider is not enabled.".to_string())
    })?;

    let key = StorageKey::normalize(&raw_key)?;
    let content_type = upload_content_type(&headers)?;
    let body = body?;
    check_upload_size(body.len())?;

    let object = blob.client().put(&key, body, &content_type).await?;

    Ok(Json(BlobUploadResponse { url: object.url }))
}

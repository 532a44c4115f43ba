//! Serves files written by the local provider.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use nestegg_core::constants::{content_type_for_key, DEFAULT_CACHE_CONTROL};
use nestegg_core::AppError;
use nestegg_storage::StorageKey;
use std::sync::Arc;

#[tracing::instrument(skip(state), fields(operation = "get_local_file"))]
pub async fn get_local_file(
    State(state): State<Arc<AppState>>,
    Path(raw_key): Path<String>,
) -> Result<Response, HttpAppError> {
    let local = state.storage.local().ok_or_else(|| {
        AppError::BadRequest("Local storage provider is not enabled.".to_string())
    })?;

    let key = StorageKey::normalize(&raw_key)?;
    let data = local.read_object(key.as_str()).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for_key(key.as_str()))
        .header(header::CACHE_CONTROL, DEFAULT_CACHE_CONTROL)
        .body(Body::from(data))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })?;

    Ok(response)
}

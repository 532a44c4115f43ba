//! Storage abstraction trait
//!
//! This module defines the StorageAdapter trait that all storage backends must
//! implement, along with the upload-target descriptor they hand out.

use crate::keys::StorageKey;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nestegg_core::StorageProvider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage key resolves outside local storage path: {0}")]
    PathEscape(String),

    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// How the client transfers bytes for an upload target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadKind {
    /// PUT straight to object storage with a presigned URL.
    PresignedPut,
    /// PUT to a same-origin route that forwards to the blob service.
    ProxyPut,
    /// PUT to a same-origin route that writes to the local filesystem.
    Local,
}

/// Request for permission to upload one object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUploadTarget {
    pub key: String,
    pub content_type: String,
    #[serde(default)]
    pub content_length: Option<u64>,
    #[serde(default)]
    pub cache_control: Option<String>,
}

impl CreateUploadTarget {
    pub fn new(key: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content_type: content_type.into(),
            content_length: None,
            cache_control: None,
        }
    }

    pub fn with_content_length(mut self, content_length: u64) -> Self {
        self.content_length = Some(content_length);
        self
    }

    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }

    /// Exact header set the upload PUT must carry.
    pub(crate) fn upload_headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), self.content_type.clone());
        if let Some(cache_control) = self.cache_control.as_deref().filter(|v| !v.is_empty()) {
            headers.insert("Cache-Control".to_string(), cache_control.to_string());
        }
        headers
    }
}

/// Short-lived descriptor authorizing a single direct upload.
///
/// Never persisted. `url` must not be used after `expires_at`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub provider: StorageProvider,
    pub kind: UploadKind,
    pub key: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub public_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Absolute expiry for a target issued now.
///
/// Fails with [`StorageError::InvalidConfiguration`] when the TTL does not fit
/// a timestamp.
pub(crate) fn expires_at(ttl: Duration) -> StorageResult<DateTime<Utc>> {
    i64::try_from(ttl.as_secs())
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .ok_or_else(|| {
            StorageError::InvalidConfiguration(format!(
                "Upload URL TTL of {} seconds is out of range",
                ttl.as_secs()
            ))
        })
}

pub(crate) fn storage_key_for(
    provider: StorageProvider,
    raw: &str,
) -> StorageResult<StorageKey> {
    StorageKey::normalize(raw).inspect_err(|e| {
        tracing::debug!(provider = %provider, key = %raw, error = %e, "Rejected storage key");
    })
}

/// Storage abstraction trait
///
/// All storage backends (local filesystem, S3, blob proxy) implement this
/// trait. The adapter is built once per process and shared behind an `Arc`;
/// implementations hold no mutable state.
///
/// Every method normalizes its raw key first, so callers may pass keys
/// straight from request input.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Which backend this adapter talks to
    fn provider(&self) -> StorageProvider;

    /// Lifetime of issued upload targets
    fn upload_url_ttl(&self) -> Duration;

    /// Issue an upload target for `input.key`.
    ///
    /// The returned headers always include `Content-Type`, and `Cache-Control`
    /// only when the input carries one.
    async fn create_upload_target(&self, input: &CreateUploadTarget)
        -> StorageResult<UploadTarget>;

    /// Public URL an object is served from once written
    fn public_url(&self, key: &str) -> StorageResult<String>;

    /// Delete an object. Deleting an absent object succeeds.
    async fn delete_object(&self, key: &str) -> StorageResult<()>;
}

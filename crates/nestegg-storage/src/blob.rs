//! Blob-proxy storage (Vercel Blob).
//!
//! Clients never see the read-write token: upload targets point at a
//! same-origin proxy route, and that route forwards the bytes through
//! [`BlobClient::put`].

use crate::keys::{encode_storage_key, join_url, StorageKey};
use crate::traits::{
    expires_at, storage_key_for, CreateUploadTarget, StorageAdapter, StorageError,
    StorageResult, UploadKind, UploadTarget,
};
use crate::StorageProvider;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_BLOB_API_URL: &str = "https://blob.vercel-storage.com";
pub const DEFAULT_BLOB_UPLOAD_URL_BASE: &str = "/api/storage/vercel-upload";
const BLOB_API_VERSION: &str = "7";

/// Object metadata returned by the blob service after a put.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobObject {
    pub url: String,
    pub pathname: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// HTTP client for the blob service API. Holds the read-write token.
#[derive(Clone)]
pub struct BlobClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl fmt::Debug for BlobClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobClient")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl BlobClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Store `data` publicly under `key` (no random suffix).
    pub async fn put(
        &self,
        key: &StorageKey,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<BlobObject> {
        let start = std::time::Instant::now();
        let size = data.len();
        let url = format!("{}/{}", self.api_url, encode_storage_key(key));

        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.token)
            .header("x-api-version", BLOB_API_VERSION)
            .header("x-content-type", content_type)
            .header("x-add-random-suffix", "0")
            .body(data)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, key = %key, "Blob upload request failed");
                StorageError::BackendError(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                key = %key,
                size_bytes = size,
                "Blob upload rejected"
            );
            return Err(StorageError::BackendError(format!(
                "Blob upload failed with status {}: {}",
                status, body
            )));
        }

        let object: BlobObject = response
            .json()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        tracing::info!(
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Blob upload successful"
        );

        Ok(object)
    }

    /// Delete a blob by URL or pathname. A 404 from the service counts as success.
    pub async fn delete(&self, target: &str) -> StorageResult<()> {
        let response = self
            .http
            .post(format!("{}/delete", self.api_url))
            .bearer_auth(&self.token)
            .header("x-api-version", BLOB_API_VERSION)
            .json(&serde_json::json!({ "urls": [target] }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, target = %target, "Blob delete request failed");
                StorageError::BackendError(e.to_string())
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(target = %target, "Blob delete of absent object");
            return Ok(());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, target = %target, "Blob delete rejected");
            return Err(StorageError::BackendError(format!(
                "Blob delete failed with status {}: {}",
                status, body
            )));
        }

        tracing::info!(target = %target, "Blob delete successful");
        Ok(())
    }
}

/// Settings for [`BlobStorage`].
#[derive(Clone)]
pub struct BlobOptions {
    pub read_write_token: String,
    /// Required for computing public URLs
    pub public_url_base: Option<String>,
    pub upload_url_base: String,
    pub api_url: String,
    pub upload_url_ttl: Duration,
}

/// Blob storage implementation
#[derive(Clone, Debug)]
pub struct BlobStorage {
    client: BlobClient,
    public_url_base: Option<String>,
    upload_url_base: String,
    upload_url_ttl: Duration,
}

impl BlobStorage {
    pub fn new(options: BlobOptions) -> StorageResult<Self> {
        if options.read_write_token.is_empty() {
            return Err(StorageError::MissingConfiguration(
                "BLOB_READ_WRITE_TOKEN".to_string(),
            ));
        }

        Ok(BlobStorage {
            client: BlobClient::new(options.api_url, options.read_write_token),
            public_url_base: options.public_url_base,
            upload_url_base: options.upload_url_base,
            upload_url_ttl: options.upload_url_ttl,
        })
    }

    /// Client used by the proxy upload route
    pub fn client(&self) -> &BlobClient {
        &self.client
    }

    fn require_public_url_base(&self) -> StorageResult<&str> {
        self.public_url_base.as_deref().ok_or_else(|| {
            StorageError::MissingConfiguration(
                "BLOB_PUBLIC_URL_BASE is required to compute public blob URLs".to_string(),
            )
        })
    }
}

#[async_trait]
impl StorageAdapter for BlobStorage {
    fn provider(&self) -> StorageProvider {
        StorageProvider::Vercel
    }

    fn upload_url_ttl(&self) -> Duration {
        self.upload_url_ttl
    }

    async fn create_upload_target(
        &self,
        input: &CreateUploadTarget,
    ) -> StorageResult<UploadTarget> {
        let key = storage_key_for(StorageProvider::Vercel, &input.key)?;
        let public_url_base = self.require_public_url_base()?;

        Ok(UploadTarget {
            provider: StorageProvider::Vercel,
            kind: UploadKind::ProxyPut,
            url: join_url(&self.upload_url_base, &key),
            headers: input.upload_headers(),
            public_url: join_url(public_url_base, &key),
            expires_at: expires_at(self.upload_url_ttl)?,
            key: key.into_string(),
        })
    }

    fn public_url(&self, key: &str) -> StorageResult<String> {
        let key = storage_key_for(StorageProvider::Vercel, key)?;
        Ok(join_url(self.require_public_url_base()?, &key))
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let key = storage_key_for(StorageProvider::Vercel, key)?;
        let target = match self.public_url_base.as_deref() {
            Some(base) => join_url(base, &key),
            None => key.into_string(),
        };
        self.client.delete(&target).await
    }
}

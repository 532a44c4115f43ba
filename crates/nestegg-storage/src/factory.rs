#[cfg(feature = "storage-vercel")]
use crate::blob::{BlobOptions, BlobStorage, DEFAULT_BLOB_API_URL, DEFAULT_BLOB_UPLOAD_URL_BASE};
#[cfg(feature = "storage-local")]
use crate::local::{
    LocalStorage, DEFAULT_LOCAL_PUBLIC_URL_BASE, DEFAULT_LOCAL_STORAGE_PATH,
    DEFAULT_LOCAL_UPLOAD_URL_BASE,
};
#[cfg(feature = "storage-s3")]
use crate::s3::{S3Options, S3Storage};
use crate::{StorageAdapter, StorageError, StorageProvider, StorageResult};
use nestegg_core::config::{parse_flag, StorageSettings};
use nestegg_core::Config;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_UPLOAD_URL_TTL_SECONDS: u64 = 600;
/// SigV4 presigned URLs cannot outlive seven days.
const MAX_UPLOAD_URL_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// The configured storage adapter, plus typed handles for the backends whose
/// same-origin routes need more than the [`StorageAdapter`] surface.
///
/// Built once at startup and shared through application state.
#[derive(Clone)]
pub struct StorageRegistry {
    adapter: Arc<dyn StorageAdapter>,
    #[cfg(feature = "storage-local")]
    local: Option<Arc<LocalStorage>>,
    #[cfg(feature = "storage-vercel")]
    blob: Option<Arc<BlobStorage>>,
}

impl StorageRegistry {
    /// Create the storage backend selected by `STORAGE_PROVIDER` (default s3)
    pub async fn from_config(config: &Config) -> StorageResult<Self> {
        let settings = config.storage();
        let provider = parse_provider(settings.provider.as_deref())?;
        let upload_url_ttl = parse_ttl(settings.upload_url_ttl_seconds.as_deref())?;

        let registry = match provider {
            #[cfg(feature = "storage-s3")]
            StorageProvider::S3 => {
                let storage = S3Storage::new(s3_options(settings, upload_url_ttl)?)?;
                Self::with_adapter(Arc::new(storage))
            }

            #[cfg(not(feature = "storage-s3"))]
            StorageProvider::S3 => {
                return Err(StorageError::InvalidConfiguration(
                    "S3 storage backend not available (storage-s3 feature not enabled)"
                        .to_string(),
                ))
            }

            #[cfg(feature = "storage-vercel")]
            StorageProvider::Vercel => {
                let storage = Arc::new(BlobStorage::new(blob_options(settings, upload_url_ttl)?)?);
                let mut registry = Self::with_adapter(storage.clone());
                registry.blob = Some(storage);
                registry
            }

            #[cfg(not(feature = "storage-vercel"))]
            StorageProvider::Vercel => {
                return Err(StorageError::InvalidConfiguration(
                    "Blob storage backend not available (storage-vercel feature not enabled)"
                        .to_string(),
                ))
            }

            #[cfg(feature = "storage-local")]
            StorageProvider::Local => {
                let storage = Arc::new(
                    LocalStorage::new(
                        settings
                            .local_storage_path
                            .as_deref()
                            .unwrap_or(DEFAULT_LOCAL_STORAGE_PATH),
                        settings
                            .local_storage_public_url_base
                            .clone()
                            .unwrap_or_else(|| DEFAULT_LOCAL_PUBLIC_URL_BASE.to_string()),
                        settings
                            .local_storage_upload_url_base
                            .clone()
                            .unwrap_or_else(|| DEFAULT_LOCAL_UPLOAD_URL_BASE.to_string()),
                        upload_url_ttl,
                    )
                    .await?,
                );
                let mut registry = Self::with_adapter(storage.clone());
                registry.local = Some(storage);
                registry
            }

            #[cfg(not(feature = "storage-local"))]
            StorageProvider::Local => {
                return Err(StorageError::InvalidConfiguration(
                    "Local storage backend not available (storage-local feature not enabled)"
                        .to_string(),
                ))
            }
        };

        tracing::info!(
            provider = %provider,
            upload_url_ttl_seconds = upload_url_ttl.as_secs(),
            "Storage adapter initialized"
        );

        Ok(registry)
    }

    /// Wrap an already-built adapter. Backend-specific handles stay empty.
    pub fn with_adapter(adapter: Arc<dyn StorageAdapter>) -> Self {
        StorageRegistry {
            adapter,
            #[cfg(feature = "storage-local")]
            local: None,
            #[cfg(feature = "storage-vercel")]
            blob: None,
        }
    }

    pub fn adapter(&self) -> &Arc<dyn StorageAdapter> {
        &self.adapter
    }

    pub fn provider(&self) -> StorageProvider {
        self.adapter.provider()
    }

    /// Local backend, when it is the configured provider
    #[cfg(feature = "storage-local")]
    pub fn local(&self) -> Option<&Arc<LocalStorage>> {
        self.local.as_ref()
    }

    /// Blob backend, when it is the configured provider
    #[cfg(feature = "storage-vercel")]
    pub fn blob(&self) -> Option<&Arc<BlobStorage>> {
        self.blob.as_ref()
    }
}

fn parse_provider(value: Option<&str>) -> StorageResult<StorageProvider> {
    match value {
        None => Ok(StorageProvider::default()),
        Some(raw) => raw.parse().map_err(|_| {
            StorageError::InvalidConfiguration(format!(
                "Unsupported STORAGE_PROVIDER \"{}\". Expected one of: s3, vercel, local",
                raw
            ))
        }),
    }
}

fn parse_ttl(value: Option<&str>) -> StorageResult<Duration> {
    let Some(raw) = value else {
        return Ok(Duration::from_secs(DEFAULT_UPLOAD_URL_TTL_SECONDS));
    };

    match raw.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 && seconds <= MAX_UPLOAD_URL_TTL_SECONDS => {
            Ok(Duration::from_secs(seconds))
        }
        _ => Err(StorageError::InvalidConfiguration(format!(
            "STORAGE_UPLOAD_URL_TTL_SECONDS must be a positive integer no greater than {}, got \"{}\"",
            MAX_UPLOAD_URL_TTL_SECONDS, raw
        ))),
    }
}

fn required(value: &Option<String>, name: &str) -> StorageResult<String> {
    value
        .clone()
        .ok_or_else(|| StorageError::MissingConfiguration(name.to_string()))
}

#[cfg(feature = "storage-s3")]
fn s3_options(settings: &StorageSettings, upload_url_ttl: Duration) -> StorageResult<S3Options> {
    Ok(S3Options {
        region: required(&settings.s3_region, "S3_REGION")?,
        bucket: required(&settings.s3_bucket, "S3_BUCKET")?,
        endpoint: settings.s3_endpoint.clone(),
        access_key_id: settings.s3_access_key_id.clone(),
        secret_access_key: settings.s3_secret_access_key.clone(),
        public_url_base: settings.s3_public_url_base.clone(),
        force_path_style: parse_flag(settings.s3_force_path_style.as_deref()),
        upload_url_ttl,
    })
}

#[cfg(feature = "storage-vercel")]
fn blob_options(
    settings: &StorageSettings,
    upload_url_ttl: Duration,
) -> StorageResult<BlobOptions> {
    Ok(BlobOptions {
        read_write_token: required(&settings.blob_read_write_token, "BLOB_READ_WRITE_TOKEN")?,
        public_url_base: settings.blob_public_url_base.clone(),
        upload_url_base: settings
            .blob_upload_url_base
            .clone()
            .unwrap_or_else(|| DEFAULT_BLOB_UPLOAD_URL_BASE.to_string()),
        api_url: settings
            .blob_api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BLOB_API_URL.to_string()),
        upload_url_ttl,
    })
}

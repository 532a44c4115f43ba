use crate::keys::{join_url, StorageKey};
use crate::traits::{
    expires_at, storage_key_for, CreateUploadTarget, StorageAdapter, StorageError,
    StorageResult, UploadKind, UploadTarget,
};
use crate::StorageProvider;
use async_trait::async_trait;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, Result as ObjectResult};
use std::time::Duration;

/// Settings for [`S3Storage`].
#[derive(Clone)]
pub struct S3Options {
    pub region: String,
    pub bucket: String,
    /// Custom endpoint for S3-compatible providers
    /// (e.g. "http://localhost:9000" for MinIO)
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Overrides the computed public base URL
    pub public_url_base: Option<String>,
    pub force_path_style: bool,
    pub upload_url_ttl: Duration,
}

/// S3 storage implementation
///
/// Upload targets are presigned PUT URLs, so bytes go straight from the
/// client to the bucket. Credentials stay inside the object store client.
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    public_url_base: String,
    upload_url_ttl: Duration,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// Without an explicit key pair, credentials come from the ambient AWS
    /// environment (env vars, instance role). Fails with
    /// [`StorageError::MissingConfiguration`] when only half of the key pair
    /// is given.
    pub fn new(options: S3Options) -> StorageResult<Self> {
        if options.region.is_empty() {
            return Err(StorageError::MissingConfiguration("S3_REGION".to_string()));
        }
        if options.bucket.is_empty() {
            return Err(StorageError::MissingConfiguration("S3_BUCKET".to_string()));
        }

        let mut builder = AmazonS3Builder::from_env()
            .with_region(options.region.clone())
            .with_bucket_name(options.bucket.clone())
            .with_virtual_hosted_style_request(
                !options.force_path_style && options.endpoint.is_none(),
            );

        if let Some(ref endpoint) = options.endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        match (&options.access_key_id, &options.secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => {
                builder = builder
                    .with_access_key_id(access_key_id.clone())
                    .with_secret_access_key(secret_access_key.clone());
            }
            (Some(_), None) => {
                return Err(StorageError::MissingConfiguration(
                    "S3_SECRET_ACCESS_KEY (S3_ACCESS_KEY_ID and S3_SECRET_ACCESS_KEY must be set together)"
                        .to_string(),
                ))
            }
            (None, Some(_)) => {
                return Err(StorageError::MissingConfiguration(
                    "S3_ACCESS_KEY_ID (S3_ACCESS_KEY_ID and S3_SECRET_ACCESS_KEY must be set together)"
                        .to_string(),
                ))
            }
            (None, None) => {}
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::InvalidConfiguration(e.to_string()))?;

        let public_url_base = public_url_base(&options);

        Ok(S3Storage {
            store,
            bucket: options.bucket,
            public_url_base,
            upload_url_ttl: options.upload_url_ttl,
        })
    }

    pub fn public_url_base(&self) -> &str {
        &self.public_url_base
    }
}

/// Normalize `raw` and map it to its object location.
///
/// The object store escapes characters such as `#`, `%` or `?` inside path
/// segments, which would make the stored object differ from the one the
/// public URL names. Such keys are rejected instead.
fn object_key(raw: &str) -> StorageResult<(StorageKey, Path)> {
    let key = storage_key_for(StorageProvider::S3, raw)?;
    let location = Path::from(key.as_str());
    if location.as_ref() != key.as_str() {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains characters not supported by object storage: {}",
            key
        )));
    }
    Ok((key, location))
}

/// Public base URL for objects in the bucket.
///
/// An explicit override wins. With a custom endpoint the path-style
/// `{endpoint}/{bucket}` is used; otherwise the AWS virtual-hosted URL
/// `https://{bucket}.s3.{region}.amazonaws.com`.
fn public_url_base(options: &S3Options) -> String {
    if let Some(ref base) = options.public_url_base {
        return base.clone();
    }

    if let Some(ref endpoint) = options.endpoint {
        return format!("{}/{}", endpoint.trim_end_matches('/'), options.bucket);
    }

    format!(
        "https://{}.s3.{}.amazonaws.com",
        options.bucket, options.region
    )
}

#[async_trait]
impl StorageAdapter for S3Storage {
    fn provider(&self) -> StorageProvider {
        StorageProvider::S3
    }

    fn upload_url_ttl(&self) -> Duration {
        self.upload_url_ttl
    }

    async fn create_upload_target(
        &self,
        input: &CreateUploadTarget,
    ) -> StorageResult<UploadTarget> {
        let (key, location) = object_key(&input.key)?;
        let expires_at = expires_at(self.upload_url_ttl)?;

        let url_result: ObjectResult<_> = self
            .store
            .signed_url(Method::PUT, &location, self.upload_url_ttl)
            .await;

        let url = url_result
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "S3 presign failed"
                );
                StorageError::BackendError(e.to_string())
            })?
            .to_string();

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            expires_in_seconds = self.upload_url_ttl.as_secs(),
            "Generated presigned PUT URL"
        );

        Ok(UploadTarget {
            provider: StorageProvider::S3,
            kind: UploadKind::PresignedPut,
            url,
            headers: input.upload_headers(),
            public_url: join_url(&self.public_url_base, &key),
            expires_at,
            key: key.into_string(),
        })
    }

    fn public_url(&self, key: &str) -> StorageResult<String> {
        let (key, _) = object_key(key)?;
        Ok(join_url(&self.public_url_base, &key))
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let (key, location) = object_key(key)?;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(()) => {}
            Err(ObjectStoreError::NotFound { .. }) => {
                tracing::debug!(bucket = %self.bucket, key = %key, "S3 delete of absent object");
                return Ok(());
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::BackendError(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }
}

#[cfg(all(test, feature = "storage-s3"))]
mod tests {
    use super::*;
    use chrono::Utc;
    use percent_encoding::percent_decode_str;

    /// Decoded URL path, without scheme, host or query.
    fn decoded_path(url: &str) -> String {
        let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
        let path = without_scheme
            .find('/')
            .map_or("", |idx| &without_scheme[idx..]);
        let path = path.split('?').next().unwrap_or_default();
        percent_decode_str(path).decode_utf8().unwrap().into_owned()
    }

    fn options() -> S3Options {
        S3Options {
            region: "us-east-1".to_string(),
            bucket: "nestegg-test".to_string(),
            endpoint: None,
            access_key_id: Some("AKIDEXAMPLE".to_string()),
            secret_access_key: Some("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string()),
            public_url_base: None,
            force_path_style: false,
            upload_url_ttl: Duration::from_secs(600),
        }
    }

    #[test]
    fn test_public_url_defaults_to_virtual_hosted() {
        let storage = S3Storage::new(options()).unwrap();
        assert_eq!(
            storage.public_url("goals/covers/my file.png").unwrap(),
            "https://nestegg-test.s3.us-east-1.amazonaws.com/goals/covers/my%20file.png"
        );
    }

    #[test]
    fn test_public_url_with_endpoint() {
        let storage = S3Storage::new(S3Options {
            endpoint: Some("http://localhost:9000/".to_string()),
            force_path_style: true,
            ..options()
        })
        .unwrap();
        assert_eq!(storage.public_url_base(), "http://localhost:9000/nestegg-test");
        assert_eq!(
            storage.public_url("/a.png").unwrap(),
            "http://localhost:9000/nestegg-test/a.png"
        );
    }

    #[test]
    fn test_public_url_override_wins() {
        let storage = S3Storage::new(S3Options {
            endpoint: Some("http://localhost:9000".to_string()),
            public_url_base: Some("https://cdn.example.com/".to_string()),
            ..options()
        })
        .unwrap();
        assert_eq!(
            storage.public_url("a.png").unwrap(),
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn test_half_credential_pair_rejected() {
        let result = S3Storage::new(S3Options {
            secret_access_key: None,
            ..options()
        });
        assert!(matches!(
            result,
            Err(StorageError::MissingConfiguration(ref msg)) if msg.contains("S3_SECRET_ACCESS_KEY")
        ));

        let result = S3Storage::new(S3Options {
            access_key_id: None,
            ..options()
        });
        assert!(matches!(
            result,
            Err(StorageError::MissingConfiguration(ref msg)) if msg.contains("S3_ACCESS_KEY_ID")
        ));
    }

    #[test]
    fn test_missing_bucket_rejected() {
        let result = S3Storage::new(S3Options {
            bucket: String::new(),
            ..options()
        });
        assert!(matches!(result, Err(StorageError::MissingConfiguration(_))));
    }

    #[tokio::test]
    async fn test_presigned_upload_target() {
        let storage = S3Storage::new(options()).unwrap();
        let before = Utc::now();

        let input = CreateUploadTarget::new("goals/covers/abc.png", "image/png")
            .with_cache_control("public, max-age=31536000, immutable");
        let target = storage.create_upload_target(&input).await.unwrap();

        assert_eq!(target.provider, StorageProvider::S3);
        assert_eq!(target.kind, UploadKind::PresignedPut);
        assert_eq!(target.key, "goals/covers/abc.png");
        assert!(target.url.starts_with("https://"));
        assert!(target.url.contains("goals/covers/abc.png"));
        assert!(target.url.contains("X-Amz-Expires=600"));
        assert!(target.url.contains("X-Amz-Signature="));
        // Content headers are advisory for S3; only the host is signed.
        assert!(target.url.contains("X-Amz-SignedHeaders=host&"));
        assert!(!target.url.contains("wJalrXUtnFEMI"));
        assert_eq!(
            target.public_url,
            "https://nestegg-test.s3.us-east-1.amazonaws.com/goals/covers/abc.png"
        );
        assert_eq!(target.headers["Content-Type"], "image/png");
        assert_eq!(
            target.headers["Cache-Control"],
            "public, max-age=31536000, immutable"
        );

        let ttl = (target.expires_at - before).num_seconds();
        assert!((599..=601).contains(&ttl));
    }

    #[tokio::test]
    async fn test_presigned_upload_target_path_style_endpoint() {
        let storage = S3Storage::new(S3Options {
            endpoint: Some("http://localhost:9000".to_string()),
            force_path_style: true,
            upload_url_ttl: Duration::from_secs(120),
            ..options()
        })
        .unwrap();

        let target = storage
            .create_upload_target(&CreateUploadTarget::new("covers/x.webp", "image/webp"))
            .await
            .unwrap();

        assert!(target
            .url
            .starts_with("http://localhost:9000/nestegg-test/covers/x.webp?"));
        assert!(target.url.contains("X-Amz-Expires=120"));
        assert!(!target.headers.contains_key("Cache-Control"));
    }

    #[tokio::test]
    async fn test_invalid_key_rejected() {
        let storage = S3Storage::new(options()).unwrap();
        let result = storage
            .create_upload_target(&CreateUploadTarget::new("a/../b.png", "image/png"))
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        assert!(matches!(
            storage.delete_object("..").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_signed_url_names_the_public_object() {
        let storage = S3Storage::new(options()).unwrap();
        let target = storage
            .create_upload_target(&CreateUploadTarget::new(
                "covers/my file (1).png",
                "image/png",
            ))
            .await
            .unwrap();

        assert_eq!(decoded_path(&target.url), "/covers/my file (1).png");
        assert_eq!(decoded_path(&target.url), decoded_path(&target.public_url));
        assert_eq!(
            storage.public_url("covers/my file (1).png").unwrap(),
            target.public_url
        );
    }

    #[tokio::test]
    async fn test_keys_escaped_by_object_store_rejected() {
        let storage = S3Storage::new(options()).unwrap();
        for key in [
            "covers/my#1.png",
            "covers/100%.png",
            "covers/a?b.png",
            "covers/~x.png",
            "covers//x.png",
        ] {
            let result = storage
                .create_upload_target(&CreateUploadTarget::new(key, "image/png"))
                .await;
            assert!(
                matches!(result, Err(StorageError::InvalidKey(_))),
                "{} should be rejected",
                key
            );
            assert!(matches!(
                storage.public_url(key),
                Err(StorageError::InvalidKey(_))
            ));
            assert!(matches!(
                storage.delete_object(key).await,
                Err(StorageError::InvalidKey(_))
            ));
        }
    }
}

use crate::keys::{join_url, StorageKey};
use crate::traits::{
    expires_at, storage_key_for, CreateUploadTarget, StorageAdapter, StorageError,
    StorageResult, UploadKind, UploadTarget,
};
use crate::StorageProvider;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub const DEFAULT_LOCAL_STORAGE_PATH: &str = ".local-uploads";
pub const DEFAULT_LOCAL_PUBLIC_URL_BASE: &str = "/api/storage/local-file";
pub const DEFAULT_LOCAL_UPLOAD_URL_BASE: &str = "/api/storage/local-upload";

/// Local filesystem storage implementation
///
/// Upload targets point at a same-origin upload route; the route calls
/// [`LocalStorage::write_object`]. Reads are served by a second route through
/// [`LocalStorage::read_object`].
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
    public_url_base: String,
    upload_url_base: String,
    upload_url_ttl: Duration,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `root` - Storage root; relative paths resolve against the working directory
    /// * `public_url_base` - Route serving stored files (e.g. "/api/storage/local-file")
    /// * `upload_url_base` - Route accepting uploads (e.g. "/api/storage/local-upload")
    /// * `upload_url_ttl` - Lifetime of issued upload targets
    pub async fn new(
        root: impl Into<PathBuf>,
        public_url_base: String,
        upload_url_base: String,
        upload_url_ttl: Duration,
    ) -> StorageResult<Self> {
        let root = absolute_root(&root.into())?;

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::InvalidConfiguration(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            root,
            public_url_base,
            upload_url_base,
            upload_url_ttl,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_url_base(&self) -> &str {
        &self.public_url_base
    }

    /// Normalize a raw key and map it to a confined filesystem path.
    fn key_to_path(&self, raw: &str) -> StorageResult<(StorageKey, PathBuf)> {
        let key = storage_key_for(StorageProvider::Local, raw)?;
        let path = resolve_local_path(&self.root, key.as_str())?;
        Ok((key, path))
    }

    /// Write an object's bytes, creating parent directories as needed.
    ///
    /// Returns the normalized key the bytes were stored under.
    pub async fn write_object(&self, raw_key: &str, data: &[u8]) -> StorageResult<StorageKey> {
        let (key, path) = self.key_to_path(raw_key)?;
        let start = std::time::Instant::now();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(key)
    }

    /// Read an object's bytes. Fails with [`StorageError::NotFound`] when absent.
    pub async fn read_object(&self, raw_key: &str) -> StorageResult<Vec<u8>> {
        let (key, path) = self.key_to_path(raw_key)?;

        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.into_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl StorageAdapter for LocalStorage {
    fn provider(&self) -> StorageProvider {
        StorageProvider::Local
    }

    fn upload_url_ttl(&self) -> Duration {
        self.upload_url_ttl
    }

    async fn create_upload_target(
        &self,
        input: &CreateUploadTarget,
    ) -> StorageResult<UploadTarget> {
        let (key, _) = self.key_to_path(&input.key)?;

        Ok(UploadTarget {
            provider: StorageProvider::Local,
            kind: UploadKind::Local,
            url: join_url(&self.upload_url_base, &key),
            headers: input.upload_headers(),
            public_url: join_url(&self.public_url_base, &key),
            expires_at: expires_at(self.upload_url_ttl)?,
            key: key.into_string(),
        })
    }

    fn public_url(&self, key: &str) -> StorageResult<String> {
        let key = storage_key_for(StorageProvider::Local, key)?;
        Ok(join_url(&self.public_url_base, &key))
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let (key, path) = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(key = %key, "Local storage delete of absent object");
                return Ok(());
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %path.display(),
                    key = %key,
                    "Local storage delete failed"
                );
                return Err(e.into());
            }
        }

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }
}

/// Resolve `key` under `root` and verify the result stays inside it.
///
/// Both paths are made absolute and lexically cleaned; the result must equal
/// the root or sit below it. When the root exists, the nearest existing
/// ancestor of the result is also canonicalized so a symlink inside the root
/// cannot point the write elsewhere. Violations fail with
/// [`StorageError::PathEscape`].
///
/// This does not normalize `key`; callers run [`StorageKey::normalize`] first.
pub fn resolve_local_path(root: &Path, key: &str) -> StorageResult<PathBuf> {
    let root = absolute_root(root)?;
    let resolved = clean_path(&root.join(key));

    if resolved != root && !resolved.starts_with(&root) {
        return Err(path_escape(&root, key));
    }

    if let Ok(canonical_root) = root.canonicalize() {
        let existing = resolved
            .ancestors()
            .find(|ancestor| ancestor.symlink_metadata().is_ok());
        if let Some(existing) = existing {
            let canonical = existing
                .canonicalize()
                .map_err(|_| path_escape(&root, key))?;
            if !canonical.starts_with(&canonical_root) {
                return Err(path_escape(&root, key));
            }
        }
    }

    Ok(resolved)
}

fn path_escape(root: &Path, key: &str) -> StorageError {
    tracing::warn!(
        root = %root.display(),
        key = %key,
        "Storage key resolves outside local storage path"
    );
    StorageError::PathEscape(key.to_string())
}

fn absolute_root(root: &Path) -> StorageResult<PathBuf> {
    if root.is_absolute() {
        Ok(clean_path(root))
    } else {
        Ok(clean_path(&std::env::current_dir()?.join(root)))
    }
}

/// Lexically resolve `.` and `..` components.
fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

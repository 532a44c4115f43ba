//! Configuration module
//!
//! Settings are read from the process environment (after loading `.env`).
//! Storage values are kept raw here; the storage registry validates them when
//! it builds an adapter so that each backend can report exactly which key is
//! missing or malformed.

use std::collections::HashMap;
use std::env;
use std::fmt;

const SERVER_PORT: u16 = 4000;

/// Raw storage settings, one field per environment variable.
#[derive(Clone, Default)]
pub struct StorageSettings {
    /// `STORAGE_PROVIDER`: s3, vercel or local
    pub provider: Option<String>,
    /// `STORAGE_UPLOAD_URL_TTL_SECONDS`
    pub upload_url_ttl_seconds: Option<String>,
    pub s3_region: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, R2, ...)
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub s3_public_url_base: Option<String>,
    pub s3_force_path_style: Option<String>,
    pub blob_read_write_token: Option<String>,
    pub blob_public_url_base: Option<String>,
    pub blob_upload_url_base: Option<String>,
    pub blob_api_url: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_public_url_base: Option<String>,
    pub local_storage_upload_url_base: Option<String>,
}

fn redact(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "<redacted>"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSettings")
            .field("provider", &self.provider)
            .field("upload_url_ttl_seconds", &self.upload_url_ttl_seconds)
            .field("s3_region", &self.s3_region)
            .field("s3_bucket", &self.s3_bucket)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("s3_access_key_id", &redact(&self.s3_access_key_id))
            .field("s3_secret_access_key", &redact(&self.s3_secret_access_key))
            .field("s3_public_url_base", &self.s3_public_url_base)
            .field("s3_force_path_style", &self.s3_force_path_style)
            .field("blob_read_write_token", &redact(&self.blob_read_write_token))
            .field("blob_public_url_base", &self.blob_public_url_base)
            .field("blob_upload_url_base", &self.blob_upload_url_base)
            .field("blob_api_url", &self.blob_api_url)
            .field("local_storage_path", &self.local_storage_path)
            .field(
                "local_storage_public_url_base",
                &self.local_storage_public_url_base,
            )
            .field(
                "local_storage_upload_url_base",
                &self.local_storage_upload_url_base,
            )
            .finish()
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub storage: StorageSettings,
}

impl Config {
    /// Load `.env` (if present) and read configuration from the process environment.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(env::vars())
    }

    /// Build configuration from explicit key/value pairs.
    ///
    /// Empty values are treated as unset.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, anyhow::Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.is_empty())
            .collect();
        let var = |key: &str| vars.get(key).cloned();

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let server_port = match var("PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => SERVER_PORT,
        };

        let storage = StorageSettings {
            provider: var("STORAGE_PROVIDER"),
            upload_url_ttl_seconds: var("STORAGE_UPLOAD_URL_TTL_SECONDS"),
            s3_region: var("S3_REGION"),
            s3_bucket: var("S3_BUCKET"),
            s3_endpoint: var("S3_ENDPOINT"),
            s3_access_key_id: var("S3_ACCESS_KEY_ID"),
            s3_secret_access_key: var("S3_SECRET_ACCESS_KEY"),
            s3_public_url_base: var("S3_PUBLIC_URL_BASE"),
            s3_force_path_style: var("S3_FORCE_PATH_STYLE"),
            blob_read_write_token: var("BLOB_READ_WRITE_TOKEN"),
            blob_public_url_base: var("BLOB_PUBLIC_URL_BASE"),
            blob_upload_url_base: var("BLOB_UPLOAD_URL_BASE"),
            blob_api_url: var("BLOB_API_URL"),
            local_storage_path: var("LOCAL_STORAGE_PATH"),
            local_storage_public_url_base: var("LOCAL_STORAGE_PUBLIC_URL_BASE"),
            local_storage_upload_url_base: var("LOCAL_STORAGE_UPLOAD_URL_BASE"),
        };

        Ok(Config {
            server_port,
            environment,
            storage,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn storage(&self) -> &StorageSettings {
        &self.storage
    }
}

/// Interpret a flag value: `1` or `true` (any case) enables it.
pub fn parse_flag(value: Option<&str>) -> bool {
    match value {
        Some(v) => v == "1" || v.eq_ignore_ascii_case("true"),
        None => false,
    }
}

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage provider types
///
/// Selects which backend issues upload targets. Defined in core because it is
/// read from configuration and serialized into upload descriptors.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    #[default]
    S3,
    Vercel,
    Local,
}

impl StorageProvider {
    pub const ALL: [StorageProvider; 3] =
        [StorageProvider::S3, StorageProvider::Vercel, StorageProvider::Local];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageProvider::S3 => "s3",
            StorageProvider::Vercel => "vercel",
            StorageProvider::Local => "local",
        }
    }
}

impl FromStr for StorageProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "s3" => Ok(StorageProvider::S3),
            "vercel" => Ok(StorageProvider::Vercel),
            "local" => Ok(StorageProvider::Local),
            _ => Err(anyhow::anyhow!(
                "Invalid storage provider: {}. Expected one of: s3, vercel, local",
                s
            )),
        }
    }
}

impl Display for StorageProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

//! Nestegg Storage Library
//!
//! Provider-agnostic upload storage for goal cover images. The
//! [`StorageAdapter`] trait issues upload targets (direct-upload descriptors),
//! resolves public URLs and deletes objects. Three backends implement it:
//!
//! - [`LocalStorage`]: files under a local root, uploaded and served through
//!   same-origin routes.
//! - [`S3Storage`]: presigned PUT URLs against S3-compatible object storage.
//! - [`BlobStorage`]: uploads proxied through a same-origin route to a blob
//!   service that holds the read-write token.
//!
//! # Storage key format
//!
//! Keys are relative, slash-separated paths such as `goals/covers/{uuid}.jpg`.
//! Every raw key is passed through [`StorageKey::normalize`] before use; keys
//! with `.` or `..` segments are rejected.

#[cfg(feature = "storage-vercel")]
pub mod blob;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-vercel")]
pub use blob::{BlobClient, BlobObject, BlobOptions, BlobStorage};
pub use factory::StorageRegistry;
pub use keys::{cover_image_key, encode_storage_key, join_url, StorageKey};
#[cfg(feature = "storage-local")]
pub use local::{resolve_local_path, LocalStorage};
pub use nestegg_core::StorageProvider;
#[cfg(feature = "storage-s3")]
pub use s3::{S3Options, S3Storage};
pub use traits::{
    CreateUploadTarget, StorageAdapter, StorageError, StorageResult, UploadKind, UploadTarget,
};

//! Nestegg Core Library
//!
//! This crate provides configuration, upload constants and the error taxonomy
//! shared by the storage layer and the HTTP routes that sit in front of it.

pub mod config;
pub mod constants;
pub mod error;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, StorageSettings};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageProvider;
// Note: StorageAdapter, StorageError, StorageResult live in nestegg-storage

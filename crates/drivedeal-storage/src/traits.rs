//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const META_ORIGINAL_FILENAME: &str = "original-filename";
pub const META_PRINCIPAL_ID: &str = "principal-id";
pub const META_ENCRYPTED: &str = "encrypted";

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("URL signing failed: {0}")]
    SigningFailed(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Metadata attached to every uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub content_type: String,
    pub original_filename: String,
    pub principal_id: String,
    /// The stored bytes are a serialized encryption envelope.
    pub encrypted: bool,
}

impl ObjectMetadata {
    /// User metadata as string pairs, content type excluded.
    pub fn user_metadata(&self) -> Vec<(&'static str, String)> {
        vec![
            (META_ORIGINAL_FILENAME, self.original_filename.clone()),
            (META_PRINCIPAL_ID, self.principal_id.clone()),
            (META_ENCRYPTED, self.encrypted.to_string()),
        ]
    }

    /// Rebuild from user metadata pairs. Missing entries become empty, and anything but
    /// `"true"` means unencrypted.
    pub fn from_user_metadata(content_type: String, pairs: &HashMap<String, String>) -> Self {
        let get = |key: &str| pairs.get(key).cloned().unwrap_or_default();
        Self {
            content_type,
            original_filename: get(META_ORIGINAL_FILENAME),
            principal_id: get(META_PRINCIPAL_ID),
            encrypted: pairs.get(META_ENCRYPTED).map(|v| v == "true").unwrap_or(false),
        }
    }
}

/// An object read back from storage.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub data: Bytes,
    pub metadata: ObjectMetadata,
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait. Objects are
/// written once and never mutated.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` under `storage_key` together with its metadata.
    async fn put_object(
        &self,
        storage_key: &str,
        data: Bytes,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()>;

    /// Read an object and its metadata.
    async fn get_object(&self, storage_key: &str) -> StorageResult<StoredObject>;

    /// Time-limited GET URL for exactly one object.
    async fn signed_url(&self, storage_key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_pairs_round_trip() {
        let metadata = ObjectMetadata {
            content_type: "image/png".to_string(),
            original_filename: "car.png".to_string(),
            principal_id: "user-42".to_string(),
            encrypted: true,
        };

        let pairs: HashMap<String, String> = metadata
            .user_metadata()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(pairs.get("encrypted").map(String::as_str), Some("true"));

        let rebuilt = ObjectMetadata::from_user_metadata("image/png".to_string(), &pairs);
        assert_eq!(rebuilt, metadata);
    }

    #[test]
    fn test_missing_encrypted_flag_means_plaintext() {
        let rebuilt = ObjectMetadata::from_user_metadata("application/pdf".to_string(), &HashMap::new());
        assert!(!rebuilt.encrypted);
        assert!(rebuilt.original_filename.is_empty());
    }
}

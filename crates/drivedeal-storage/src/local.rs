use crate::signer::UrlSigner;
use crate::traits::{ObjectMetadata, Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

const METADATA_SUFFIX: &str = ".meta.json";

/// Local filesystem storage implementation
///
/// Each object is a plain file next to a `{name}.meta.json` sidecar holding its
/// [`ObjectMetadata`]. Retrieval URLs are HMAC-signed and served by the API.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    signer: UrlSigner,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "./data/uploads")
    /// * `base_url` - Base URL of the signed retrieval route (e.g., "http://localhost:4000/files")
    /// * `signer` - Signs and verifies retrieval URLs
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        signer: UrlSigner,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
            signer,
        })
    }

    pub fn signer(&self) -> &UrlSigner {
        &self.signer
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects traversal sequences, absolute keys and keys naming a metadata sidecar.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty()
            || storage_key.contains("..")
            || storage_key.starts_with('/')
            || storage_key.contains('\\')
        {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }
        if storage_key.ends_with(METADATA_SUFFIX) {
            return Err(StorageError::InvalidKey(
                "Storage key names a metadata file".to_string(),
            ));
        }

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    fn metadata_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(METADATA_SUFFIX);
        PathBuf::from(name)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_synced(path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put_object(
        &self,
        storage_key: &str,
        data: Bytes,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        let size = data.len();
        let sidecar = serde_json::to_vec(metadata).map_err(|e| {
            StorageError::UploadFailed(format!("Failed to serialize metadata: {}", e))
        })?;

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        Self::write_synced(&path, &data).await?;
        // The sidecar is written last; an object without one is treated as absent.
        Self::write_synced(&Self::metadata_path(&path), &sidecar).await?;

        tracing::info!(
            path = %path.display(),
            storage_key = %storage_key,
            size_bytes = size,
            encrypted = metadata.encrypted,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn get_object(&self, storage_key: &str) -> StorageResult<StoredObject> {
        let path = self.key_to_path(storage_key)?;
        let metadata_path = Self::metadata_path(&path);
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false)
            || !fs::try_exists(&metadata_path).await.unwrap_or(false)
        {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;
        let sidecar = fs::read(&metadata_path).await.map_err(|e| {
            StorageError::DownloadFailed(format!(
                "Failed to read metadata {}: {}",
                metadata_path.display(),
                e
            ))
        })?;
        let metadata: ObjectMetadata = serde_json::from_slice(&sidecar).map_err(|e| {
            StorageError::DownloadFailed(format!("Malformed metadata for {}: {}", storage_key, e))
        })?;

        tracing::info!(
            path = %path.display(),
            storage_key = %storage_key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(StoredObject {
            key: storage_key.to_string(),
            data: Bytes::from(data),
            metadata,
        })
    }

    async fn signed_url(&self, storage_key: &str, expires_in: Duration) -> StorageResult<String> {
        self.key_to_path(storage_key)?;
        Ok(self.signer.sign_url(&self.base_url, storage_key, expires_in))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

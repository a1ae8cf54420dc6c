use crate::traits::{ObjectMetadata, Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::{Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload};
use std::collections::HashMap;
use std::time::Duration;

/// S3-compatible storage backed by `object_store`.
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
}

impl S3Storage {
    /// Credentials come from the environment (`AWS_ACCESS_KEY_ID`, instance profile, ...).
    pub async fn new(
        bucket: String,
        region: String,
        endpoint: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket.clone())
            .with_region(region);
        if let Some(endpoint) = endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder.with_endpoint(endpoint).with_allow_http(allow_http);
        }
        Self::from_builder(builder, bucket)
    }

    pub fn from_builder(builder: AmazonS3Builder, bucket: String) -> StorageResult<Self> {
        let store = builder.build().map_err(|e| {
            StorageError::ConfigError(format!("Failed to build S3 object store: {}", e))
        })?;
        Ok(S3Storage { store, bucket })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn map_object_store_error(err: object_store::Error, storage_key: &str) -> StorageError {
    match err {
        object_store::Error::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
        other => StorageError::BackendError(other.to_string()),
    }
}

#[async_trait]
impl Storage for S3Storage {
    #[tracing::instrument(skip(self, data, metadata), fields(
        s3.bucket = %self.bucket,
        s3.key = %storage_key,
        s3.size = data.len()
    ))]
    async fn put_object(
        &self,
        storage_key: &str,
        data: Bytes,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let size = data.len();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, metadata.content_type.clone().into());
        for (name, value) in metadata.user_metadata() {
            attributes.insert(Attribute::Metadata(name.into()), value.into());
        }
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        let location = Path::from(storage_key);
        let result = self
            .store
            .put_opts(&location, PutPayload::from(data), opts)
            .await;
        let duration = start.elapsed().as_secs_f64();

        match result {
            Ok(_) => {
                tracing::info!(
                    size_bytes = size,
                    encrypted = metadata.encrypted,
                    duration_ms = duration * 1000.0,
                    "S3 upload successful"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    size_bytes = size,
                    duration_ms = duration * 1000.0,
                    "S3 upload failed"
                );
                Err(StorageError::UploadFailed(e.to_string()))
            }
        }
    }

    #[tracing::instrument(skip(self), fields(s3.bucket = %self.bucket, s3.key = %storage_key))]
    async fn get_object(&self, storage_key: &str) -> StorageResult<StoredObject> {
        let start = std::time::Instant::now();
        let location = Path::from(storage_key);

        let response = self
            .store
            .get(&location)
            .await
            .map_err(|e| map_object_store_error(e, storage_key))?;

        let mut content_type = String::from("application/octet-stream");
        let mut pairs = HashMap::new();
        for (attribute, value) in response.attributes.iter() {
            let value = AsRef::<str>::as_ref(value).to_string();
            match attribute {
                Attribute::ContentType => content_type = value,
                Attribute::Metadata(name) => {
                    pairs.insert(name.to_string(), value);
                }
                _ => {}
            }
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(StoredObject {
            key: storage_key.to_string(),
            data,
            metadata: ObjectMetadata::from_user_metadata(content_type, &pairs),
        })
    }

    #[tracing::instrument(skip(self), fields(s3.bucket = %self.bucket, s3.key = %storage_key))]
    async fn signed_url(&self, storage_key: &str, expires_in: Duration) -> StorageResult<String> {
        let location = Path::from(storage_key);
        let url = self
            .store
            .signed_url(Method::GET, &location, expires_in)
            .await
            .map_err(|e| StorageError::SigningFailed(e.to_string()))?;

        tracing::debug!(
            expires_in_seconds = expires_in.as_secs(),
            "Generated presigned GET URL"
        );

        Ok(url.to_string())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

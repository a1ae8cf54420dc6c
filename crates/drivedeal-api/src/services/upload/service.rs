//! Upload pipeline
//!
//! extract → validate → authenticate → scan → name → encrypt → store → sign.
//! Every step can reject the upload; the store write is the last step before success, so
//! a rejected upload never leaves a referenced object behind.

use std::sync::Arc;

use axum::extract::Multipart;
use bytes::Bytes;
use drivedeal_core::config::SIGNED_URL_TTL;
use drivedeal_core::validation::{is_safe_filename, INVALID_FILENAME};
use drivedeal_core::{encryption, AppError};
use drivedeal_storage::{generate_upload_filename, generate_upload_key, ObjectMetadata};

use crate::auth::Principal;
use crate::error::storage_error;
use crate::state::AppState;
use crate::utils::upload::{
    extract_file, normalize_mime_type, validate_content_type, validate_file_extension,
};

use super::types::{UploadResponse, ValidatedFile};

pub const USER_NOT_AUTHENTICATED: &str = "User not authenticated";
pub const SECURITY_SCAN_FAILED: &str = "File failed security scan";

pub struct UploadService {
    state: Arc<AppState>,
}

impl UploadService {
    pub fn new(state: &Arc<AppState>) -> Self {
        Self {
            state: state.clone(),
        }
    }

    pub async fn upload(
        &self,
        multipart: Multipart,
        principal: Option<Principal>,
    ) -> Result<UploadResponse, AppError> {
        let file = self.extract_and_validate(multipart).await?;

        let principal = principal
            .ok_or_else(|| AppError::Unauthenticated(USER_NOT_AUTHENTICATED.to_string()))?;

        self.scan_security(&file).await?;

        let filename = generate_upload_filename(&file.original_filename);
        let size = file.data.len();

        tracing::info!(
            user_id = %principal.user_id,
            filename = %filename,
            content_type = %file.content_type,
            size_bytes = size,
            "Processing upload"
        );

        let encrypted = self.state.config.upload.encrypt_uploads;
        let body = if encrypted {
            self.encrypt(file.data.clone()).await?
        } else {
            file.data.clone()
        };

        let key = self
            .store(&principal, &filename, &file, body, encrypted)
            .await?;

        let url = self
            .state
            .storage
            .signed_url(&key, SIGNED_URL_TTL)
            .await
            .map_err(storage_error)?;

        tracing::info!(storage_key = %key, encrypted, "Upload stored");

        Ok(UploadResponse {
            url,
            key,
            filename,
            content_type: file.content_type,
            size,
            encrypted,
            expires_in: SIGNED_URL_TTL.as_secs(),
        })
    }

    async fn extract_and_validate(&self, multipart: Multipart) -> Result<ValidatedFile, AppError> {
        let policy = &self.state.config.upload;
        let extracted = extract_file(multipart, policy.max_file_size).await?;

        validate_content_type(&extracted.content_type, &policy.allowed_file_types)?;
        // The name travels as object metadata (`x-amz-meta-*` on S3), which only carries
        // visible ASCII. A part without a filename fails here too.
        if !is_safe_filename(&extracted.filename) {
            return Err(AppError::Validation(INVALID_FILENAME.to_string()));
        }
        let extension = validate_file_extension(&extracted.filename, &policy.allowed_extensions)?;

        Ok(ValidatedFile {
            content_type: normalize_mime_type(&extracted.content_type),
            data: extracted.data,
            original_filename: extracted.filename,
            extension,
        })
    }

    async fn scan_security(&self, file: &ValidatedFile) -> Result<(), AppError> {
        if self.state.scan_gate.scan_file(file.data.clone()).await {
            return Ok(());
        }
        tracing::warn!(
            extension = %file.extension,
            size_bytes = file.data.len(),
            "Upload rejected by malware scan gate"
        );
        Err(AppError::SecurityScan(SECURITY_SCAN_FAILED.to_string()))
    }

    /// PBKDF2 and AES-GCM run on the blocking pool.
    async fn encrypt(&self, data: Bytes) -> Result<Bytes, AppError> {
        let key = self.state.config.secrets.encryption_key.clone();
        let envelope = tokio::task::spawn_blocking(move || {
            encryption::encrypt(&data, &key)?.to_envelope()
        })
        .await
        .map_err(|e| AppError::Internal(format!("Encryption task failed: {}", e)))??;
        Ok(Bytes::from(envelope))
    }

    async fn store(
        &self,
        principal: &Principal,
        filename: &str,
        file: &ValidatedFile,
        body: Bytes,
        encrypted: bool,
    ) -> Result<String, AppError> {
        let key = generate_upload_key(&principal.user_id, filename).map_err(storage_error)?;
        let metadata = ObjectMetadata {
            content_type: file.content_type.clone(),
            original_filename: file.original_filename.clone(),
            principal_id: principal.user_id.clone(),
            encrypted,
        };

        self.state
            .storage
            .put_object(&key, body, &metadata)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, storage_key = %key, "Failed to store upload");
                storage_error(e)
            })?;
        Ok(key)
    }
}

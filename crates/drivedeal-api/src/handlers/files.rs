//! Signed retrieval for the local storage backend.
//!
//! The URL proves (key, expiry); encrypted objects are decoded with the server key before
//! being returned.

use crate::error::{storage_error, HttpAppError};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use bytes::Bytes;
use drivedeal_core::{encryption, AppError, EncryptionResult};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SignedFileQuery {
    pub expires: Option<String>,
    pub signature: Option<String>,
}

fn invalid_signature() -> HttpAppError {
    HttpAppError(AppError::Forbidden("Invalid signature".to_string()))
}

#[tracing::instrument(skip(state, query), fields(operation = "get_signed_file"))]
pub async fn get_signed_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<SignedFileQuery>,
) -> Result<Response, HttpAppError> {
    let expires = query
        .expires
        .as_deref()
        .and_then(|e| e.parse::<u64>().ok())
        .ok_or_else(invalid_signature)?;
    let signature = query.signature.as_deref().ok_or_else(invalid_signature)?;

    state.url_signer.verify(&key, expires, signature)?;

    let object = state.storage.get_object(&key).await.map_err(storage_error)?;

    let data = if object.metadata.encrypted {
        let envelope = EncryptionResult::from_envelope(&object.data)?;
        let encryption_key = state.config.secrets.encryption_key.clone();
        let plaintext =
            tokio::task::spawn_blocking(move || encryption::decrypt(&envelope, &encryption_key))
                .await
                .map_err(|e| AppError::Internal(format!("Decryption task failed: {}", e)))??;
        Bytes::from(plaintext)
    } else {
        object.data
    };

    tracing::debug!(
        storage_key = %key,
        size_bytes = data.len(),
        encrypted = object.metadata.encrypted,
        "Serving signed file"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, object.metadata.content_type.as_str())
        .body(Body::from(data))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })
}

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, Json};
use drivedeal_core::validation::validate_file_metadata;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadataRequest {
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FileMetadataResponse {
    pub valid: bool,
}

/// `POST /api/uploads/validate`: cheap check of declared metadata, no file bytes involved.
pub async fn validate_metadata(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<FileMetadataRequest>,
) -> Result<Json<FileMetadataResponse>, HttpAppError> {
    validate_file_metadata(
        request.filename.as_deref(),
        request.content_type.as_deref(),
        &state.config.upload.allowed_file_types,
    )?;
    Ok(Json(FileMetadataResponse { valid: true }))
}

use crate::auth::MaybePrincipal;
use crate::error::UploadRejection;
use crate::services::{UploadResponse, UploadService};
use crate::state::AppState;
use crate::utils::upload::NO_FILE_UPLOADED;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use drivedeal_core::AppError;
use std::sync::Arc;

/// `POST /api/uploads` with a multipart field named `file`.
///
/// Any rejection is a 400 carrying the reason; the body of a success holds the signed
/// retrieval URL.
#[tracing::instrument(skip_all, fields(operation = "upload_file"))]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    MaybePrincipal(principal): MaybePrincipal,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, UploadRejection> {
    // Not a multipart request at all
    let multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Upload without a multipart body");
        AppError::Validation(NO_FILE_UPLOADED.to_string())
    })?;

    let response = UploadService::new(&state)
        .upload(multipart, principal)
        .await?;
    Ok(Json(response))
}

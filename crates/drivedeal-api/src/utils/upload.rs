//! Multipart extraction and upload policy checks

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};
use drivedeal_core::validation::file_extension;
use drivedeal_core::AppError;

pub const FILE_FIELD: &str = "file";
pub const NO_FILE_UPLOADED: &str = "No file uploaded";

/// A single uploaded file, fully buffered.
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    pub data: Bytes,
    pub filename: String,
    pub content_type: String,
    pub size: usize,
}

pub fn file_too_large(max_size: usize) -> AppError {
    AppError::Validation(format!(
        "File too large: maximum size is {} bytes",
        max_size
    ))
}

fn multipart_error(err: MultipartError, max_size: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return file_too_large(max_size);
    }
    AppError::Validation(format!("Failed to read multipart body: {}", err.body_text()))
}

/// Read the single field named `file` from the form.
///
/// The file is streamed chunk by chunk and abandoned as soon as it exceeds `max_size`.
/// Other fields are ignored; a second `file` field is rejected.
pub async fn extract_file(
    mut multipart: Multipart,
    max_size: usize,
) -> Result<ExtractedFile, AppError> {
    let mut extracted: Option<ExtractedFile> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_size))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        if extracted.is_some() {
            return Err(AppError::Validation(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            ));
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let mut buffer = BytesMut::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, max_size))?
        {
            if buffer.len() + chunk.len() > max_size {
                return Err(file_too_large(max_size));
            }
            buffer.extend_from_slice(&chunk);
        }

        let data = buffer.freeze();
        extracted = Some(ExtractedFile {
            size: data.len(),
            data,
            filename,
            content_type,
        });
    }

    extracted.ok_or_else(|| AppError::Validation(NO_FILE_UPLOADED.to_string()))
}

/// Lower-cased MIME type without parameters (`image/jpeg; charset=x` -> `image/jpeg`).
pub fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_lowercase()
}

pub fn validate_content_type(content_type: &str, allowed_types: &[String]) -> Result<(), AppError> {
    let normalized = normalize_mime_type(content_type);
    if !allowed_types.iter().any(|ct| *ct == normalized) {
        return Err(AppError::Validation(format!(
            "File type not allowed. Allowed types: {}",
            allowed_types.join(", ")
        )));
    }
    Ok(())
}

/// Returns the lower-cased extension (with its dot) on success.
pub fn validate_file_extension(
    filename: &str,
    allowed_extensions: &[String],
) -> Result<String, AppError> {
    let extension = file_extension(filename);
    if extension.is_empty() || !allowed_extensions.contains(&extension) {
        return Err(AppError::Validation(format!(
            "File extension not allowed. Allowed extensions: {}",
            allowed_extensions.join(", ")
        )));
    }
    Ok(extension)
}

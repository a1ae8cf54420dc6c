//! Types used by the upload service

use bytes::Bytes;
use serde::Serialize;

/// Extracted file that passed the type and extension allow-lists
pub struct ValidatedFile {
    pub data: Bytes,
    pub original_filename: String,
    /// Normalized MIME type
    pub content_type: String,
    pub extension: String,
}

/// Body returned for a successful upload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Signed, time-limited retrieval URL
    pub url: String,
    pub key: String,
    /// Generated storage filename; the caller's filename is never reused
    pub filename: String,
    pub content_type: String,
    /// Size of the uploaded file before encryption
    pub size: usize,
    pub encrypted: bool,
    /// URL lifetime in seconds
    pub expires_in: u64,
}

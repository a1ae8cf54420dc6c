//! Pre-flight validation of declared file metadata.

use crate::AppError;
use regex::Regex;
use std::sync::LazyLock;

static FILENAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\-_.]+$").expect("filename pattern is valid"));

pub const MISSING_METADATA: &str = "Missing file metadata";
pub const INVALID_FILENAME: &str = "Invalid filename";
pub const INVALID_CONTENT_TYPE: &str = "Invalid content type";

/// Letters, digits, hyphen, underscore and dot only.
pub fn is_safe_filename(filename: &str) -> bool {
    FILENAME_PATTERN.is_match(filename)
}

/// Validate a declared filename and content type without touching file bytes.
///
/// Used before handing out a direct upload URL. Missing (or empty) metadata, a
/// filename outside the safe pattern, and a content type outside the allow-list each
/// fail with their own message.
pub fn validate_file_metadata(
    filename: Option<&str>,
    content_type: Option<&str>,
    allowed_content_types: &[String],
) -> Result<(), AppError> {
    let (filename, content_type) = match (filename, content_type) {
        (Some(f), Some(c)) if !f.is_empty() && !c.is_empty() => (f, c),
        _ => return Err(AppError::Validation(MISSING_METADATA.to_string())),
    };

    if !is_safe_filename(filename) {
        return Err(AppError::Validation(INVALID_FILENAME.to_string()));
    }

    let content_type = content_type.trim().to_lowercase();
    if !allowed_content_types.iter().any(|ct| *ct == content_type) {
        return Err(AppError::Validation(INVALID_CONTENT_TYPE.to_string()));
    }

    Ok(())
}

/// Lower-cased extension including the leading dot, or an empty string.
///
/// Only the final path segment is considered, and a leading dot (`.env`) is not an
/// extension.
pub fn file_extension(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match name.rfind('.') {
        Some(0) | None => String::new(),
        Some(pos) => name[pos..].to_lowercase(),
    }
}

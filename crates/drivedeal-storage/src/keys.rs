//! Shared key generation for storage backends.
//!
//! Key format: `uploads/{principal_id}/{timestamp_ms}-{32 hex chars}{ext}`.

use crate::{StorageError, StorageResult};
use drivedeal_core::validation::file_extension;

pub const UPLOAD_PREFIX: &str = "uploads";

/// Collision-resistant storage filename. Only the extension of the caller's filename is
/// kept.
pub fn generate_upload_filename(original_filename: &str) -> String {
    let random: [u8; 16] = rand::random();
    format!(
        "{}-{}{}",
        chrono::Utc::now().timestamp_millis(),
        hex::encode(random),
        file_extension(original_filename)
    )
}

/// Generate the storage key for a principal's upload.
///
/// The principal id becomes a single path segment, so separators and dot segments are
/// refused.
pub fn generate_upload_key(principal_id: &str, filename: &str) -> StorageResult<String> {
    if principal_id.is_empty()
        || principal_id == "."
        || principal_id == ".."
        || principal_id.contains(['/', '\\'])
    {
        return Err(StorageError::InvalidKey(format!(
            "Principal id cannot be used in a storage key: {:?}",
            principal_id
        )));
    }
    Ok(format!("{}/{}/{}", UPLOAD_PREFIX, principal_id, filename))
}

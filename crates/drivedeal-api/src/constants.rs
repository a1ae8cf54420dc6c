//! API constants

/// API base path prefix
pub const API_BASE: &str = "/api";

/// Route serving locally stored objects through signed URLs.
pub const FILES_ROUTE: &str = "/files";

/// Room left on top of the file size limit for multipart boundaries and part headers.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Largest non-multipart body the suspicious-payload detector buffers.
pub const INSPECTED_BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// How often expired rate-limit buckets are swept.
pub const RATE_LIMIT_CLEANUP_INTERVAL_SECS: u64 = 300;

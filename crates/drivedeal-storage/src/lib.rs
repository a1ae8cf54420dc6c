//! DriveDeal Storage Library
//!
//! Storage abstraction for uploaded objects, with S3 and local filesystem backends.
//!
//! # Storage key format
//!
//! `uploads/{principal_id}/{timestamp_ms}-{random_hex}{ext}`. Keys must not contain `..`
//! or a leading `/`. Key generation is centralized in the `keys` module so all backends
//! stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod signer;
pub mod traits;

// Re-export commonly used types
pub use drivedeal_core::StorageBackend;
pub use factory::create_storage;
pub use keys::{generate_upload_filename, generate_upload_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use signer::{SignatureError, UrlSigner};
pub use traits::{ObjectMetadata, Storage, StorageError, StorageResult, StoredObject};

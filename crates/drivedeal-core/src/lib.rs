//! DriveDeal Core Library
//!
//! Configuration, error types, the symmetric encryption codec, credential hygiene and
//! file-metadata validation shared by every DriveDeal crate.

pub mod config;
pub mod encryption;
pub mod error;
pub mod password;
pub mod storage_types;
pub mod validation;

pub use config::Config;
pub use encryption::{EncryptionMetadata, EncryptionResult};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use password::{PasswordHasher, PasswordValidation};
pub use storage_types::StorageBackend;

pub mod credentials;
pub mod files;
pub mod health;
pub mod metadata;
pub mod upload;

mod service;
mod types;

pub use service::UploadService;
pub use types::UploadResponse;

pub mod upload;

pub use upload::{UploadResponse, UploadService};

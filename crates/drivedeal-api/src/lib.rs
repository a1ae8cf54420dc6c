//! DriveDeal API Library
//!
//! HTTP surface of the secure upload pipeline: handlers, request security middleware and
//! application setup.

pub mod constants;
mod handlers;
mod services;
pub mod setup;
mod telemetry;
mod utils;

pub mod auth;
pub mod error;
pub mod middleware;
pub mod state;

pub use error::ErrorResponse;
pub use services::UploadResponse;
pub use state::AppState;

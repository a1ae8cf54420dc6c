//! Malware scan gate.
//!
//! Scanners report infection or fail. The gate turns both an infected verdict and any
//! scanner failure into "unsafe": uploads are refused when the scanner cannot vouch for
//! them.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scanner unavailable: {0}")]
    Unavailable(String),

    #[error("Scan timed out after {0} seconds")]
    Timeout(u64),

    #[error("Unexpected scanner response: {0}")]
    Protocol(String),
}

/// Narrow interface to an external malware scanner.
#[async_trait]
pub trait MalwareScanner: Send + Sync {
    async fn is_infected(&self, data: Bytes) -> Result<bool, ScanError>;

    fn name(&self) -> &'static str;
}

/// Fail-closed wrapper around a [`MalwareScanner`].
#[derive(Clone)]
pub struct ScanGate {
    scanner: Arc<dyn MalwareScanner>,
}

impl ScanGate {
    pub fn new(scanner: Arc<dyn MalwareScanner>) -> Self {
        Self { scanner }
    }

    /// `true` only when the scanner ran and found nothing.
    pub async fn scan_file(&self, data: Bytes) -> bool {
        let size = data.len();
        match self.scanner.is_infected(data).await {
            Ok(false) => true,
            Ok(true) => {
                tracing::warn!(
                    scanner = self.scanner.name(),
                    size_bytes = size,
                    "Upload rejected: malware detected"
                );
                false
            }
            Err(e) => {
                tracing::error!(
                    scanner = self.scanner.name(),
                    error = %e,
                    size_bytes = size,
                    "Malware scan failed, treating file as unsafe"
                );
                false
            }
        }
    }
}

/// Reports every file as clean. Refused by configuration validation in production.
#[derive(Debug, Clone, Default)]
pub struct DisabledScanner;

#[async_trait]
impl MalwareScanner for DisabledScanner {
    async fn is_infected(&self, _data: Bytes) -> Result<bool, ScanError> {
        tracing::debug!("Malware scanning disabled, skipping scan");
        Ok(false)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

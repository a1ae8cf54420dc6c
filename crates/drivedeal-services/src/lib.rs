//! DriveDeal Services Layer
//!
//! Clients for the external collaborators of the upload and credential flows: the
//! malware scanner behind the scan gate, and the k-anonymity breach-password service.

pub mod breach;
#[cfg(feature = "clamav")]
pub mod clamav;
pub mod scanner;

pub use breach::{BreachCheckError, BreachChecker};
#[cfg(feature = "clamav")]
pub use clamav::ClamAvScanner;
pub use scanner::{DisabledScanner, MalwareScanner, ScanError, ScanGate};

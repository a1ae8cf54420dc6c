use crate::scanner::{MalwareScanner, ScanError};
use async_trait::async_trait;
use bytes::Bytes;
use clamav_client::{clean, Tcp};
use std::str;
use std::time::{Duration, Instant};

/// ClamAV daemon reached over TCP (clamd `INSTREAM`).
#[derive(Debug, Clone)]
pub struct ClamAvScanner {
    host: String,
    port: u16,
    /// Timeout in seconds for each scan operation (default: 30)
    timeout_secs: u64,
}

impl ClamAvScanner {
    pub fn new(host: String, port: u16) -> Self {
        Self::with_timeout(host, port, 30)
    }

    /// Create with a custom scan timeout (for large files or slow ClamAV instances).
    pub fn with_timeout(host: String, port: u16, timeout_secs: u64) -> Self {
        Self {
            host,
            port,
            timeout_secs,
        }
    }
}

/// Signature name from a clamd reply such as `stream: Eicar-Test-Signature FOUND`.
fn virus_name(response: &[u8]) -> String {
    let response = str::from_utf8(response).map(str::trim).unwrap_or("unknown");
    if !response.contains("FOUND") {
        return "unknown".to_string();
    }
    response
        .split(':')
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or("unknown")
        .to_string()
}

#[async_trait]
impl MalwareScanner for ClamAvScanner {
    /// The sync client runs inside spawn_blocking to avoid !Send tokio futures.
    async fn is_infected(&self, data: Bytes) -> Result<bool, ScanError> {
        let start = Instant::now();
        tracing::debug!(host = %self.host, port = %self.port, "Starting ClamAV scan");
        let address = format!("{}:{}", self.host, self.port);

        let result = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            tokio::task::spawn_blocking(move || {
                let connection = Tcp {
                    host_address: address.as_str(),
                };
                let response = clamav_client::scan_buffer(&data, connection, None)
                    .map_err(|e| ScanError::Unavailable(e.to_string()))?;
                let is_clean = clean(&response).map_err(|e| {
                    ScanError::Protocol(format!("Failed to parse ClamAV response: {}", e))
                })?;
                Ok::<_, ScanError>((is_clean, response))
            }),
        )
        .await;

        match result {
            Ok(Ok(Ok((true, _)))) => {
                tracing::info!(
                    duration_ms = start.elapsed().as_millis(),
                    "File scan completed: clean"
                );
                Ok(false)
            }
            Ok(Ok(Ok((false, response)))) => {
                tracing::warn!(
                    duration_ms = start.elapsed().as_millis(),
                    virus = %virus_name(&response),
                    "File scan detected virus"
                );
                Ok(true)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(e)) => Err(ScanError::Unavailable(format!(
                "ClamAV scan task join error: {}",
                e
            ))),
            Err(_) => Err(ScanError::Timeout(self.timeout_secs)),
        }
    }

    fn name(&self) -> &'static str {
        "clamav"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScanGate;
    use std::sync::Arc;

    #[test]
    fn test_virus_name_parsing() {
        assert_eq!(
            virus_name(b"stream: Eicar-Test-Signature FOUND\0"),
            "Eicar-Test-Signature"
        );
        assert_eq!(virus_name(b"stream: OK\0"), "unknown");
        assert_eq!(virus_name(&[0xff, 0xfe]), "unknown");
    }

    #[tokio::test]
    async fn test_unreachable_daemon_is_an_error() {
        // Port 1 on loopback refuses connections.
        let scanner = ClamAvScanner::with_timeout("127.0.0.1".to_string(), 1, 5);
        let result = scanner.is_infected(Bytes::from_static(b"data")).await;
        assert!(result.is_err());

        let gate = ScanGate::new(Arc::new(scanner));
        assert!(!gate.scan_file(Bytes::from_static(b"data")).await);
    }
}

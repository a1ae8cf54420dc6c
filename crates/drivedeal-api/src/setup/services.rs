use anyhow::{Context, Result};
use drivedeal_core::Config;
use drivedeal_services::{BreachChecker, DisabledScanner, ScanGate};
use std::sync::Arc;

/// ClamAV when scanning is enabled, otherwise a pass-through scanner (refused in
/// production by configuration validation).
pub fn setup_scan_gate(config: &Config) -> Result<ScanGate> {
    let settings = &config.scanner;
    if !settings.enabled {
        tracing::warn!("Malware scanning disabled: uploads are not scanned");
        return Ok(ScanGate::new(Arc::new(DisabledScanner)));
    }

    #[cfg(feature = "clamav")]
    {
        tracing::info!(
            host = %settings.host,
            port = settings.port,
            timeout_secs = settings.timeout_secs,
            "ClamAV scanning enabled"
        );
        Ok(ScanGate::new(Arc::new(
            drivedeal_services::ClamAvScanner::with_timeout(
                settings.host.clone(),
                settings.port,
                settings.timeout_secs,
            ),
        )))
    }

    #[cfg(not(feature = "clamav"))]
    {
        anyhow::bail!("CLAMAV_ENABLED is set but the clamav feature is not compiled in")
    }
}

pub fn setup_breach_checker(config: &Config) -> Result<BreachChecker> {
    BreachChecker::new(config.breach_check_url.clone())
        .context("Failed to initialize breach check client")
}

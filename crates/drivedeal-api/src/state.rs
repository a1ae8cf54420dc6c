//! Application state.
//!
//! Constructed once by the entry point (or a test) and shared behind an `Arc`.

use crate::auth::jwt::JwtKeys;
use drivedeal_core::Config;
use drivedeal_services::{BreachChecker, ScanGate};
use drivedeal_storage::{Storage, UrlSigner};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub scan_gate: ScanGate,
    pub breach_checker: BreachChecker,
    /// Verifies retrieval URLs issued by the local backend.
    pub url_signer: UrlSigner,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        scan_gate: ScanGate,
        breach_checker: BreachChecker,
    ) -> Self {
        let url_signer = UrlSigner::new(&config.secrets.session_secret);
        let jwt = Arc::new(JwtKeys::new(
            &config.secrets.jwt_secret,
            config.jwt_expiry_hours,
        ));
        Self {
            config,
            storage,
            scan_gate,
            breach_checker,
            url_signer,
            jwt,
        }
    }
}

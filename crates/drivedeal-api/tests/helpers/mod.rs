//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p drivedeal-api`. Storage lives in a temp dir;
//! the malware scanner is an in-process fake.

pub mod fixtures;
pub mod scanner;

use axum_test::TestServer;
use drivedeal_api::setup::routes;
use drivedeal_api::state::AppState;
use drivedeal_core::Config;
use drivedeal_services::{BreachChecker, MalwareScanner, ScanGate};
use drivedeal_storage::{LocalStorage, Storage, UrlSigner};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_USER_ID: &str = "user-1";
pub const LOCAL_BASE_URL: &str = "http://localhost:4000/files";

/// Test application: server, state, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn bearer_token(&self) -> String {
        let token = self
            .state
            .jwt
            .issue_access_token(TEST_USER_ID, Some("driver@example.com"))
            .expect("Failed to issue test token");
        format!("Bearer {}", token)
    }

    pub fn storage_root(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }
}

/// Path and query of a URL issued by the local backend, as the test client expects them.
pub fn local_path(url: &str) -> String {
    url.strip_prefix("http://localhost:4000")
        .expect("URL issued by local backend")
        .to_string()
}

fn test_vars(storage_path: &str) -> HashMap<String, String> {
    [
        ("ENVIRONMENT", "test"),
        ("JWT_SECRET", "test-jwt-secret-0123456789abcdef0123"),
        ("JWT_REFRESH_SECRET", "test-refresh-secret-0123456789abcdef"),
        ("PASSWORD_PEPPER", "test-password-pepper-0123456789abcd"),
        ("SESSION_SECRET", "test-session-secret-0123456789abcdef"),
        ("ENCRYPTION_KEY", "test-encryption-key-0123456789abcdef"),
        ("STORAGE_BACKEND", "local"),
        ("LOCAL_STORAGE_BASE_URL", LOCAL_BASE_URL),
        ("CLAMAV_ENABLED", "false"),
        ("BREACH_CHECK_URL", "http://127.0.0.1:1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .chain([("LOCAL_STORAGE_PATH".to_string(), storage_path.to_string())])
    .collect()
}

/// Setup test app with a clean scanner and default policy.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(&[], Arc::new(scanner::FakeScanner::clean())).await
}

/// Setup test app with overridden configuration variables and a custom scanner.
pub async fn setup_test_app_with(
    overrides: &[(&str, &str)],
    scanner: Arc<dyn MalwareScanner>,
) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage_path = temp_dir.path().to_string_lossy().into_owned();

    let mut vars = test_vars(&storage_path);
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }
    let config = Config::from_lookup(|key| vars.get(key).cloned())
        .expect("Failed to build test configuration");

    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(
            temp_dir.path().to_path_buf(),
            config.storage.local_base_url.clone(),
            UrlSigner::new(&config.secrets.session_secret),
        )
        .await
        .expect("Failed to create local storage"),
    );
    let breach_checker = BreachChecker::new(config.breach_check_url.clone())
        .expect("Failed to build breach checker");

    let state = Arc::new(AppState::new(
        config,
        storage,
        ScanGate::new(scanner),
        breach_checker,
    ));
    let router = routes::setup_routes(state.clone());
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        state,
        temp_dir,
    }
}

//! k-anonymity lookup against a breached-password range API.
//!
//! Only the first five hex characters of the password's SHA-1 leave the process. The
//! service answers with every known suffix for that prefix (`SUFFIX:COUNT` per line) and
//! the match happens locally.

use sha1::{Digest, Sha1};
use std::time::Duration;
use thiserror::Error;

const PREFIX_LENGTH: usize = 5;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum BreachCheckError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Breach service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Breach service returned status {0}")]
    Status(u16),
}

#[derive(Debug, Clone)]
pub struct BreachChecker {
    client: reqwest::Client,
    base_url: String,
}

impl BreachChecker {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BreachCheckError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("drivedeal-breach-check")
            .build()
            .map_err(|e| BreachCheckError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Whether the password appears in the breach corpus.
    ///
    /// Fails open: when the service cannot be reached or answers badly the password is
    /// reported as not compromised.
    pub async fn is_password_compromised(&self, password: &str) -> bool {
        match self.lookup(password).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Breach check unavailable, treating password as not compromised"
                );
                false
            }
        }
    }

    pub async fn lookup(&self, password: &str) -> Result<bool, BreachCheckError> {
        let digest = hex::encode_upper(Sha1::digest(password.as_bytes()));
        let (prefix, suffix) = digest.split_at(PREFIX_LENGTH);

        let response = self
            .client
            .get(format!("{}/range/{}", self.base_url, prefix))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BreachCheckError::Status(response.status().as_u16()));
        }
        let body = response.text().await?;

        Ok(body.lines().any(|line| {
            let candidate = line.trim().split(':').next().unwrap_or_default();
            candidate.eq_ignore_ascii_case(suffix)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // SHA-1("password") = 5BAA61E4C9B93F3F0682250B6CF8331B7EE68FD8
    const PASSWORD_PREFIX: &str = "5BAA6";
    const PASSWORD_SUFFIX: &str = "1E4C9B93F3F0682250B6CF8331B7EE68FD8";

    async fn server_with_body(body: String) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/range/{}", PASSWORD_PREFIX)))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_breached_password_is_found() {
        let server = server_with_body(format!(
            "0018A45C4D1DEF81644B54AB7F969B88D65:1\r\n{}:9545824\r\n",
            PASSWORD_SUFFIX
        ))
        .await;
        let checker = BreachChecker::new(server.uri()).unwrap();

        assert!(checker.is_password_compromised("password").await);
    }

    #[tokio::test]
    async fn test_suffix_match_is_case_insensitive() {
        let server = server_with_body(format!("{}:3", PASSWORD_SUFFIX.to_lowercase())).await;
        let checker = BreachChecker::new(server.uri()).unwrap();

        assert!(checker.lookup("password").await.unwrap());
    }

    #[tokio::test]
    async fn test_unlisted_password_is_not_found() {
        let server =
            server_with_body("0018A45C4D1DEF81644B54AB7F969B88D65:1\n".to_string()).await;
        let checker = BreachChecker::new(server.uri()).unwrap();

        assert!(!checker.is_password_compromised("password").await);
    }

    #[tokio::test]
    async fn test_any_listed_suffix_matches_regardless_of_count() {
        for count in ["0", "1", ""] {
            let server = server_with_body(format!("{}:{}", PASSWORD_SUFFIX, count)).await;
            let checker = BreachChecker::new(server.uri()).unwrap();

            assert!(checker.lookup("password").await.unwrap(), "count {:?}", count);
        }
    }

    #[tokio::test]
    async fn test_service_error_fails_open() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let checker = BreachChecker::new(server.uri()).unwrap();

        assert!(matches!(
            checker.lookup("password").await,
            Err(BreachCheckError::Status(503))
        ));
        assert!(!checker.is_password_compromised("password").await);
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_open() {
        let checker = BreachChecker::new("http://127.0.0.1:1").unwrap();
        assert!(!checker.is_password_compromised("password").await);
    }
}

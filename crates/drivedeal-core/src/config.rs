//! Process configuration.
//!
//! Loaded once by the entry point (`Config::from_env`), validated before anything else
//! starts (`Config::validate`), then passed explicitly to whatever needs it.

use crate::StorageBackend;
use std::env;
use std::fmt;
use std::time::Duration;

pub const MIN_SECRET_LENGTH: usize = 32;
pub const DEFAULT_MAX_FILE_SIZE: usize = 5 * 1024 * 1024;
pub const MAX_FILE_SIZE_HARD_CAP: usize = 10 * 1024 * 1024;
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_JWT_EXPIRY_HOURS: i64 = 1;
const MAX_JWT_EXPIRY_HOURS: i64 = 24 * 365;
const DEFAULT_ALLOWED_FILE_TYPES: &str = "image/jpeg,image/png,application/pdf";
const DEFAULT_ALLOWED_EXTENSIONS: &str = ".jpg,.jpeg,.png,.pdf";
const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 60_000;
const DEFAULT_RATE_LIMIT_MAX: u32 = 100;
const DEFAULT_TRUSTED_PROXY_COUNT: usize = 1;
const DEFAULT_CLAMAV_PORT: u16 = 3310;
const DEFAULT_CLAMAV_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BREACH_CHECK_URL: &str = "https://api.pwnedpasswords.com";
const DEFAULT_LOCAL_STORAGE_PATH: &str = "./data/uploads";

/// Signing and encryption secrets. `Debug` never prints the values.
#[derive(Clone)]
pub struct Secrets {
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub password_pepper: String,
    pub session_secret: String,
    pub encryption_key: String,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("jwt_secret", &"[redacted]")
            .field("jwt_refresh_secret", &"[redacted]")
            .field("password_pepper", &"[redacted]")
            .field("session_secret", &"[redacted]")
            .field("encryption_key", &"[redacted]")
            .finish()
    }
}

impl Secrets {
    fn named(&self) -> [(&'static str, &str); 5] {
        [
            ("JWT_SECRET", &self.jwt_secret),
            ("JWT_REFRESH_SECRET", &self.jwt_refresh_secret),
            ("PASSWORD_PEPPER", &self.password_pepper),
            ("SESSION_SECRET", &self.session_secret),
            ("ENCRYPTION_KEY", &self.encryption_key),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Lower-cased MIME types.
    pub allowed_file_types: Vec<String>,
    /// Lower-cased, with leading dot.
    pub allowed_extensions: Vec<String>,
    pub max_file_size: usize,
    pub encrypt_uploads: bool,
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub window: Duration,
    pub max_requests: u32,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub local_path: String,
    pub local_base_url: String,
}

#[derive(Debug, Clone)]
pub struct ScannerSettings {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub server_port: u16,
    pub jwt_expiry_hours: i64,
    pub cors_allowed_origins: Vec<String>,
    pub trusted_proxy_count: usize,
    pub breach_check_url: String,
    pub secrets: Secrets,
    pub upload: UploadPolicy,
    pub rate_limit: RateLimitSettings,
    pub storage: StorageSettings,
    pub scanner: ScannerSettings,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    value
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

impl Config {
    /// Load from the process environment, reading `.env` first when present.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| anyhow::anyhow!("{} must be set", key))
        };

        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let server_port = match lookup("PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => DEFAULT_PORT,
        };

        let max_file_size = match lookup("MAX_FILE_SIZE") {
            Some(size) => size
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_FILE_SIZE must be a number of bytes"))?,
            None => DEFAULT_MAX_FILE_SIZE,
        };

        let window_ms = lookup("RATE_LIMIT_WINDOW_MS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_MS);

        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(backend) => backend.parse()?,
            None => StorageBackend::S3,
        };

        let secrets = Secrets {
            jwt_secret: required("JWT_SECRET")?,
            jwt_refresh_secret: required("JWT_REFRESH_SECRET")?,
            password_pepper: required("PASSWORD_PEPPER")?,
            session_secret: required("SESSION_SECRET")?,
            encryption_key: required("ENCRYPTION_KEY")?,
        };

        Ok(Config {
            environment,
            server_port,
            jwt_expiry_hours: lookup("JWT_EXPIRY_HOURS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_JWT_EXPIRY_HOURS),
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            trusted_proxy_count: lookup("TRUSTED_PROXY_COUNT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TRUSTED_PROXY_COUNT),
            breach_check_url: lookup("BREACH_CHECK_URL")
                .unwrap_or_else(|| DEFAULT_BREACH_CHECK_URL.to_string()),
            secrets,
            upload: UploadPolicy {
                allowed_file_types: split_list(
                    &lookup("ALLOWED_FILE_TYPES")
                        .unwrap_or_else(|| DEFAULT_ALLOWED_FILE_TYPES.to_string()),
                ),
                allowed_extensions: split_list(
                    &lookup("ALLOWED_FILE_EXTENSIONS")
                        .unwrap_or_else(|| DEFAULT_ALLOWED_EXTENSIONS.to_string()),
                ),
                max_file_size,
                encrypt_uploads: parse_bool(lookup("ENCRYPT_UPLOADS"), true),
            },
            rate_limit: RateLimitSettings {
                window: Duration::from_millis(window_ms),
                max_requests: lookup("RATE_LIMIT_MAX")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_RATE_LIMIT_MAX),
            },
            storage: StorageSettings {
                backend: storage_backend,
                s3_bucket: lookup("S3_BUCKET"),
                s3_region: lookup("S3_REGION").or_else(|| lookup("AWS_REGION")),
                s3_endpoint: lookup("S3_ENDPOINT"),
                local_path: lookup("LOCAL_STORAGE_PATH")
                    .unwrap_or_else(|| DEFAULT_LOCAL_STORAGE_PATH.to_string()),
                local_base_url: lookup("LOCAL_STORAGE_BASE_URL")
                    .unwrap_or_else(|| format!("http://localhost:{}/files", server_port)),
            },
            scanner: ScannerSettings {
                enabled: parse_bool(lookup("CLAMAV_ENABLED"), true),
                host: lookup("CLAMAV_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: lookup("CLAMAV_PORT")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_CLAMAV_PORT),
                timeout_secs: lookup("CLAMAV_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_CLAMAV_TIMEOUT_SECS),
            },
        })
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        for (name, value) in self.secrets.named() {
            if value.chars().count() < MIN_SECRET_LENGTH {
                return Err(anyhow::anyhow!(
                    "{} must be at least {} characters long",
                    name,
                    MIN_SECRET_LENGTH
                ));
            }
        }

        if !(1..=MAX_JWT_EXPIRY_HOURS).contains(&self.jwt_expiry_hours) {
            return Err(anyhow::anyhow!(
                "JWT_EXPIRY_HOURS must be between 1 and {}",
                MAX_JWT_EXPIRY_HOURS
            ));
        }

        if self.upload.max_file_size == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE must be greater than zero"));
        }
        if self.upload.max_file_size > MAX_FILE_SIZE_HARD_CAP {
            return Err(anyhow::anyhow!(
                "MAX_FILE_SIZE must not exceed {} bytes (10 MB)",
                MAX_FILE_SIZE_HARD_CAP
            ));
        }

        if self.upload.allowed_file_types.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_FILE_TYPES must list at least one type"));
        }
        if self.upload.allowed_extensions.is_empty()
            || self.upload.allowed_extensions.iter().any(|e| !e.starts_with('.'))
        {
            return Err(anyhow::anyhow!(
                "ALLOWED_FILE_EXTENSIONS must list extensions with a leading dot"
            ));
        }

        if self.rate_limit.window.is_zero() {
            return Err(anyhow::anyhow!("RATE_LIMIT_WINDOW_MS must be greater than zero"));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(anyhow::anyhow!("RATE_LIMIT_MAX must be greater than zero"));
        }

        if self.storage.backend == StorageBackend::S3 {
            if self.storage.s3_bucket.is_none() {
                return Err(anyhow::anyhow!("S3_BUCKET must be set for the s3 storage backend"));
            }
            if self.storage.s3_region.is_none() {
                return Err(anyhow::anyhow!(
                    "S3_REGION or AWS_REGION must be set for the s3 storage backend"
                ));
            }
        }

        if self.is_production() {
            if self.cors_allowed_origins.iter().any(|o| o == "*") {
                return Err(anyhow::anyhow!(
                    "CORS_ALLOWED_ORIGINS cannot be '*' in production. Please specify explicit origins."
                ));
            }
            if !self.scanner.enabled {
                return Err(anyhow::anyhow!(
                    "CLAMAV_ENABLED cannot be false in production"
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn base_vars() -> HashMap<&'static str, String> {
        let mut vars = HashMap::new();
        for key in [
            "JWT_SECRET",
            "JWT_REFRESH_SECRET",
            "PASSWORD_PEPPER",
            "SESSION_SECRET",
            "ENCRYPTION_KEY",
        ] {
            vars.insert(key, SECRET.to_string());
        }
        vars.insert("S3_BUCKET", "drivedeal-uploads".to_string());
        vars.insert("AWS_REGION", "eu-west-3".to_string());
        vars
    }

    fn load(vars: &HashMap<&'static str, String>) -> Result<Config, anyhow::Error> {
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_vars()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.server_port, 4000);
        assert_eq!(config.upload.max_file_size, 5 * 1024 * 1024);
        assert_eq!(
            config.upload.allowed_file_types,
            vec!["image/jpeg", "image/png", "application/pdf"]
        );
        assert_eq!(
            config.upload.allowed_extensions,
            vec![".jpg", ".jpeg", ".png", ".pdf"]
        );
        assert!(config.upload.encrypt_uploads);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert_eq!(config.storage.s3_region.as_deref(), Some("eu-west-3"));
        assert!(!config.is_production());
    }

    #[test]
    fn test_missing_secret_fails_fast() {
        let mut vars = base_vars();
        vars.remove("PASSWORD_PEPPER");
        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("PASSWORD_PEPPER"));
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut vars = base_vars();
        vars.insert("SESSION_SECRET", "too-short".to_string());
        let err = load(&vars).unwrap().validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "SESSION_SECRET must be at least 32 characters long"
        );
    }

    #[test]
    fn test_jwt_expiry_hours_bounds() {
        for hours in ["0", "-1", "8761", "9223372036854775807"] {
            let mut vars = base_vars();
            vars.insert("JWT_EXPIRY_HOURS", hours.to_string());
            let err = load(&vars).unwrap().validate().unwrap_err();
            assert_eq!(err.to_string(), "JWT_EXPIRY_HOURS must be between 1 and 8760");
        }

        let mut vars = base_vars();
        vars.insert("JWT_EXPIRY_HOURS", "8760".to_string());
        assert!(load(&vars).unwrap().validate().is_ok());
    }

    #[test]
    fn test_max_file_size_hard_cap() {
        let mut vars = base_vars();
        vars.insert("MAX_FILE_SIZE", (MAX_FILE_SIZE_HARD_CAP + 1).to_string());
        assert!(load(&vars).unwrap().validate().is_err());

        vars.insert("MAX_FILE_SIZE", MAX_FILE_SIZE_HARD_CAP.to_string());
        assert!(load(&vars).unwrap().validate().is_ok());

        vars.insert("MAX_FILE_SIZE", "five megabytes".to_string());
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_lists_are_trimmed_and_lowercased() {
        let mut vars = base_vars();
        vars.insert("ALLOWED_FILE_TYPES", " Image/PNG , application/pdf,".to_string());
        vars.insert(
            "CORS_ALLOWED_ORIGINS",
            "https://drivedeal.fr, https://www.drivedeal.fr".to_string(),
        );
        let config = load(&vars).unwrap();
        assert_eq!(
            config.upload.allowed_file_types,
            vec!["image/png", "application/pdf"]
        );
        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://drivedeal.fr", "https://www.drivedeal.fr"]
        );
    }

    #[test]
    fn test_extensions_need_leading_dot() {
        let mut vars = base_vars();
        vars.insert("ALLOWED_FILE_EXTENSIONS", "jpg,png".to_string());
        assert!(load(&vars).unwrap().validate().is_err());
    }

    #[test]
    fn test_production_rules() {
        let mut vars = base_vars();
        vars.insert("ENVIRONMENT", "production".to_string());
        vars.insert("CORS_ALLOWED_ORIGINS", "*".to_string());
        assert!(load(&vars).unwrap().validate().is_err());

        vars.insert("CORS_ALLOWED_ORIGINS", "https://drivedeal.fr".to_string());
        vars.insert("CLAMAV_ENABLED", "false".to_string());
        assert!(load(&vars).unwrap().validate().is_err());

        vars.remove("CLAMAV_ENABLED");
        let config = load(&vars).unwrap();
        assert!(config.is_production());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_s3_backend_requires_bucket() {
        let mut vars = base_vars();
        vars.remove("S3_BUCKET");
        assert!(load(&vars).unwrap().validate().is_err());

        vars.insert("STORAGE_BACKEND", "local".to_string());
        let config = load(&vars).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.local_base_url, "http://localhost:4000/files");
    }

    #[test]
    fn test_secrets_debug_is_redacted() {
        let config = load(&base_vars()).unwrap();
        assert!(!format!("{:?}", config).contains(SECRET));
    }
}

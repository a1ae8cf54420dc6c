//! Credential hygiene: password policy, peppered hashing and reset tokens.
//!
//! The breach-database lookup lives in `drivedeal-services` because it talks to an
//! external HTTP service.

use crate::AppError;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const BCRYPT_COST: u32 = 12;

const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Outcome of [`validate_password`]. One error per violated rule.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PasswordValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Check a password against the policy. Every rule is evaluated; violations accumulate.
pub fn validate_password(password: &str) -> PasswordValidation {
    let mut errors = Vec::new();
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        errors.push(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    }
    if length > MAX_PASSWORD_LENGTH {
        errors.push(format!(
            "Password must be at most {} characters long",
            MAX_PASSWORD_LENGTH
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one number".to_string());
    }
    if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        errors.push("Password must contain at least one special character".to_string());
    }

    PasswordValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// bcrypt hasher that appends a server-side pepper to every password.
#[derive(Clone)]
pub struct PasswordHasher {
    pepper: String,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("pepper", &"[redacted]")
            .finish()
    }
}

impl PasswordHasher {
    /// Fails when the pepper is empty so a missing secret is caught at startup.
    pub fn new(pepper: impl Into<String>) -> Result<Self, AppError> {
        let pepper = pepper.into();
        if pepper.is_empty() {
            return Err(AppError::Internal(
                "PASSWORD_PEPPER must be configured".to_string(),
            ));
        }
        Ok(Self { pepper })
    }

    fn peppered(&self, password: &str) -> String {
        format!("{}{}", password, self.pepper)
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        bcrypt::hash(self.peppered(password), BCRYPT_COST)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    /// Malformed hashes are errors, a mismatch is `Ok(false)`.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        bcrypt::verify(self.peppered(password), hash)
            .map_err(|e| AppError::Internal(format!("Failed to verify password: {}", e)))
    }
}

/// A reset token for the user and the digest to persist in its place.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub token: String,
    pub hashed_token: String,
}

/// 32 random bytes as hex, plus their SHA-256 hex digest.
pub fn generate_reset_token() -> ResetToken {
    let bytes: [u8; 32] = rand::random();
    let token = hex::encode(bytes);
    let hashed_token = digest_token(&token);
    ResetToken {
        token,
        hashed_token,
    }
}

/// Constant-time comparison of the token's digest with the stored digest.
pub fn verify_reset_token(token: &str, hashed_token: &str) -> bool {
    let computed = digest_token(token);
    computed.as_bytes().ct_eq(hashed_token.as_bytes()).into()
}

fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// 20 random bytes as hex, for seeding a TOTP authenticator.
pub fn generate_two_factor_secret() -> String {
    let bytes: [u8; 20] = rand::random();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEPPER: &str = "pepper-pepper-pepper-pepper-pepper";

    #[test]
    fn test_strong_password_is_valid() {
        let result = validate_password("Sup3r$ecret");
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_each_violation_is_reported_once() {
        // short, no uppercase, no digit, no special character
        let result = validate_password("abc");
        assert!(!result.is_valid);
        assert_eq!(
            result.errors,
            vec![
                "Password must be at least 8 characters long",
                "Password must contain at least one uppercase letter",
                "Password must contain at least one number",
                "Password must contain at least one special character",
            ]
        );
    }

    #[test]
    fn test_error_count_matches_violated_rules() {
        let cases: &[(&str, usize)] = &[
            ("", 5),
            ("ALLUPPERCASE", 3),
            ("lowercase1!", 1),
            ("NoDigits!!", 1),
            ("NoSpecial12", 1),
            ("Aa1!", 1),
        ];
        for (password, expected) in cases {
            let result = validate_password(password);
            assert_eq!(result.errors.len(), *expected, "password {:?}", password);
            assert!(!result.is_valid);
        }
    }

    #[test]
    fn test_overlong_password_is_rejected() {
        let password = format!("Aa1!{}", "x".repeat(MAX_PASSWORD_LENGTH));
        let result = validate_password(&password);
        assert_eq!(
            result.errors,
            vec!["Password must be at most 128 characters long"]
        );
    }

    #[test]
    fn test_empty_pepper_is_rejected() {
        assert!(PasswordHasher::new("").is_err());
    }

    #[test]
    fn test_hash_and_verify_with_pepper() {
        let hasher = PasswordHasher::new(PEPPER).unwrap();
        let hash = hasher.hash_password("Sup3r$ecret").unwrap();

        assert!(hash.starts_with("$2"));
        assert!(hash.contains("$12$"));
        assert!(hasher.verify_password("Sup3r$ecret", &hash).unwrap());
        assert!(!hasher.verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_verify_fails_with_different_pepper() {
        let hasher = PasswordHasher::new(PEPPER).unwrap();
        let hash = hasher.hash_password("Sup3r$ecret").unwrap();

        let other = PasswordHasher::new("another-pepper-another-pepper-xx").unwrap();
        assert!(!other.verify_password("Sup3r$ecret", &hash).unwrap());
    }

    #[test]
    fn test_debug_redacts_pepper() {
        let hasher = PasswordHasher::new(PEPPER).unwrap();
        assert!(!format!("{:?}", hasher).contains(PEPPER));
    }

    #[test]
    fn test_reset_token_shape_and_verification() {
        let reset = generate_reset_token();
        assert_eq!(reset.token.len(), 64);
        assert_eq!(reset.hashed_token.len(), 64);
        assert_ne!(reset.token, reset.hashed_token);

        assert!(verify_reset_token(&reset.token, &reset.hashed_token));
        assert!(!verify_reset_token("tampered", &reset.hashed_token));
        assert!(!verify_reset_token(&reset.token, "short"));
    }

    #[test]
    fn test_reset_tokens_are_unique() {
        assert_ne!(generate_reset_token().token, generate_reset_token().token);
    }

    #[test]
    fn test_two_factor_secret_is_forty_hex_chars() {
        let secret = generate_two_factor_secret();
        assert_eq!(secret.len(), 40);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

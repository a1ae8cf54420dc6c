//! HS256 access tokens.

use super::models::{JwtClaims, Principal};
use chrono::{Duration, Utc};
use drivedeal_core::AppError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expiry_hours: i64,
}

impl JwtKeys {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            expiry_hours,
        }
    }

    /// Mint an access token for `user_id` that expires after the configured lifetime.
    pub fn issue_access_token(
        &self,
        user_id: &str,
        email: Option<&str>,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            email: email.map(String::from),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.expiry_hours)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign access token: {}", e)))
    }

    /// Signature, algorithm and expiry are all checked.
    pub fn verify(&self, token: &str) -> Result<Principal, AppError> {
        let data = decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;
        if data.claims.sub.is_empty() {
            return Err(AppError::Unauthorized("Invalid token: empty subject".to_string()));
        }
        Ok(data.claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "jwt-secret-jwt-secret-jwt-secret!";

    #[test]
    fn test_issue_and_verify() {
        let keys = JwtKeys::new(SECRET, 1);
        let token = keys
            .issue_access_token("user-42", Some("driver@example.com"))
            .unwrap();

        let principal = keys.verify(&token).unwrap();
        assert_eq!(principal.user_id, "user-42");
        assert_eq!(principal.email.as_deref(), Some("driver@example.com"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtKeys::new(SECRET, 1)
            .issue_access_token("user-42", None)
            .unwrap();
        let other = JwtKeys::new("another-secret-another-secret-xxx", 1);
        assert!(matches!(other.verify(&token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Past the default 60s leeway.
        let keys = JwtKeys::new(SECRET, -2);
        let token = keys.issue_access_token("user-42", None).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let keys = JwtKeys::new(SECRET, 1);
        assert!(keys.verify("not-a-jwt").is_err());
    }
}

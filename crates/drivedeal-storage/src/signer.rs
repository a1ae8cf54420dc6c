//! HMAC-signed retrieval URLs for backends without native presigning.
//!
//! URL: `{base_url}/{key}?expires={unix_secs}&signature={sig}` where
//! sig = base64url(HMAC-SHA256(secret, "{key}:{expires}")).

use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::Sha256;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Invalid signature")]
    Invalid,

    #[error("Signed URL has expired")]
    Expired,
}

#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
}

impl fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlSigner")
            .field("secret", &"[redacted]")
            .finish()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl UrlSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, key: &str, expires: u64) -> Hmac<Sha256> {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(&self.secret).expect("HMAC accepts any key size");
        mac.update(format!("{}:{}", key, expires).as_bytes());
        mac
    }

    pub fn signature(&self, key: &str, expires: u64) -> String {
        let tag = self.mac(key, expires).finalize().into_bytes();
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(tag)
    }

    /// Build a URL for `key` that stays valid for `expires_in`.
    pub fn sign_url(&self, base_url: &str, key: &str, expires_in: Duration) -> String {
        let expires = now_secs().saturating_add(expires_in.as_secs());
        let path = key
            .split('/')
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/{}?expires={}&signature={}",
            base_url.trim_end_matches('/'),
            path,
            expires,
            self.signature(key, expires)
        )
    }

    /// Check a signature in constant time, then its expiry.
    pub fn verify(&self, key: &str, expires: u64, signature: &str) -> Result<(), SignatureError> {
        let tag = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SignatureError::Invalid)?;
        self.mac(key, expires)
            .verify_slice(&tag)
            .map_err(|_| SignatureError::Invalid)?;

        if now_secs() > expires {
            return Err(SignatureError::Expired);
        }
        Ok(())
    }
}

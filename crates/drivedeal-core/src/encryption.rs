//! Password-keyed authenticated encryption for uploaded files and record fields.
//!
//! Every call derives a fresh AES-256-GCM key from the password with PBKDF2-HMAC-SHA256
//! over a fresh random salt, and encrypts under a fresh random IV. The envelope carries
//! everything needed to decrypt except the password, each part base64-encoded.

use crate::AppError;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const IV_LENGTH: usize = 12;
pub const SALT_LENGTH: usize = 16;
pub const TAG_LENGTH: usize = 16;
pub const KEY_LENGTH: usize = 32;
pub const PBKDF2_ITERATIONS: u32 = 100_000;

const DECRYPTION_FAILED: &str = "Decryption failed: authentication tag mismatch";

/// Ciphertext plus the parameters needed to decrypt it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionResult {
    pub encrypted_data: String,
    pub metadata: EncryptionMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionMetadata {
    pub iv: String,
    pub tag: String,
    pub salt: String,
}

impl EncryptionResult {
    /// Serialize the envelope for storage.
    pub fn to_envelope(&self) -> Result<Vec<u8>, AppError> {
        serde_json::to_vec(self)
            .map_err(|e| AppError::Encryption(format!("Failed to serialize envelope: {}", e)))
    }

    /// Parse an envelope previously produced by [`EncryptionResult::to_envelope`].
    pub fn from_envelope(bytes: &[u8]) -> Result<Self, AppError> {
        serde_json::from_slice(bytes)
            .map_err(|e| AppError::Encryption(format!("Malformed encryption envelope: {}", e)))
    }
}

/// PBKDF2-HMAC-SHA256 key derivation.
pub fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_LENGTH] {
    let mut key = [0u8; KEY_LENGTH];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

/// Encrypt `data` under a key derived from `password`.
pub fn encrypt(data: &[u8], password: &str) -> Result<EncryptionResult, AppError> {
    let salt: [u8; SALT_LENGTH] = rand::random();
    let key_bytes = derive_key(password, &salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    // aes-gcm appends the tag to the ciphertext
    let mut sealed = cipher
        .encrypt(&nonce, data)
        .map_err(|e| AppError::Encryption(format!("Encryption failed: {}", e)))?;
    let tag = sealed.split_off(sealed.len() - TAG_LENGTH);

    Ok(EncryptionResult {
        encrypted_data: general_purpose::STANDARD.encode(&sealed),
        metadata: EncryptionMetadata {
            iv: general_purpose::STANDARD.encode(nonce.as_slice()),
            tag: general_purpose::STANDARD.encode(&tag),
            salt: general_purpose::STANDARD.encode(salt),
        },
    })
}

/// Decrypt an envelope. A wrong password or any tampering fails with
/// `AppError::Encryption`; corrupted plaintext is never returned.
pub fn decrypt(result: &EncryptionResult, password: &str) -> Result<Vec<u8>, AppError> {
    let ciphertext = decode_part("encryptedData", &result.encrypted_data)?;
    let iv = decode_part("iv", &result.metadata.iv)?;
    let tag = decode_part("tag", &result.metadata.tag)?;
    let salt = decode_part("salt", &result.metadata.salt)?;

    expect_length("iv", &iv, IV_LENGTH)?;
    expect_length("tag", &tag, TAG_LENGTH)?;
    expect_length("salt", &salt, SALT_LENGTH)?;

    let key_bytes = derive_key(password, &salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));

    let mut sealed = ciphertext;
    sealed.extend_from_slice(&tag);

    cipher
        .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
        .map_err(|_| AppError::Encryption(DECRYPTION_FAILED.to_string()))
}

fn decode_part(name: &str, value: &str) -> Result<Vec<u8>, AppError> {
    general_purpose::STANDARD
        .decode(value)
        .map_err(|e| AppError::Encryption(format!("Invalid base64 in {}: {}", name, e)))
}

fn expect_length(name: &str, bytes: &[u8], expected: usize) -> Result<(), AppError> {
    if bytes.len() != expected {
        return Err(AppError::Encryption(format!(
            "Invalid {} length: expected {} bytes, got {}",
            name,
            expected,
            bytes.len()
        )));
    }
    Ok(())
}

/// Encrypt the named string fields of a JSON object.
///
/// Each transformed field holds the JSON-serialized [`EncryptionResult`]. Absent,
/// empty and non-string fields pass through unchanged, as do non-object records.
pub fn encrypt_sensitive_data(
    record: &serde_json::Value,
    fields: &[&str],
    key: &str,
) -> Result<serde_json::Value, AppError> {
    let mut output = record.clone();
    let Some(obj) = output.as_object_mut() else {
        return Ok(output);
    };

    for field in fields {
        let plaintext = match obj.get(*field).and_then(|v| v.as_str()) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => continue,
        };
        let encrypted = encrypt(plaintext.as_bytes(), key)?;
        let serialized = serde_json::to_string(&encrypted).map_err(|e| {
            AppError::Encryption(format!("Failed to serialize field '{}': {}", field, e))
        })?;
        obj.insert((*field).to_string(), serde_json::Value::String(serialized));
    }

    Ok(output)
}

/// Reverse [`encrypt_sensitive_data`].
pub fn decrypt_sensitive_data(
    record: &serde_json::Value,
    fields: &[&str],
    key: &str,
) -> Result<serde_json::Value, AppError> {
    let mut output = record.clone();
    let Some(obj) = output.as_object_mut() else {
        return Ok(output);
    };

    for field in fields {
        let serialized = match obj.get(*field).and_then(|v| v.as_str()) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => continue,
        };
        let envelope: EncryptionResult = serde_json::from_str(&serialized).map_err(|e| {
            AppError::Encryption(format!("Field '{}' is not an encryption envelope: {}", field, e))
        })?;
        let plaintext = decrypt(&envelope, key)?;
        let text = String::from_utf8(plaintext).map_err(|e| {
            AppError::Encryption(format!("Invalid UTF-8 in decrypted field '{}': {}", field, e))
        })?;
        obj.insert((*field).to_string(), serde_json::Value::String(text));
    }

    Ok(output)
}

/// SHA-256 hex fingerprint. Not for passwords.
pub fn hash_data(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// 32 random bytes, hex encoded.
pub fn generate_secure_key() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PASSWORD: &str = "0123456789abcdef0123456789abcdef";

    fn decode(value: &str) -> Vec<u8> {
        general_purpose::STANDARD.decode(value).unwrap()
    }

    #[test]
    fn test_round_trip_binary_payload() {
        let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let encrypted = encrypt(&data, PASSWORD).unwrap();
        assert_eq!(decrypt(&encrypted, PASSWORD).unwrap(), data);
    }

    #[test]
    fn test_round_trip_empty_payload() {
        let encrypted = encrypt(b"", PASSWORD).unwrap();
        assert!(decode(&encrypted.encrypted_data).is_empty());
        assert_eq!(decrypt(&encrypted, PASSWORD).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_parameter_lengths_are_fixed() {
        for payload in [&b""[..], &b"x"[..], &[7u8; 1000][..]] {
            let encrypted = encrypt(payload, PASSWORD).unwrap();
            assert_eq!(decode(&encrypted.metadata.iv).len(), IV_LENGTH);
            assert_eq!(decode(&encrypted.metadata.tag).len(), TAG_LENGTH);
            assert_eq!(decode(&encrypted.metadata.salt).len(), SALT_LENGTH);
            assert_eq!(decode(&encrypted.encrypted_data).len(), payload.len());
        }
    }

    #[test]
    fn test_same_plaintext_yields_fresh_iv_and_salt() {
        let first = encrypt(b"same plaintext", PASSWORD).unwrap();
        let second = encrypt(b"same plaintext", PASSWORD).unwrap();
        assert_ne!(first.metadata.iv, second.metadata.iv);
        assert_ne!(first.metadata.salt, second.metadata.salt);
        assert_ne!(first.encrypted_data, second.encrypted_data);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut encrypted = encrypt(b"listing photo bytes", PASSWORD).unwrap();
        let mut ciphertext = decode(&encrypted.encrypted_data);
        ciphertext[0] ^= 0x01;
        encrypted.encrypted_data = general_purpose::STANDARD.encode(&ciphertext);

        let err = decrypt(&encrypted, PASSWORD).unwrap_err();
        assert!(matches!(err, AppError::Encryption(ref msg) if msg == DECRYPTION_FAILED));
    }

    #[test]
    fn test_tampered_tag_fails() {
        let mut encrypted = encrypt(b"listing photo bytes", PASSWORD).unwrap();
        let mut tag = decode(&encrypted.metadata.tag);
        tag[TAG_LENGTH - 1] ^= 0x80;
        encrypted.metadata.tag = general_purpose::STANDARD.encode(&tag);

        assert!(matches!(
            decrypt(&encrypted, PASSWORD),
            Err(AppError::Encryption(_))
        ));
    }

    #[test]
    fn test_wrong_password_fails() {
        let encrypted = encrypt(b"secret", PASSWORD).unwrap();
        assert!(matches!(
            decrypt(&encrypted, "another-password-of-enough-length!"),
            Err(AppError::Encryption(_))
        ));
    }

    #[test]
    fn test_truncated_iv_is_rejected() {
        let mut encrypted = encrypt(b"secret", PASSWORD).unwrap();
        encrypted.metadata.iv = general_purpose::STANDARD.encode([0u8; 8]);
        let err = decrypt(&encrypted, PASSWORD).unwrap_err();
        assert!(err.to_string().contains("Invalid iv length"));
    }

    #[test]
    fn test_envelope_round_trip_uses_camel_case() {
        let encrypted = encrypt(b"abc", PASSWORD).unwrap();
        let bytes = encrypted.to_envelope().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value.get("encryptedData").is_some());
        assert!(value["metadata"].get("salt").is_some());
        assert_eq!(EncryptionResult::from_envelope(&bytes).unwrap(), encrypted);
    }

    #[test]
    fn test_malformed_envelope_is_encryption_error() {
        assert!(matches!(
            EncryptionResult::from_envelope(b"not json"),
            Err(AppError::Encryption(_))
        ));
    }

    #[test]
    fn test_sensitive_fields_round_trip() {
        let record = json!({
            "email": "seller@example.com",
            "phone": "+33 6 12 34 56 78",
            "price": 12500,
            "vin": null,
            "notes": ""
        });
        let fields = ["email", "phone", "price", "vin", "notes", "missing"];

        let encrypted = encrypt_sensitive_data(&record, &fields, PASSWORD).unwrap();
        assert_ne!(encrypted["email"], record["email"]);
        assert_ne!(encrypted["phone"], record["phone"]);
        assert_eq!(encrypted["price"], json!(12500));
        assert_eq!(encrypted["vin"], serde_json::Value::Null);
        assert_eq!(encrypted["notes"], json!(""));
        assert!(encrypted.get("missing").is_none());

        let envelope: EncryptionResult =
            serde_json::from_str(encrypted["email"].as_str().unwrap()).unwrap();
        assert_eq!(decode(&envelope.metadata.iv).len(), IV_LENGTH);

        let decrypted = decrypt_sensitive_data(&encrypted, &fields, PASSWORD).unwrap();
        assert_eq!(decrypted, record);
    }

    #[test]
    fn test_sensitive_fields_ignore_unlisted_and_non_objects() {
        let record = json!({"email": "a@b.c", "city": "Lyon"});
        let encrypted = encrypt_sensitive_data(&record, &["email"], PASSWORD).unwrap();
        assert_eq!(encrypted["city"], json!("Lyon"));

        let array = json!(["a", "b"]);
        assert_eq!(
            encrypt_sensitive_data(&array, &["0"], PASSWORD).unwrap(),
            array
        );
    }

    #[test]
    fn test_decrypt_sensitive_rejects_plain_string() {
        let record = json!({"email": "not-an-envelope"});
        assert!(matches!(
            decrypt_sensitive_data(&record, &["email"], PASSWORD),
            Err(AppError::Encryption(_))
        ));
    }

    #[test]
    fn test_hash_data_known_vector() {
        assert_eq!(
            hash_data(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_generate_secure_key_is_hex_and_unique() {
        let a = generate_secure_key();
        let b = generate_secure_key();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}

//! Secure memory handling with automatic zeroization

use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Token signing key - automatically zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SigningKey {
    key: Vec<u8>,
}

impl SigningKey {
    /// Create a signing key from raw bytes
    pub fn new(key: Vec<u8>) -> Self {
        Self { key }
    }

    /// Create a signing key from a configured secret string
    pub fn from_secret(secret: &str) -> Option<Self> {
        if secret.is_empty() {
            return None;
        }
        Some(Self::new(secret.as_bytes().to_vec()))
    }

    /// Get the key bytes (use carefully - avoid copying)
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl Clone for SigningKey {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
        }
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Password or other secret text - automatically zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop, Deserialize)]
#[serde(transparent)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    /// Create a new secret string
    pub fn new(value: String) -> Self {
        Self { value }
    }

    /// Get the secret value (use carefully)
    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretString")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_key_rejects_empty_secret() {
        assert!(SigningKey::from_secret("").is_none());
        let key = SigningKey::from_secret("k").unwrap();
        assert_eq!(key.as_bytes(), b"k");
    }

    #[test]
    fn test_secret_string_deserializes_transparently() {
        let secret: SecretString = serde_json::from_str("\"hunter2\"").unwrap();
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_debug_redacted() {
        let key = SigningKey::new(b"top-secret".to_vec());
        let secret = SecretString::from("hunter2");
        assert!(format!("{:?}", key).contains("REDACTED"));
        assert!(!format!("{:?}", secret).contains("hunter2"));
    }
}

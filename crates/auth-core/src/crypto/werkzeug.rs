//! PBKDF2 password digests in the `pbkdf2:<hash>:<iterations>$<salt>$<hex>` layout
//!
//! This is the layout written by Werkzeug's `generate_password_hash`, so stores
//! produced by the legacy service keep verifying and digests produced here stay
//! readable by it.

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::Rng;
use sha2::{Sha256, Sha512};

use crate::error::{AuthError, Result};

/// Iteration count for newly produced digests
pub const DEFAULT_ITERATIONS: u32 = 600_000;

/// Upper bound on PBKDF2 rounds, for stored values read and written alike
pub const MAX_ITERATIONS: u32 = 10_000_000;

const SALT_LEN: usize = 16;
const SALT_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Digest function used inside PBKDF2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pbkdf2Hash {
    Sha256,
    Sha512,
}

impl Pbkdf2Hash {
    /// Name as it appears in the method segment
    pub fn name(&self) -> &'static str {
        match self {
            Pbkdf2Hash::Sha256 => "sha256",
            Pbkdf2Hash::Sha512 => "sha512",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sha256" => Some(Pbkdf2Hash::Sha256),
            "sha512" => Some(Pbkdf2Hash::Sha512),
            _ => None,
        }
    }

    /// Digest length in bytes
    pub fn output_len(&self) -> usize {
        match self {
            Pbkdf2Hash::Sha256 => 32,
            Pbkdf2Hash::Sha512 => 64,
        }
    }
}

/// Generate a random alphanumeric salt
pub fn generate_salt() -> String {
    let mut rng = OsRng;
    (0..SALT_LEN)
        .map(|_| SALT_CHARS[rng.gen_range(0..SALT_CHARS.len())] as char)
        .collect()
}

/// Run PBKDF2-HMAC over the UTF-8 bytes of password and salt
pub fn derive(hash: Pbkdf2Hash, password: &str, salt: &str, iterations: u32) -> Vec<u8> {
    let mut output = vec![0u8; hash.output_len()];
    match hash {
        Pbkdf2Hash::Sha256 => {
            pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut output)
        }
        Pbkdf2Hash::Sha512 => {
            pbkdf2_hmac::<Sha512>(password.as_bytes(), salt.as_bytes(), iterations, &mut output)
        }
    }
    output
}

/// Whether a round count is one this module reads back
pub fn iterations_in_range(iterations: u32) -> bool {
    (1..=MAX_ITERATIONS).contains(&iterations)
}

/// Hash a password with a fresh salt and return the encoded digest
pub fn hash_pbkdf2(password: &str, hash: Pbkdf2Hash, iterations: u32) -> Result<String> {
    if !iterations_in_range(iterations) {
        return Err(AuthError::HashingError(format!(
            "PBKDF2 iterations must be between 1 and {}, got {}",
            MAX_ITERATIONS, iterations
        )));
    }

    let salt = generate_salt();
    let digest = derive(hash, password, &salt, iterations);
    Ok(format!(
        "pbkdf2:{}:{}${}${}",
        hash.name(),
        iterations,
        salt,
        hex::encode(digest)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sha256_vector() {
        let digest = derive(Pbkdf2Hash::Sha256, "s3cret", "abcdefgh12345678", 1000);
        assert_eq!(
            hex::encode(digest),
            "cc78ef12e984a21cb59f2d21dbb2062b7a681dfa2c934544f9fc9fbd8cbf802e"
        );
    }

    #[test]
    fn test_known_sha512_vector() {
        let digest = derive(Pbkdf2Hash::Sha512, "adminpass", "ZyXwVuTs98765432", 2000);
        assert_eq!(digest.len(), 64);
        assert!(hex::encode(digest).starts_with("428b91c448678f2c205af6e4d92e87a9"));
    }

    #[test]
    fn test_encoded_layout() {
        let encoded = hash_pbkdf2("pw", Pbkdf2Hash::Sha256, 1000).unwrap();
        let (method, rest) = encoded.split_once('$').unwrap();
        let (salt, digest) = rest.split_once('$').unwrap();

        assert_eq!(method, "pbkdf2:sha256:1000");
        assert_eq!(salt.len(), 16);
        assert!(salt.bytes().all(|b| b.is_ascii_alphanumeric()));
        assert_eq!(digest, hex::encode(derive(Pbkdf2Hash::Sha256, "pw", salt, 1000)));
    }

    #[test]
    fn test_out_of_range_iterations_rejected() {
        for iterations in [0, MAX_ITERATIONS + 1] {
            assert!(matches!(
                hash_pbkdf2("pw", Pbkdf2Hash::Sha256, iterations),
                Err(AuthError::HashingError(_))
            ));
        }
        assert!(hash_pbkdf2("pw", Pbkdf2Hash::Sha256, 1).is_ok());
    }
}

//! Argon2id password digests in PHC string form

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

/// Parameters for newly produced Argon2id digests.
///
/// Verification always uses the parameters embedded in the stored PHC string,
/// so changing these only affects digests produced afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 19456 = 19 MiB)
    pub memory_cost: u32,
    /// Time cost / iterations (default: 2)
    pub time_cost: u32,
    /// Parallelism (default: 1)
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_cost: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

fn argon2_config(params: &Argon2Params) -> Result<Argon2<'static>> {
    let params = Params::new(params.memory_cost, params.time_cost, params.parallelism, None)
        .map_err(|e| AuthError::HashingError(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password with Argon2id and a random salt, returning the PHC string
pub fn hash_argon2(plaintext: &str, params: &Argon2Params) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = argon2_config(params)?;

    let password_hash = argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| AuthError::HashingError(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Check that a PHC string names an Argon2 variant and carries a digest
pub fn is_argon2_phc(phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => parsed.algorithm.as_str().starts_with("argon2") && parsed.hash.is_some(),
        Err(_) => false,
    }
}

/// Verify a candidate against an Argon2 PHC string.
///
/// Returns `None` when the PHC string or its parameters cannot be used,
/// including a PHC string without a digest.
pub fn verify_argon2(phc: &str, candidate: &str) -> Option<bool> {
    let parsed = PasswordHash::new(phc).ok()?;
    if parsed.hash.is_none() {
        return None;
    }

    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Some(true),
        Err(password_hash::Error::Password) => Some(false),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_params() -> Argon2Params {
        Argon2Params {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let phc = hash_argon2("s3cret", &test_params()).unwrap();

        assert!(phc.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));
        assert!(is_argon2_phc(&phc));
        assert_eq!(verify_argon2(&phc, "s3cret"), Some(true));
        assert_eq!(verify_argon2(&phc, "S3cret"), Some(false));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_argon2("same", &test_params()).unwrap();
        let b = hash_argon2("same", &test_params()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_is_not_phc() {
        assert!(!is_argon2_phc("$argon2id$v=19$m=nope"));
        assert!(!is_argon2_phc("plain words"));
        assert_eq!(verify_argon2("$argon2id$garbage", "x"), None);
    }

    #[test]
    fn test_phc_without_digest_cannot_verify() {
        let phc = hash_argon2("s3cret", &test_params()).unwrap();
        let (params_only, _) = phc.rsplit_once('$').unwrap();

        assert!(!is_argon2_phc(params_only));
        assert_eq!(verify_argon2(params_only, "s3cret"), None);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = Argon2Params {
            memory_cost: 1,
            time_cost: 0,
            parallelism: 1,
        };
        assert!(matches!(
            hash_argon2("x", &params),
            Err(AuthError::HashingError(_))
        ));
    }
}

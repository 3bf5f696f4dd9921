//! Hashing primitive used for every newly written stored value

use serde::{Deserialize, Serialize};

use super::argon2id::{hash_argon2, Argon2Params};
use super::werkzeug::{self, hash_pbkdf2, Pbkdf2Hash};
use super::ARGON2_TAG;
use crate::error::Result;

/// Scheme used for newly produced digests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashScheme {
    /// Argon2id, stored as `argon2:<phc>`
    #[default]
    Argon2,
    /// PBKDF2-HMAC-SHA256 in the legacy `pbkdf2:sha256:<iterations>$salt$hex` layout
    Pbkdf2,
}

/// Produces stored values from plaintext passwords
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    scheme: HashScheme,
    argon2: Argon2Params,
    pbkdf2_iterations: u32,
}

impl CredentialHasher {
    /// Create a hasher for the given scheme with default cost parameters
    pub fn new(scheme: HashScheme) -> Self {
        Self {
            scheme,
            argon2: Argon2Params::default(),
            pbkdf2_iterations: werkzeug::DEFAULT_ITERATIONS,
        }
    }

    pub fn with_argon2_params(mut self, params: Argon2Params) -> Self {
        self.argon2 = params;
        self
    }

    pub fn with_pbkdf2_iterations(mut self, iterations: u32) -> Self {
        self.pbkdf2_iterations = iterations;
        self
    }

    pub fn scheme(&self) -> HashScheme {
        self.scheme
    }

    /// Hash a plaintext password into a self-describing stored value
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        match self.scheme {
            HashScheme::Argon2 => {
                let phc = hash_argon2(plaintext, &self.argon2)?;
                Ok(format!("{}:{}", ARGON2_TAG, phc))
            }
            HashScheme::Pbkdf2 => hash_pbkdf2(plaintext, Pbkdf2Hash::Sha256, self.pbkdf2_iterations),
        }
    }

    /// Cheap parameters for tests
    #[cfg(test)]
    pub(crate) fn for_tests(scheme: HashScheme) -> Self {
        Self::new(scheme)
            .with_argon2_params(Argon2Params {
                memory_cost: 1024,
                time_cost: 1,
                parallelism: 1,
            })
            .with_pbkdf2_iterations(1000)
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new(HashScheme::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argon2_scheme_is_tagged() {
        let stored = CredentialHasher::for_tests(HashScheme::Argon2)
            .hash("x")
            .unwrap();
        assert!(stored.starts_with("argon2:$argon2id$"));
    }

    #[test]
    fn test_pbkdf2_scheme_layout() {
        let stored = CredentialHasher::for_tests(HashScheme::Pbkdf2)
            .hash("x")
            .unwrap();
        assert!(stored.starts_with("pbkdf2:sha256:1000$"));
    }

    #[test]
    fn test_scheme_from_config_name() {
        let scheme: HashScheme = serde_json::from_str("\"pbkdf2\"").unwrap();
        assert_eq!(scheme, HashScheme::Pbkdf2);
        assert_eq!(CredentialHasher::default().scheme(), HashScheme::Argon2);
    }

    #[test]
    fn test_unreadable_iteration_count_is_refused() {
        let hasher = CredentialHasher::new(HashScheme::Pbkdf2).with_pbkdf2_iterations(0);
        assert!(matches!(
            hasher.hash("s3cret"),
            Err(crate::error::AuthError::HashingError(_))
        ));
    }
}
